//! Arithmetic functions embedded in templates.
//!
//! Grammar, after field substitution has already happened:
//!
//! ```text
//! expr := prefix [ '~' call ]        prefix: any text without '~'
//! call := name ':' args
//! args := arg { ',' arg }            an arg containing '~' is an expr that
//!                                    consumes the rest of the argument list
//! ```
//!
//! `val~sum:1,2,~sub:5,2` evaluates the nested `~sub:5,2` to `3` first and then
//! folds `1 + 2 + 3`, giving `val6`.

use crate::vcf::{Result, VcfError};

/// Marker that starts a function call.
pub const FUNCTION_TOKEN: char = '~';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sum,
    Sub,
}

impl Function {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(Function::Sum),
            "sub" => Some(Function::Sub),
            _ => None,
        }
    }

    /// Left fold over `args`; the first argument is the starting value.
    pub fn apply(&self, args: &[f64]) -> f64 {
        let Some((&first, rest)) = args.split_first() else {
            return 0.0;
        };
        match self {
            Function::Sum => rest.iter().fold(first, |acc, v| acc + v),
            Function::Sub => rest.iter().fold(first, |acc, v| acc - v),
        }
    }
}

/// Evaluate every function call in `input`.
pub fn evaluate(input: &str) -> Result<String> {
    let Some(at) = input.find(FUNCTION_TOKEN) else {
        return Ok(input.to_string());
    };
    let value = evaluate_call(&input[at + 1..], input)?;
    let mut result = String::with_capacity(at + 24);
    result.push_str(&input[..at]);
    result.push_str(&format_number(value));
    Ok(result)
}

fn evaluate_call(call: &str, whole: &str) -> Result<f64> {
    let (name, mut rest) = call
        .split_once(':')
        .ok_or_else(|| VcfError::MalformedFunction(whole.to_string()))?;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(VcfError::MalformedFunction(whole.to_string()));
    }
    let function =
        Function::parse(name).ok_or_else(|| VcfError::UnknownFunction(name.to_string()))?;

    let mut args = Vec::new();
    loop {
        let comma = rest.find(',');
        let arg_end = comma.unwrap_or(rest.len());
        if rest[..arg_end].contains(FUNCTION_TOKEN) {
            args.push(parse_arg(&evaluate(rest)?)?);
            break;
        }
        args.push(parse_arg(&rest[..arg_end])?);
        match comma {
            Some(c) => rest = &rest[c + 1..],
            None => break,
        }
    }

    Ok(function.apply(&args))
}

fn parse_arg(arg: &str) -> Result<f64> {
    arg.trim().parse::<f64>().map_err(|_| VcfError::NotNumeric {
        context: "function argument",
        value: arg.to_string(),
    })
}

/// Shortest decimal that round-trips, without exponent (`6`, `0.5`, `-400`).
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

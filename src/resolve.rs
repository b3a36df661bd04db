//! Template resolution against a record.
//!
//! Substitution runs in four passes. Each pass scans the output of the
//! previous one, so text produced by a later pass is never seen by an earlier one:
//!
//! 1. `$FORMAT/ID[/INDEX]` against the current sample (fatal without one)
//! 2. `$INFO/ID[/INDEX]` against the record
//! 3. `$POS`, `$CHROM`, `$REF`, `$ALT`, `$QUAL`, `$FILTER`
//! 4. `~func:args` calls, only when a `~` is left

use crate::config::Configuration;
use crate::function::{self, FUNCTION_TOKEN};
use crate::record::{Record, SampleValues};
use crate::vcf::{Result, VcfError};
use crate::warnings::Warnings;
use memchr::memmem;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Format,
    Info,
}

impl Scope {
    fn prefix(&self) -> &'static str {
        match self {
            Scope::Format => "$FORMAT/",
            Scope::Info => "$INFO/",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Scope::Format => "FORMAT",
            Scope::Info => "INFO",
        }
    }
}

const SCALARS: [&str; 6] = ["POS", "CHROM", "REF", "ALT", "QUAL", "FILTER"];

/// Outcome of resolving one template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub value: String,
    /// Field references that were present in the record or had a default.
    pub resolved: usize,
    /// Field reference tokens with neither a value nor a default.
    pub unresolved: Vec<String>,
}

impl Resolution {
    /// True when every field reference produced a value.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// A `$INFO/...` or `$FORMAT/...` reference found in a template.
struct Token<'t> {
    raw: &'t str,
    id: &'t str,
    index: Option<usize>,
}

/// Resolves configuration templates.
pub struct Resolver<'a> {
    config: &'a Configuration,
    warnings: &'a Warnings,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Configuration, warnings: &'a Warnings) -> Self {
        Self { config, warnings }
    }

    /// Resolve `template` to its literal value.
    pub fn resolve(
        &self,
        template: &str,
        record: &Record,
        sample: Option<&SampleValues>,
    ) -> Result<String> {
        Ok(self.evaluate(template, record, sample, None)?.value)
    }

    /// Resolve `template`, consulting `defaults` first for missing references.
    pub fn evaluate(
        &self,
        template: &str,
        record: &Record,
        sample: Option<&SampleValues>,
        defaults: Option<&BTreeMap<String, String>>,
    ) -> Result<Resolution> {
        let mut resolution = Resolution::default();

        let text = self.substitute_fields(
            template,
            Scope::Format,
            record,
            sample,
            defaults,
            &mut resolution,
        )?;
        let text =
            self.substitute_fields(&text, Scope::Info, record, sample, defaults, &mut resolution)?;
        let text = substitute_scalars(&text, record);

        resolution.value = if text.contains(FUNCTION_TOKEN) {
            function::evaluate(&text)?
        } else {
            text
        };
        Ok(resolution)
    }

    fn substitute_fields(
        &self,
        input: &str,
        scope: Scope,
        record: &Record,
        sample: Option<&SampleValues>,
        defaults: Option<&BTreeMap<String, String>>,
        resolution: &mut Resolution,
    ) -> Result<String> {
        let prefix = scope.prefix();
        let mut out = String::with_capacity(input.len());
        let mut cursor = 0;

        for start in memmem::find_iter(input.as_bytes(), prefix.as_bytes()) {
            if start < cursor {
                continue;
            }
            let Some(token) = scan_token(input, start, prefix.len()) else {
                continue;
            };
            out.push_str(&input[cursor..start]);
            cursor = start + token.raw.len();

            let values = match scope {
                Scope::Info => record.info.get(token.id),
                Scope::Format => {
                    let sample = sample
                        .ok_or_else(|| VcfError::FormatOutsideSample(input.to_string()))?;
                    sample.get(token.id)
                }
            };

            match values {
                Some(values) => {
                    resolution.resolved += 1;
                    match token.index {
                        Some(index) => {
                            let value =
                                values.get(index).ok_or_else(|| VcfError::IndexOutOfRange {
                                    token: token.raw.to_string(),
                                    index,
                                    len: values.len(),
                                })?;
                            out.push_str(value);
                        }
                        None => out.push_str(&values.join(",")),
                    }
                }
                None => match self.default_for(scope, &token, defaults) {
                    Some(default) => {
                        resolution.resolved += 1;
                        out.push_str(default);
                    }
                    None => {
                        resolution.unresolved.push(token.raw.to_string());
                        if !self.is_flag(scope, token.id, record) {
                            self.warnings.warn(format_args!(
                                "The field {} is not present in the {} fields of the variant with ID {}, \
                                 excluding it from this variant. Supply a default to mute this warning",
                                token.id,
                                scope.name(),
                                record.id
                            ));
                        }
                    }
                },
            }
        }

        out.push_str(&input[cursor..]);
        Ok(out)
    }

    /// Default for a missing reference: the resolving field's own defaults,
    /// then the defaults of the configured field the token names.
    fn default_for<'d>(
        &'d self,
        scope: Scope,
        token: &Token<'_>,
        defaults: Option<&'d BTreeMap<String, String>>,
    ) -> Option<&'d str> {
        if let Some(value) = defaults.and_then(|d| d.get(token.raw)) {
            return Some(value.as_str());
        }
        let spec = match scope {
            Scope::Info => self.config.info(token.id),
            Scope::Format => self.config.format(token.id),
        }?;
        spec.defaults.get(token.raw).map(String::as_str)
    }

    /// Absent flags are normal and not worth a warning.
    fn is_flag(&self, scope: Scope, id: &str, record: &Record) -> bool {
        if scope != Scope::Info {
            return false;
        }
        record.header().info(id).is_some_and(|spec| spec.is_flag())
            || self.config.info(id).is_some_and(|spec| spec.is_flag())
    }
}

/// Scan `ID[/INDEX]` following a prefix at `start`.
fn scan_token(input: &str, start: usize, prefix_len: usize) -> Option<Token<'_>> {
    let bytes = input.as_bytes();
    let id_start = start + prefix_len;
    let id_end = id_start + word_len(&bytes[id_start..]);
    if id_end == id_start {
        return None;
    }

    let mut end = id_end;
    let mut index = None;
    if bytes.get(id_end) == Some(&b'/') {
        let digits = bytes[id_end + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits > 0 {
            index = input[id_end + 1..id_end + 1 + digits].parse().ok();
            if index.is_some() {
                end = id_end + 1 + digits;
            }
        }
    }

    Some(Token {
        raw: &input[start..end],
        id: &input[id_start..id_end],
        index,
    })
}

fn word_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count()
}

fn substitute_scalars(input: &str, record: &Record) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    let mut itoa_buf = itoa::Buffer::new();

    for start in memchr::memchr_iter(b'$', input.as_bytes()) {
        if start < cursor {
            continue;
        }
        let rest = &input[start + 1..];
        let Some(name) = SCALARS.iter().find(|name| rest.starts_with(**name)) else {
            continue;
        };
        out.push_str(&input[cursor..start]);
        out.push_str(match *name {
            "POS" => itoa_buf.format(record.pos),
            "CHROM" => record.chrom.as_str(),
            "REF" => record.ref_allele.as_str(),
            "ALT" => record.alt.as_str(),
            "QUAL" => record.qual.as_str(),
            _ => record.filter.as_str(),
        });
        cursor = start + 1 + name.len();
    }

    out.push_str(&input[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use crate::record::parse_record;
    use std::sync::Arc;

    fn record() -> Record {
        let header = Arc::new(
            Header::from_lines([
                "##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Type\">",
                "##INFO=<ID=AF,Number=.,Type=Float,Description=\"AF\">",
                "##INFO=<ID=PRECISE,Number=0,Type=Flag,Description=\"Precise\">",
                "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">",
                "##FORMAT=<ID=AD,Number=.,Type=Integer,Description=\"Depth\">",
                "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1",
            ])
            .unwrap(),
        );
        let line = "chr3\t1200\tcall_7\tG\t<DEL>\t42\tPASS\tSVTYPE=DEL;AF=0.1,0.2;SR=4\tGT:AD\t0/1:10,5";
        parse_record(line, &header, &Warnings::muted()).unwrap()
    }

    #[test]
    fn test_index_addressing() {
        let config = Configuration::default();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);
        let record = record();

        assert_eq!(resolver.resolve("$INFO/AF/1", &record, None).unwrap(), "0.2");
        assert_eq!(resolver.resolve("$INFO/AF", &record, None).unwrap(), "0.1,0.2");
    }

    #[test]
    fn test_scalars() {
        let config = Configuration::default();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);
        let record = record();

        let value = resolver
            .resolve("$CHROM:$POS:$REF>$ALT q=$QUAL f=$FILTER", &record, None)
            .unwrap();
        assert_eq!(value, "chr3:1200:G><DEL> q=42 f=PASS");
    }

    #[test]
    fn test_format_fields_need_sample() {
        let config = Configuration::default();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);
        let record = record();

        let err = resolver.resolve("$FORMAT/GT", &record, None).unwrap_err();
        assert!(matches!(err, VcfError::FormatOutsideSample(_)));

        let sample = record.sample("S1").unwrap();
        assert_eq!(resolver.resolve("$FORMAT/GT", &record, Some(sample)).unwrap(), "0/1");
        assert_eq!(resolver.resolve("$FORMAT/AD/1", &record, Some(sample)).unwrap(), "5");
    }

    #[test]
    fn test_missing_field_warns_and_is_empty() {
        let config = Configuration::default();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);
        let record = record();

        let resolution = resolver.evaluate("x$INFO/CIPOSx", &record, None, None).unwrap();
        assert_eq!(resolution.value, "x");
        assert_eq!(resolution.unresolved, vec!["$INFO/CIPOSx"]);
        assert_eq!(warnings.count(), 1);
    }

    #[test]
    fn test_missing_flag_is_silent() {
        let config = Configuration::default();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);
        let record = record();

        let resolution = resolver.evaluate("$INFO/PRECISE", &record, None, None).unwrap();
        assert_eq!(resolution.value, "");
        assert!(!resolution.is_complete());
        assert_eq!(warnings.count(), 0);
    }

    #[test]
    fn test_defaults_by_token_text() {
        let config = Configuration::default();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);
        let record = record();

        let mut defaults = BTreeMap::new();
        defaults.insert("$INFO/PE".to_string(), "0".to_string());
        let resolution = resolver
            .evaluate("~sum:$INFO/PE,$INFO/SR", &record, None, Some(&defaults))
            .unwrap();
        assert_eq!(resolution.value, "4");
        assert!(resolution.is_complete());
        assert_eq!(warnings.count(), 0);
    }

    #[test]
    fn test_configured_field_defaults_apply() {
        let config = Configuration::from_yaml_str(
            "info:\n  PE:\n    value: $INFO/PE\n    defaults:\n      $INFO/PE: 7\n",
        )
        .unwrap();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);

        assert_eq!(resolver.resolve("$INFO/PE", &record(), None).unwrap(), "7");
    }

    #[test]
    fn test_function_recursion() {
        let config = Configuration::default();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);

        assert_eq!(
            resolver.resolve("val~sum:1,2,~sub:5,2", &record(), None).unwrap(),
            "val6"
        );
        assert_eq!(
            resolver.resolve("~sub:$POS,$INFO/SR", &record(), None).unwrap(),
            "1196"
        );
    }

    #[test]
    fn test_substituted_text_not_rescanned_by_earlier_pass() {
        let config = Configuration::default();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);
        let mut record = record();
        record.alt = "$INFO/SVTYPE".to_string();

        assert_eq!(resolver.resolve("$ALT", &record, None).unwrap(), "$INFO/SVTYPE");
    }

    #[test]
    fn test_index_out_of_range_is_fatal() {
        let config = Configuration::default();
        let warnings = Warnings::muted();
        let resolver = Resolver::new(&config, &warnings);

        let err = resolver.resolve("$INFO/AF/5", &record(), None).unwrap_err();
        assert!(matches!(err, VcfError::IndexOutOfRange { index: 5, len: 2, .. }));
    }
}

//! VCF header model and line parser.
//!
//! Header construction has two phases. A [`HeaderBuilder`] accumulates
//! `##` meta lines and the `#CHROM` column line; [`HeaderBuilder::build`]
//! freezes it into a [`Header`] that records share by `Arc`.

use crate::vcf::{Result, VcfError};
use crate::warnings::Warnings;
use serde::{Deserialize, Deserializer};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Value type of an INFO or FORMAT field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldType {
    Integer,
    Float,
    Flag,
    #[default]
    String,
    Character,
}

impl FieldType {
    /// Parse a type name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" => Some(FieldType::Integer),
            "float" => Some(FieldType::Float),
            "flag" => Some(FieldType::Flag),
            "string" => Some(FieldType::String),
            "character" => Some(FieldType::Character),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "Integer",
            FieldType::Float => "Float",
            FieldType::Flag => "Flag",
            FieldType::String => "String",
            FieldType::Character => "Character",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldType::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown field type '{raw}', expected one of Integer, Float, Flag, String, Character"
            ))
        })
    }
}

/// Declared value count of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Number {
    Count(usize),
    /// `.`, `A`, `G`, `R` or anything else that is not an integer.
    Unbounded,
}

impl Number {
    pub fn parse(s: &str) -> Self {
        s.trim()
            .parse::<usize>()
            .map(Number::Count)
            .unwrap_or(Number::Unbounded)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Count(n) => write!(f, "{}", n),
            Number::Unbounded => f.write_str("."),
        }
    }
}

/// An `##INFO` or `##FORMAT` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub id: String,
    pub number: Number,
    pub field_type: FieldType,
    pub description: String,
}

impl FieldSpec {
    pub fn new(id: impl Into<String>, number: Number, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            number,
            field_type,
            description: String::new(),
        }
    }

    /// Spec assumed for fields the header does not declare.
    pub fn fallback(id: impl Into<String>) -> Self {
        Self::new(id, Number::Count(1), FieldType::String)
    }

    #[inline]
    pub fn is_flag(&self) -> bool {
        self.field_type == FieldType::Flag
    }
}

/// An `##ALT` or `##FILTER` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdDescription {
    pub id: String,
    pub description: String,
}

/// A `##contig` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    pub id: String,
    pub length: u64,
}

/// One classified header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderLine {
    Info(FieldSpec),
    Format(FieldSpec),
    Alt(IdDescription),
    Filter(IdDescription),
    Contig(Contig),
    /// The `#CHROM` line, carrying the sample names.
    Columns(Vec<String>),
    /// Anything else, kept verbatim.
    Other(String),
}

impl HeaderLine {
    /// Classify and decompose a single header line.
    pub fn parse(line: &str) -> Result<Self> {
        if line.starts_with("#CHROM") {
            let samples = line.split('\t').skip(9).map(str::to_string).collect();
            return Ok(HeaderLine::Columns(samples));
        }

        let Some((kind, body)) = structured_body(line) else {
            return Ok(HeaderLine::Other(line.to_string()));
        };

        let fields = split_header_fields(body);
        let get = |key: &str| fields.get(key).map(String::as_str).unwrap_or("");
        // structured lines without an ID are kept verbatim
        let id = fields.get("id").filter(|id| !id.is_empty()).cloned();

        let parsed = match (kind, id) {
            ("INFO" | "FORMAT", Some(id)) => {
                let spec = FieldSpec {
                    id,
                    number: Number::parse(get("number")),
                    field_type: FieldType::parse(get("type")).unwrap_or_default(),
                    description: get("description").to_string(),
                };
                if kind == "INFO" {
                    HeaderLine::Info(spec)
                } else {
                    HeaderLine::Format(spec)
                }
            }
            ("ALT" | "FILTER", Some(id)) => {
                let entry = IdDescription {
                    id,
                    description: get("description").to_string(),
                };
                if kind == "ALT" {
                    HeaderLine::Alt(entry)
                } else {
                    HeaderLine::Filter(entry)
                }
            }
            ("contig", Some(id)) => {
                let length = match fields.get("length") {
                    None => 0,
                    Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                        VcfError::InvalidFormat(format!(
                            "Could not convert contig length '{}' to an integer",
                            raw
                        ))
                    })?,
                };
                HeaderLine::Contig(Contig { id, length })
            }
            _ => HeaderLine::Other(line.to_string()),
        };
        Ok(parsed)
    }
}

/// Split `##KIND=<body>` into its kind and body.
fn structured_body(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("##")?;
    let (kind, body) = rest.split_once('=')?;
    let body = body.strip_prefix('<')?.strip_suffix('>')?;
    Some((kind, body))
}

/// Decompose the body of a structured header line into lower-cased keys and values.
///
/// Commas and `=` inside a `"` or `'` quoted run are literal. A value wrapped in
/// a matching pair of quotes is returned without them.
pub fn split_header_fields(body: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut key: Option<String> = None;
    let mut word = String::new();
    let mut quote: Option<char> = None;

    for c in body.chars() {
        if let Some(q) = quote {
            word.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '=' if key.is_none() => {
                key = Some(word.to_lowercase());
                word.clear();
            }
            ',' => finish_field(&mut fields, key.take(), &mut word),
            '"' | '\'' => {
                quote = Some(c);
                word.push(c);
            }
            _ => word.push(c),
        }
    }
    finish_field(&mut fields, key, &mut word);

    fields
}

fn finish_field(fields: &mut BTreeMap<String, String>, key: Option<String>, word: &mut String) {
    let value = std::mem::take(word);
    match key {
        Some(key) => {
            fields.insert(key, unquote(&value).to_string());
        }
        None if !value.is_empty() => {
            fields.insert(value.to_lowercase(), String::new());
        }
        None => {}
    }
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Mutable header under construction.
#[derive(Debug, Clone, Default)]
pub struct HeaderBuilder {
    header: Header,
    column_line_seen: bool,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one header line into the builder.
    pub fn parse_line(&mut self, line: &str) -> Result<()> {
        let parsed = HeaderLine::parse(line)?;
        self.push(parsed);
        Ok(())
    }

    /// Apply an already classified header line.
    pub fn push(&mut self, line: HeaderLine) {
        let header = &mut self.header;
        match line {
            HeaderLine::Info(spec) => {
                header.info.insert(spec.id.clone(), spec);
            }
            HeaderLine::Format(spec) => {
                header.format.insert(spec.id.clone(), spec);
            }
            HeaderLine::Alt(entry) => {
                header.alt.insert(entry.id.clone(), entry);
            }
            HeaderLine::Filter(entry) => {
                header.filter.insert(entry.id.clone(), entry);
            }
            HeaderLine::Contig(contig) => {
                match header.contigs.iter_mut().find(|c| c.id == contig.id) {
                    Some(existing) => existing.length = contig.length,
                    None => header.contigs.push(contig),
                }
            }
            HeaderLine::Columns(samples) => {
                header.samples = samples;
                self.column_line_seen = true;
            }
            HeaderLine::Other(line) => header.other.push(line),
        }
    }

    /// Whether the `#CHROM` line has been seen.
    pub fn has_column_line(&self) -> bool {
        self.column_line_seen
    }

    /// Freeze the header.
    pub fn build(self) -> Header {
        self.header
    }
}

/// The frozen schema of an input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    info: BTreeMap<String, FieldSpec>,
    format: BTreeMap<String, FieldSpec>,
    alt: BTreeMap<String, IdDescription>,
    filter: BTreeMap<String, IdDescription>,
    contigs: Vec<Contig>,
    samples: Vec<String>,
    other: Vec<String>,
}

impl Header {
    /// Parse a complete header from its lines.
    pub fn from_lines<'a, I>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut builder = HeaderBuilder::new();
        for line in lines {
            builder.parse_line(line)?;
        }
        Ok(builder.build())
    }

    pub fn info(&self, id: &str) -> Option<&FieldSpec> {
        self.info.get(id)
    }

    pub fn format(&self, id: &str) -> Option<&FieldSpec> {
        self.format.get(id)
    }

    /// ALT declarations in id order.
    pub fn alts(&self) -> impl Iterator<Item = &IdDescription> {
        self.alt.values()
    }

    /// FILTER declarations in id order.
    pub fn filters(&self) -> impl Iterator<Item = &IdDescription> {
        self.filter.values()
    }

    /// Contigs in declaration order.
    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    /// Sample names in column order.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Unrecognized header lines, verbatim.
    pub fn other_lines(&self) -> &[String] {
        &self.other
    }

    /// INFO spec for `id`, or the String/1 fallback with a warning.
    pub fn info_or_fallback(&self, id: &str, warnings: &Warnings) -> Cow<'_, FieldSpec> {
        lookup_or_fallback(self.info.get(id), id, "INFO", warnings)
    }

    /// FORMAT spec for `id`, or the String/1 fallback with a warning.
    pub fn format_or_fallback(&self, id: &str, warnings: &Warnings) -> Cow<'_, FieldSpec> {
        lookup_or_fallback(self.format.get(id), id, "FORMAT", warnings)
    }
}

fn lookup_or_fallback<'a>(
    spec: Option<&'a FieldSpec>,
    id: &str,
    section: &str,
    warnings: &Warnings,
) -> Cow<'a, FieldSpec> {
    match spec {
        Some(spec) => Cow::Borrowed(spec),
        None => {
            warnings.warn_once(
                &format!("{section}/{id}"),
                format_args!(
                    "{} field {} not found in header, defaulting to Type 'String' and Number '1'",
                    section, id
                ),
            );
            Cow::Owned(FieldSpec::fallback(id))
        }
    }
}

//! Variant records and the data-line parser.

use crate::header::{FieldSpec, Header, Number};
use crate::vcf::{Result, VcfError};
use crate::warnings::Warnings;
use memchr::memchr_iter;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Keyed values of one sample, by FORMAT id.
pub type SampleValues = BTreeMap<String, Vec<String>>;

/// Number of fixed columns before the first sample column.
pub const FIXED_COLUMNS: usize = 9;

/// A single VCF data line.
///
/// INFO and sample values are lists because a field may carry several values.
/// A Flag field is present with an empty list when set.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub chrom: String,
    /// 1-based position.
    pub pos: u64,
    pub id: String,
    pub ref_allele: String,
    pub alt: String,
    pub qual: String,
    pub filter: String,
    pub info: BTreeMap<String, Vec<String>>,
    pub samples: BTreeMap<String, SampleValues>,
    /// Set once the record has been merged into its mate's breakpoint record.
    pub processed: bool,
    header: Arc<Header>,
}

impl Record {
    /// Create a record with missing (`.`) id, ALT, quality and filter, and REF `N`.
    pub fn new(header: Arc<Header>, chrom: impl Into<String>, pos: u64) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            id: ".".to_string(),
            ref_allele: "N".to_string(),
            alt: ".".to_string(),
            qual: ".".to_string(),
            filter: ".".to_string(),
            info: BTreeMap::new(),
            samples: BTreeMap::new(),
            processed: false,
            header,
        }
    }

    /// The header this record was parsed under.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[inline]
    pub fn shared_header(&self) -> &Arc<Header> {
        &self.header
    }

    pub fn info_values(&self, id: &str) -> Option<&[String]> {
        self.info.get(id).map(Vec::as_slice)
    }

    /// First value of an INFO field.
    pub fn info_first(&self, id: &str) -> Option<&str> {
        self.info.get(id)?.first().map(String::as_str)
    }

    pub fn svtype(&self) -> Option<&str> {
        self.info_first("SVTYPE")
    }

    pub fn sample(&self, name: &str) -> Option<&SampleValues> {
        self.samples.get(name)
    }
}

/// Split a raw field value according to its declaration.
///
/// Flags carry no values. Otherwise the value is split on `,` into at most
/// `number` pieces, the last piece keeping any remaining commas.
pub fn split_field_value(spec: &FieldSpec, raw: &str) -> Vec<String> {
    if spec.is_flag() {
        return Vec::new();
    }
    match spec.number {
        Number::Count(n) => raw.splitn(n, ',').map(str::to_string).collect(),
        Number::Unbounded => raw.split(',').map(str::to_string).collect(),
    }
}

/// Parse one tab-delimited data line under `header`.
pub fn parse_record(line: &str, header: &Arc<Header>, warnings: &Warnings) -> Result<Record> {
    let fields = split_tabs(line);
    let sample_count = header.samples().len();
    let expected = FIXED_COLUMNS + sample_count;
    let column_count_ok = if sample_count == 0 {
        fields.len() == FIXED_COLUMNS - 1 || fields.len() == FIXED_COLUMNS
    } else {
        fields.len() == expected
    };
    if !column_count_ok {
        return Err(VcfError::InvalidFormat(format!(
            "Expected {} columns for {} sample(s), got {}",
            expected,
            sample_count,
            fields.len()
        )));
    }

    let pos = fields[1].parse::<u64>().map_err(|_| VcfError::NotNumeric {
        context: "POS",
        value: fields[1].to_string(),
    })?;

    let mut record = Record::new(Arc::clone(header), fields[0], pos);
    record.id = fields[2].to_string();
    record.ref_allele = fields[3].to_string();
    record.alt = fields[4].to_string();
    record.qual = fields[5].to_string();
    record.filter = fields[6].to_string();

    if fields[7] != "." {
        for entry in fields[7].split(';').filter(|e| !e.is_empty()) {
            let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
            let spec = header.info_or_fallback(key, warnings);
            record
                .info
                .insert(key.to_string(), split_field_value(&spec, value));
        }
    }

    if sample_count > 0 {
        let keys: Vec<&str> = fields[8].split(':').collect();
        for (name, column) in header.samples().iter().zip(&fields[FIXED_COLUMNS..]) {
            let values: Vec<&str> = column.split(':').collect();
            if values.len() > keys.len() {
                return Err(VcfError::InvalidFormat(format!(
                    "Sample {} has {} values but FORMAT declares {} keys",
                    name,
                    values.len(),
                    keys.len()
                )));
            }
            let mut content = SampleValues::new();
            for (key, value) in keys.iter().zip(values) {
                let spec = header.format_or_fallback(key, warnings);
                content.insert(key.to_string(), split_field_value(&spec, value));
            }
            record.samples.insert(name.clone(), content);
        }
    }

    Ok(record)
}

fn split_tabs(line: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(16);
    let mut start = 0;
    for tab in memchr_iter(b'\t', line.as_bytes()) {
        fields.push(&line[start..tab]);
        start = tab + 1;
    }
    fields.push(&line[start..]);
    fields
}

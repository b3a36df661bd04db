//! Rebuild records from the configuration and serialize them.

use crate::config::Configuration;
use crate::header::FieldType;
use crate::record::{Record, SampleValues};
use crate::resolve::Resolver;
use crate::vcf::Result;
use crate::warnings::Warnings;
use std::borrow::Cow;

/// Rebuilds records field by field and numbers them.
pub struct Standardizer<'a> {
    config: &'a Configuration,
    resolver: Resolver<'a>,
    warnings: &'a Warnings,
    next_sequence: usize,
}

impl<'a> Standardizer<'a> {
    pub fn new(config: &'a Configuration, warnings: &'a Warnings) -> Self {
        Self {
            config,
            resolver: Resolver::new(config, warnings),
            warnings,
            next_sequence: 0,
        }
    }

    /// Sequence number the next standardized record will get.
    pub fn next_sequence(&self) -> usize {
        self.next_sequence
    }

    /// Standardize `source` with the next sequence number.
    pub fn standardize(&mut self, source: &Record) -> Result<Record> {
        let sequence = self.next_sequence;
        let record = self.standardize_with_sequence(source, sequence)?;
        self.next_sequence += 1;
        Ok(record)
    }

    /// Standardize `source` using an explicit sequence number.
    pub fn standardize_with_sequence(&self, source: &Record, sequence: usize) -> Result<Record> {
        let mut out = Record::new(source.shared_header().clone(), source.chrom.clone(), source.pos);
        out.ref_allele = source.ref_allele.clone();
        out.alt = source.alt.clone();
        out.qual = source.qual.clone();
        out.filter = source.filter.clone();

        let mut source = Cow::Borrowed(source);
        let mut svtype = match source.svtype() {
            Some(svtype) => svtype.to_string(),
            None => {
                self.warnings.warn(format_args!(
                    "The variant with ID {} has no SVTYPE in its INFO fields",
                    source.id
                ));
                String::new()
            }
        };

        if let Some(remapped) = self.config.remap_alt(&svtype) {
            let remapped = remapped.to_string();
            out.alt = format!("<{}>", remapped);
            source
                .to_mut()
                .info
                .insert("SVTYPE".to_string(), vec![remapped.clone()]);
            svtype = remapped;
        }

        let id = self.resolver.resolve(self.config.id_template(), &source, None)?;
        out.id = format!("{}_{}", id, sequence);

        for (name, spec) in self.config.info_fields() {
            let template = spec.template_for(&svtype);
            if template.is_empty() {
                continue;
            }
            let resolution =
                self.resolver
                    .evaluate(template, &source, None, Some(&spec.defaults))?;
            if spec.is_flag() {
                if resolution.is_complete() {
                    out.info.insert(name.to_string(), Vec::new());
                }
            } else {
                out.info.insert(name.to_string(), vec![resolution.value]);
            }
        }

        for (sample, values) in &source.samples {
            let mut content = SampleValues::new();
            for (name, spec) in self.config.format_fields() {
                let template = spec.template_for(&svtype);
                let resolution =
                    self.resolver
                        .evaluate(template, &source, Some(values), Some(&spec.defaults))?;
                content.insert(name.to_string(), vec![resolution.value]);
            }
            out.samples.insert(sample.clone(), content);
        }

        Ok(out)
    }
}

/// Serialize a record as a tab-delimited data line (no trailing newline).
///
/// INFO and FORMAT keys and sample columns come out in lexicographic order,
/// so the text is a function of the record's contents alone.
pub fn to_text(record: &Record, config: &Configuration) -> String {
    let mut line = String::with_capacity(256);
    let mut itoa_buf = itoa::Buffer::new();

    for column in [
        record.chrom.as_str(),
        itoa_buf.format(record.pos),
        record.id.as_str(),
        record.ref_allele.as_str(),
        record.alt.as_str(),
        record.qual.as_str(),
        record.filter.as_str(),
    ] {
        line.push_str(column);
        line.push('\t');
    }

    let info_start = line.len();
    for (key, values) in &record.info {
        if is_flag(record, config, key) {
            if line.len() > info_start {
                line.push(';');
            }
            line.push_str(key);
            continue;
        }
        if values.len() == 1 && values[0].is_empty() {
            continue;
        }
        if line.len() > info_start {
            line.push(';');
        }
        line.push_str(key);
        line.push('=');
        line.push_str(&values.join(","));
    }
    if line.len() == info_start {
        line.push('.');
    }

    let Some(first) = record.samples.values().next() else {
        return line;
    };
    let keys: Vec<&str> = first.keys().map(String::as_str).collect();
    line.push('\t');
    line.push_str(&keys.join(":"));
    for values in record.samples.values() {
        line.push('\t');
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                line.push(':');
            }
            match values.get(*key) {
                Some(v) => line.push_str(&v.join(",")),
                None => line.push('.'),
            }
        }
    }
    line
}

fn is_flag(record: &Record, config: &Configuration, key: &str) -> bool {
    match config.info(key) {
        Some(spec) => spec.field_type == FieldType::Flag,
        None => record.header().info(key).is_some_and(|spec| spec.is_flag()),
    }
}

//! VCF file reader and crate-wide error type.
//!
//! The reader buffers the whole input: header lines feed a [`HeaderBuilder`]
//! and data lines are held back until the header is frozen, so every record
//! is parsed against the complete schema no matter where header lines appear.

use crate::header::{Header, HeaderBuilder};
use crate::record::{parse_record, Record};
use crate::warnings::Warnings;
use flate2::read::MultiGzDecoder;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a normalization run.
#[derive(Error, Debug)]
pub enum VcfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid VCF format: {0}")]
    InvalidFormat(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse the config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Cannot convert {context} value '{value}' to a number")]
    NotNumeric { context: &'static str, value: String },

    #[error("The function '{0}' is not supported")]
    UnknownFunction(String),

    #[error("No function found in '{0}'")]
    MalformedFunction(String),

    #[error("Cannot use a FORMAT field in a non-FORMAT context: '{0}'")]
    FormatOutsideSample(String),

    #[error("Index {index} of '{token}' is out of range ({len} values)")]
    IndexOutOfRange {
        token: String,
        index: usize,
        len: usize,
    },

    #[error("Variant {id} is missing the {field} field")]
    MissingField { id: String, field: &'static str },

    #[error("Variant {id} has no breakend notation in ALT '{alt}'")]
    MalformedBreakend { id: String, alt: String },
}

pub type Result<T> = std::result::Result<T, VcfError>;

/// A fully buffered VCF: frozen header plus records in input order.
#[derive(Debug, Clone)]
pub struct VcfFile {
    pub header: Arc<Header>,
    pub records: Vec<Record>,
}

impl VcfFile {
    /// Map record ids to their position in `records`.
    ///
    /// Missing ids (`.`) are not indexed and the first record wins on duplicates.
    pub fn id_index(&self) -> FxHashMap<&str, usize> {
        build_id_index(&self.records)
    }
}

pub(crate) fn build_id_index(records: &[Record]) -> FxHashMap<&str, usize> {
    let mut index = FxHashMap::default();
    for (i, record) in records.iter().enumerate() {
        if record.id != "." {
            index.entry(record.id.as_str()).or_insert(i);
        }
    }
    index
}

/// A line-oriented VCF reader.
pub struct VcfReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
}

impl VcfReader<Box<dyn Read>> {
    /// Open a VCF file from a path. `-` reads stdin, `.gz` inputs are decompressed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let inner: Box<dyn Read> = if path.to_string_lossy() == "-" {
            Box::new(io::stdin())
        } else {
            let file = File::open(path)?;
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz")) {
                Box::new(MultiGzDecoder::new(file))
            } else {
                Box::new(file)
            }
        };
        Ok(Self::with_capacity(inner, 64 * 1024))
    }
}

impl<R: Read> VcfReader<R> {
    /// Create a new VCF reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(4096),
        }
    }

    /// Create a VCF reader with custom buffer capacity.
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
            buffer: String::with_capacity(4096),
        }
    }

    /// Read the next non-empty logical line, without its line terminator.
    pub fn read_line(&mut self) -> Result<Option<(usize, String)>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some((self.line_number, line.to_string())));
        }
    }

    /// Consume the whole input into a [`VcfFile`].
    pub fn read_all(mut self, warnings: &Warnings) -> Result<VcfFile> {
        let mut builder = HeaderBuilder::new();
        let mut data_lines: Vec<(usize, String)> = Vec::new();

        while let Some((line_number, line)) = self.read_line()? {
            if line.starts_with('#') {
                builder
                    .parse_line(&line)
                    .map_err(|e| annotate(e, line_number))?;
            } else {
                data_lines.push((line_number, line));
            }
        }

        if !builder.has_column_line() {
            warnings.warn(format_args!(
                "No #CHROM column header line found, assuming no samples"
            ));
        }

        let header = Arc::new(builder.build());
        let mut records = Vec::with_capacity(data_lines.len());
        for (line_number, line) in data_lines {
            let record =
                parse_record(&line, &header, warnings).map_err(|e| annotate(e, line_number))?;
            records.push(record);
        }

        tracing::debug!(
            records = records.len(),
            samples = header.samples().len(),
            "read VCF input"
        );
        Ok(VcfFile { header, records })
    }
}

fn annotate(err: VcfError, line: usize) -> VcfError {
    match err {
        VcfError::InvalidFormat(message) => VcfError::Parse { line, message },
        VcfError::NotNumeric { .. } => VcfError::Parse {
            line,
            message: err.to_string(),
        },
        other => other,
    }
}

/// Read a whole VCF file from a path.
pub fn read_vcf<P: AsRef<Path>>(path: P, warnings: &Warnings) -> Result<VcfFile> {
    VcfReader::from_path(path)?.read_all(warnings)
}

/// Parse a VCF from a string (useful for testing).
pub fn parse_vcf(content: &str, warnings: &Warnings) -> Result<VcfFile> {
    VcfReader::new(content.as_bytes()).read_all(warnings)
}

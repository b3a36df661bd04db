//! Conversion between breakend and breakpoint notation.
//!
//! Breakend notation describes a rearrangement as two mated `BND` records
//! whose ALT carries the adjacency (`t[p[`, `t]p]`, `]p]t`, `[p[t`).
//! Breakpoint notation folds the pair into one record with `END` and `CHR2`.
//!
//! Going from breakpoint to breakend loses information: the adjacency cannot
//! be rebuilt from `END` alone, so both mates get ALT `.` and the second mate
//! gets a placeholder REF of `N`.

use crate::record::Record;
use crate::vcf::{build_id_index, Result, VcfError};
use crate::warnings::Warnings;
use std::fmt;
use std::str::FromStr;

/// Target notation for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notation {
    #[default]
    Unchanged,
    Breakpoint,
    Breakend,
}

impl Notation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Notation::Unchanged => "unchanged",
            Notation::Breakpoint => "breakpoint",
            Notation::Breakend => "breakend",
        }
    }
}

impl FromStr for Notation {
    type Err = VcfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "unchanged" => Ok(Notation::Unchanged),
            "breakpoint" => Ok(Notation::Breakpoint),
            "breakend" => Ok(Notation::Breakend),
            other => Err(VcfError::Config(format!(
                "Unknown notation '{}', expected breakpoint or breakend",
                other
            ))),
        }
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Plus,
    Minus,
}

/// Structural class of a merged breakend pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvClass {
    Del,
    Dup,
    Ins,
    Inv,
    Tra,
}

impl SvClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SvClass::Del => "DEL",
            SvClass::Dup => "DUP",
            SvClass::Ins => "INS",
            SvClass::Inv => "INV",
            SvClass::Tra => "TRA",
        }
    }
}

impl fmt::Display for SvClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The adjacency parsed from a breakend ALT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakend {
    pub bracket: u8,
    pub mate_chrom: String,
    pub mate_pos: u64,
    /// Orientation of the local side: `+` when the sequence precedes the
    /// bracket (`t[p[`, `t]p]`), `-` when it follows (`]p]t`, `[p[t`).
    pub strand1: Strand,
    /// `-` for `[`, `+` for `]`.
    pub strand2: Strand,
    /// Length of the sequence on the local side of the brackets.
    pub inserted_len: u64,
}

impl Breakend {
    /// Parse `ALT` of a breakend record. Returns `None` when there is no
    /// `[chrom:pos[` or `]chrom:pos]` part.
    pub fn parse(alt: &str) -> Option<Self> {
        let bytes = alt.as_bytes();
        let open = bytes.iter().position(|&b| b == b'[' || b == b']')?;
        let bracket = bytes[open];
        let close = bytes[open + 1..]
            .iter()
            .position(|&b| b == bracket)
            .map(|rel| rel + open + 1)?;

        let (mate_chrom, mate_pos) = alt[open + 1..close].rsplit_once(':')?;
        if mate_chrom.is_empty() {
            return None;
        }
        let mate_pos = mate_pos.parse::<u64>().ok()?;

        let strand1 = if close + 1 == bytes.len() {
            Strand::Plus
        } else {
            Strand::Minus
        };
        let strand2 = if bracket == b'[' {
            Strand::Minus
        } else {
            Strand::Plus
        };
        let inserted = match strand1 {
            Strand::Plus => &alt[..open],
            Strand::Minus => &alt[close + 1..],
        };

        Some(Self {
            bracket,
            mate_chrom: mate_chrom.to_string(),
            mate_pos,
            strand1,
            strand2,
            inserted_len: inserted.len() as u64,
        })
    }
}

/// Classify an adjacency from `chrom:pos` and return the class with its SVLEN.
pub fn classify(chrom: &str, pos: u64, breakend: &Breakend) -> (SvClass, i64) {
    if chrom != breakend.mate_chrom {
        return (SvClass::Tra, 0);
    }

    let distance = pos.abs_diff(breakend.mate_pos) as i64;
    if breakend.strand1 == breakend.strand2 {
        return (SvClass::Inv, distance);
    }
    if breakend.inserted_len as f64 > distance as f64 * 0.5 {
        return (SvClass::Ins, breakend.inserted_len as i64);
    }

    let duplication = match (breakend.strand1, breakend.strand2) {
        (Strand::Minus, Strand::Plus) => pos < breakend.mate_pos,
        (Strand::Plus, Strand::Minus) => pos > breakend.mate_pos,
        _ => false,
    };
    if duplication {
        (SvClass::Dup, distance)
    } else {
        (SvClass::Del, -distance)
    }
}

/// Merge a breakend and its mate into one breakpoint record.
///
/// The mate on the same chromosome with the lower position becomes the
/// anchor; its ALT supplies the adjacency.
pub fn to_breakpoint(record: &Record, mate: &Record) -> Result<Record> {
    let (first, second) = if record.chrom == mate.chrom && record.pos > mate.pos {
        (mate, record)
    } else {
        (record, mate)
    };

    let breakend = Breakend::parse(&first.alt).ok_or_else(|| VcfError::MalformedBreakend {
        id: first.id.clone(),
        alt: first.alt.clone(),
    })?;
    let (class, svlen) = classify(&first.chrom, first.pos, &breakend);

    let mut merged = first.clone();
    merged.alt = format!("<{}>", class);
    merged.filter = if first.filter == second.filter {
        first.filter.clone()
    } else {
        ".".to_string()
    };
    merged.qual = mean_qual(&first.qual, &second.qual);

    let mut itoa_buf = itoa::Buffer::new();
    merged.info.insert(
        "END".to_string(),
        vec![itoa_buf.format(breakend.mate_pos).to_string()],
    );
    merged
        .info
        .insert("CHR2".to_string(), vec![breakend.mate_chrom.clone()]);
    merged
        .info
        .insert("SVTYPE".to_string(), vec![class.as_str().to_string()]);
    merged
        .info
        .insert("SVLEN".to_string(), vec![itoa_buf.format(svlen).to_string()]);

    Ok(merged)
}

fn mean_qual(a: &str, b: &str) -> String {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(a), Ok(b)) => {
            let mut buf = ryu::Buffer::new();
            buf.format((a + b) / 2.0).to_string()
        }
        _ => ".".to_string(),
    }
}

/// Merge every mated `BND` pair, in input order.
///
/// A record is merged when its SVTYPE is `BND` and `MATEID` names exactly one
/// later record that has not been merged yet. The mate is marked processed and
/// left out of the result. Records that are not mated pass through unchanged.
pub fn convert_breakends(records: &mut [Record], warnings: &Warnings) -> Result<Vec<Record>> {
    let mates: Vec<Option<usize>> = {
        let index = build_id_index(records);
        records
            .iter()
            .map(|record| {
                if record.svtype() != Some("BND") {
                    return None;
                }
                let mate_id = match record.info_values("MATEID") {
                    Some([mate_id]) => mate_id,
                    _ => return None,
                };
                let found = index.get(mate_id.as_str()).copied();
                if found.is_none() {
                    warnings.warn(format_args!(
                        "The mate {} of breakend {} is not present in the input, keeping it as a breakend",
                        mate_id, record.id
                    ));
                }
                found
            })
            .collect()
    };

    let mut converted = Vec::with_capacity(records.len());
    for i in 0..records.len() {
        if records[i].processed {
            continue;
        }
        match mates[i] {
            // an earlier mate that is still unprocessed was already written on its own
            Some(j) if j > i && !records[j].processed => {
                let merged = to_breakpoint(&records[i], &records[j])?;
                if records[i].chrom == records[j].chrom && records[i].pos == records[j].pos {
                    warnings.warn(format_args!(
                        "Breakends {} and {} share a position, classified as {} by strand alone",
                        records[i].id,
                        records[j].id,
                        merged.svtype().unwrap_or("."),
                    ));
                }
                records[j].processed = true;
                converted.push(merged);
            }
            _ => converted.push(records[i].clone()),
        }
    }

    tracing::debug!(
        input = records.len(),
        output = converted.len(),
        "converted breakends to breakpoints"
    );
    Ok(converted)
}

/// Split a breakpoint record into two mated breakends.
///
/// `END` is required. A missing or empty `CHR2` means the record's own chromosome.
pub fn to_breakend(record: &Record) -> Result<(Record, Record)> {
    let end = record
        .info_first("END")
        .ok_or_else(|| VcfError::MissingField {
            id: record.id.clone(),
            field: "END",
        })?;
    let end = end.parse::<u64>().map_err(|_| VcfError::NotNumeric {
        context: "END",
        value: end.to_string(),
    })?;
    let chrom2 = record
        .info_first("CHR2")
        .filter(|chrom| !chrom.is_empty())
        .unwrap_or(record.chrom.as_str())
        .to_string();

    let id1 = format!("{}_01", record.id);
    let id2 = format!("{}_02", record.id);

    let mut first = Record::new(record.shared_header().clone(), record.chrom.clone(), record.pos);
    first.id = id1.clone();
    first.ref_allele = record.ref_allele.clone();
    first.qual = record.qual.clone();
    first.filter = record.filter.clone();
    first.samples = record.samples.clone();
    first.info = record
        .info
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "CHR2" | "END" | "SVLEN"))
        .map(|(key, values)| (key.clone(), values.clone()))
        .collect();
    first
        .info
        .insert("SVTYPE".to_string(), vec!["BND".to_string()]);

    let mut second = first.clone();
    second.chrom = chrom2;
    second.pos = end;
    second.id = id2.clone();
    second.ref_allele = "N".to_string();

    first.info.insert("MATEID".to_string(), vec![id2]);
    second.info.insert("MATEID".to_string(), vec![id1]);

    Ok((first, second))
}

/// Breakend form of a record. Records already in `BND` notation are kept as they are.
pub fn expand_to_breakends(record: Record) -> Result<Vec<Record>> {
    if record.svtype() == Some("BND") {
        return Ok(vec![record]);
    }
    let (first, second) = to_breakend(&record)?;
    Ok(vec![first, second])
}

//! Normalize command implementation.
//!
//! Reads the whole input, optionally folds breakend pairs into breakpoints,
//! standardizes every record against the configuration and writes the result.
//! Splitting into breakends happens after standardization so both mates share
//! the standardized id.

use crate::config::Configuration;
use crate::notation::{convert_breakends, expand_to_breakends, Notation};
use crate::output::{HeaderOptions, VcfWriter};
use crate::standardize::Standardizer;
use crate::vcf::{Result, VcfFile, VcfReader};
use crate::warnings::Warnings;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

/// Normalize command configuration.
#[derive(Debug, Clone, Default)]
pub struct NormalizeCommand {
    /// Target notation
    pub notation: Notation,
    /// Leave out the `##fileDate` line
    pub no_date: bool,
    /// Fixed `##fileDate` value instead of today's date
    pub file_date: Option<String>,
    /// Count warnings without logging them
    pub mute_warnings: bool,
}

impl NormalizeCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notation(mut self, notation: Notation) -> Self {
        self.notation = notation;
        self
    }

    pub fn with_no_date(mut self, no_date: bool) -> Self {
        self.no_date = no_date;
        self
    }

    pub fn with_file_date(mut self, date: impl Into<String>) -> Self {
        self.file_date = Some(date.into());
        self
    }

    pub fn with_mute_warnings(mut self, mute: bool) -> Self {
        self.mute_warnings = mute;
        self
    }

    /// Normalize the VCF at `input_path` (`-` for stdin, `.gz` decompressed).
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        input_path: P,
        config: &Configuration,
        output: W,
    ) -> Result<NormalizeStats> {
        let warnings = Warnings::with_muted(self.mute_warnings);
        let vcf = VcfReader::from_path(input_path)?.read_all(&warnings)?;
        self.process(vcf, config, output, &warnings)
    }

    /// Normalize a VCF read from any reader.
    pub fn run_reader<R: Read, W: Write>(
        &self,
        reader: R,
        config: &Configuration,
        output: W,
    ) -> Result<NormalizeStats> {
        let warnings = Warnings::with_muted(self.mute_warnings);
        let vcf = VcfReader::new(reader).read_all(&warnings)?;
        self.process(vcf, config, output, &warnings)
    }

    /// Normalize an already parsed VCF.
    pub fn process<W: Write>(
        &self,
        vcf: VcfFile,
        config: &Configuration,
        output: W,
        warnings: &Warnings,
    ) -> Result<NormalizeStats> {
        let VcfFile {
            header,
            mut records,
        } = vcf;
        let mut stats = NormalizeStats {
            records_read: records.len(),
            ..NormalizeStats::default()
        };

        let mut writer = VcfWriter::new(output);
        let options = HeaderOptions {
            file_date: self.header_date(),
            notation: self.notation,
        };
        writer.write_header(&header, config, &options)?;

        let records = if self.notation == Notation::Breakpoint {
            let converted = convert_breakends(&mut records, warnings)?;
            stats.breakends_merged = records.len() - converted.len();
            converted
        } else {
            records
        };

        let mut standardizer = Standardizer::new(config, warnings);
        for record in &records {
            let standardized = standardizer.standardize(record)?;
            if self.notation == Notation::Breakend {
                let expanded = expand_to_breakends(standardized)?;
                if expanded.len() == 2 {
                    stats.breakpoints_split += 1;
                }
                for record in &expanded {
                    writer.write_record(record, config)?;
                }
            } else {
                writer.write_record(&standardized, config)?;
            }
        }
        writer.flush()?;

        stats.records_written = writer.records_written();
        stats.warnings = warnings.count();
        tracing::info!("{}", stats);
        Ok(stats)
    }

    fn header_date(&self) -> Option<String> {
        if self.no_date {
            return None;
        }
        Some(
            self.file_date
                .clone()
                .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d").to_string()),
        )
    }
}

/// Statistics from a normalize run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub records_read: usize,
    pub records_written: usize,
    /// Mates folded into their partner's breakpoint record.
    pub breakends_merged: usize,
    /// Breakpoint records written as two breakends.
    pub breakpoints_split: usize,
    pub warnings: usize,
}

impl fmt::Display for NormalizeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Normalized {} records into {} ({} breakends merged, {} breakpoints split, {} warnings)",
            self.records_read,
            self.records_written,
            self.breakends_merged,
            self.breakpoints_split,
            self.warnings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "##fileformat=VCFv4.2\n\
        ##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Type\">\n\
        ##INFO=<ID=MATEID,Number=.,Type=String,Description=\"Mate\">\n\
        ##INFO=<ID=END,Number=1,Type=Integer,Description=\"End\">\n\
        ##INFO=<ID=SVLEN,Number=1,Type=Integer,Description=\"Length\">\n\
        ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
        chr1\t100\tbnd1\tN\tN[chr1:500[\t10\tPASS\tSVTYPE=BND;MATEID=bnd2\tGT\t0/1\n\
        chr1\t500\tbnd2\tN\t]chr1:100]N\t20\tPASS\tSVTYPE=BND;MATEID=bnd1\tGT\t0/1\n\
        chr2\t50\tdel1\tA\t<DEL>\t30\tPASS\tSVTYPE=DEL;END=150;SVLEN=-100\tGT\t1/1\n";

    fn run(command: &NormalizeCommand) -> (NormalizeStats, Vec<String>) {
        let config = Configuration::from_yaml_str("id: sv").unwrap();
        let mut out = Vec::new();
        let stats = command
            .run_reader(INPUT.as_bytes(), &config, &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let records = text
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        (stats, records)
    }

    #[test]
    fn test_unchanged_notation() {
        let command = NormalizeCommand::new().with_no_date(true).with_mute_warnings(true);
        let (stats, records) = run(&command);

        assert_eq!(stats.records_read, 3);
        assert_eq!(stats.records_written, 3);
        assert!(records[0].starts_with("chr1\t100\tsv_0\tN\tN[chr1:500[\t10\tPASS\t"));
        assert!(records[2].starts_with("chr2\t50\tsv_2\t"));
    }

    #[test]
    fn test_breakpoint_notation() {
        let command = NormalizeCommand::new()
            .with_notation(Notation::Breakpoint)
            .with_no_date(true)
            .with_mute_warnings(true);
        let (stats, records) = run(&command);

        assert_eq!(stats.breakends_merged, 1);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            "chr1\t100\tsv_0\tN\t<DEL>\t15.0\tPASS\tEND=500;SVLEN=-400;SVTYPE=DEL\tGT\t0/1"
        );
        assert!(records[1].starts_with("chr2\t50\tsv_1\t"));
    }

    #[test]
    fn test_breakend_notation() {
        let command = NormalizeCommand::new()
            .with_notation(Notation::Breakend)
            .with_no_date(true)
            .with_mute_warnings(true);
        let (stats, records) = run(&command);

        assert_eq!(stats.breakpoints_split, 1);
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[2],
            "chr2\t50\tsv_2_01\tA\t.\t30\tPASS\tMATEID=sv_2_02;SVTYPE=BND\tGT\t1/1"
        );
        assert_eq!(
            records[3],
            "chr2\t150\tsv_2_02\tN\t.\t30\tPASS\tMATEID=sv_2_01;SVTYPE=BND\tGT\t1/1"
        );
    }

    #[test]
    fn test_file_date_line() {
        let config = Configuration::default();
        let mut out = Vec::new();
        NormalizeCommand::new()
            .with_file_date("20240101")
            .with_mute_warnings(true)
            .run_reader(INPUT.as_bytes(), &config, &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("##fileformat=VCFv4.2\n##fileDate=20240101\n"));
    }

    #[test]
    fn test_stats_display() {
        let stats = NormalizeStats {
            records_read: 3,
            records_written: 2,
            breakends_merged: 1,
            ..NormalizeStats::default()
        };
        assert_eq!(
            stats.to_string(),
            "Normalized 3 records into 2 (1 breakends merged, 0 breakpoints split, 0 warnings)"
        );
    }
}

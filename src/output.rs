//! Buffered VCF output.
//!
//! The header is synthesized from the input header and the configuration,
//! not copied: every INFO and FORMAT line describes a configured field.

use crate::config::{ConfigFieldSpec, Configuration};
use crate::header::Header;
use crate::notation::Notation;
use crate::record::Record;
use crate::standardize::to_text;
use crate::vcf::Result;
use std::io::{BufWriter, Write};

/// Buffer size for VcfWriter (1MB default).
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

pub const FILE_FORMAT: &str = "VCFv4.2";

const FIXED_COLUMN_NAMES: [&str; 8] = ["#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO"];

/// Options for the synthesized header.
#[derive(Debug, Clone, Default)]
pub struct HeaderOptions {
    /// `##fileDate` value (`YYYYMMDD`); omitted when `None`.
    pub file_date: Option<String>,
    pub notation: Notation,
}

impl HeaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_date(mut self, date: impl Into<String>) -> Self {
        self.file_date = Some(date.into());
        self
    }

    pub fn with_notation(mut self, notation: Notation) -> Self {
        self.notation = notation;
        self
    }
}

/// VCF output writer.
pub struct VcfWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    records_written: usize,
}

impl<W: Write> VcfWriter<W> {
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            records_written: 0,
        }
    }

    /// Number of data lines written so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Write the synthesized header, ending with the column line.
    pub fn write_header(
        &mut self,
        header: &Header,
        config: &Configuration,
        options: &HeaderOptions,
    ) -> Result<()> {
        writeln!(self.writer, "##fileformat={}", FILE_FORMAT)?;
        if let Some(date) = &options.file_date {
            writeln!(self.writer, "##fileDate={}", date)?;
        }

        for alt in header.alts() {
            writeln!(
                self.writer,
                "##ALT=<ID={},Description=\"{}\">",
                alt.id,
                strip_quotes(&alt.description)
            )?;
        }
        for filter in header.filters() {
            writeln!(
                self.writer,
                "##FILTER=<ID={},Description=\"{}\">",
                filter.id,
                strip_quotes(&filter.description)
            )?;
        }

        for (id, spec) in config.info_fields() {
            self.write_field_line("INFO", id, spec)?;
        }
        if options.notation == Notation::Breakend && config.info("MATEID").is_none() {
            self.writer.write_all(
                b"##INFO=<ID=MATEID,Number=.,Type=String,Description=\"ID of mate breakends\">\n",
            )?;
        }
        for (id, spec) in config.format_fields() {
            self.write_field_line("FORMAT", id, spec)?;
        }

        for contig in header.contigs() {
            self.writer.write_all(b"##contig=<ID=")?;
            self.writer.write_all(contig.id.as_bytes())?;
            self.writer.write_all(b",length=")?;
            self.writer
                .write_all(self.itoa_buf.format(contig.length).as_bytes())?;
            self.writer.write_all(b">\n")?;
        }

        let mut columns: Vec<&str> = FIXED_COLUMN_NAMES.to_vec();
        if !header.samples().is_empty() {
            let mut samples: Vec<&str> = header.samples().iter().map(String::as_str).collect();
            samples.sort_unstable();
            columns.push("FORMAT");
            columns.extend(samples);
        }
        self.write_line(&columns.join("\t"))
    }

    fn write_field_line(&mut self, kind: &str, id: &str, spec: &ConfigFieldSpec) -> Result<()> {
        writeln!(
            self.writer,
            "##{}=<ID={},Number={},Type={},Description=\"{}\">",
            kind,
            id,
            spec.number,
            spec.field_type,
            strip_quotes(&spec.description)
        )?;
        Ok(())
    }

    /// Serialize and write one record.
    pub fn write_record(&mut self, record: &Record, config: &Configuration) -> Result<()> {
        self.write_line(&to_text(record, config))?;
        self.records_written += 1;
        Ok(())
    }

    /// Write a full line as-is with newline.
    #[inline]
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn strip_quotes(description: &str) -> &str {
    description.trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header::from_lines([
            "##fileformat=VCFv4.1",
            "##ALT=<ID=DEL,Description=\"Deletion\">",
            "##FILTER=<ID=LowQual,Description='Low quality'>",
            "##contig=<ID=chr1,length=248956422>",
            "##contig=<ID=chr2>",
            "##INFO=<ID=PE,Number=1,Type=Integer,Description=\"Pairs\">",
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ttumor\tnormal",
        ])
        .unwrap()
    }

    fn render(header: &Header, config: &Configuration, options: &HeaderOptions) -> String {
        let mut buf = Vec::new();
        {
            let mut writer = VcfWriter::new(&mut buf);
            writer.write_header(header, config, options).unwrap();
            writer.flush().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_synthesis() {
        let config = Configuration::default();
        let text = render(&header(), &config, &HeaderOptions::new().with_file_date("20240131"));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "##fileformat=VCFv4.2");
        assert_eq!(lines[1], "##fileDate=20240131");
        assert_eq!(lines[2], "##ALT=<ID=DEL,Description=\"Deletion\">");
        assert_eq!(lines[3], "##FILTER=<ID=LowQual,Description=\"Low quality\">");
        assert!(lines.contains(
            &"##INFO=<ID=IMPRECISE,Number=0,Type=Flag,Description=\"Imprecise structural variation\">"
        ));
        assert!(lines.contains(&"##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">"));
        assert!(!text.contains("ID=PE"));
        assert!(lines.contains(&"##contig=<ID=chr1,length=248956422>"));
        assert!(lines.contains(&"##contig=<ID=chr2,length=0>"));
        assert_eq!(
            *lines.last().unwrap(),
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tnormal\ttumor"
        );
    }

    #[test]
    fn test_no_date_and_breakend_mateid() {
        let config = Configuration::default();
        let options = HeaderOptions::new().with_notation(Notation::Breakend);
        let text = render(&header(), &config, &options);

        assert!(!text.contains("##fileDate"));
        assert!(text.contains("##INFO=<ID=MATEID,Number=.,Type=String"));
    }

    #[test]
    fn test_sites_only_column_line() {
        let header = Header::from_lines(["#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO"]).unwrap();
        let text = render(&header, &Configuration::default(), &HeaderOptions::new());
        assert!(text.ends_with("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"));
    }
}

//! Breakend/breakpoint conversion through the public API.

use svnorm::notation::{convert_breakends, to_breakend, Notation};
use svnorm::prelude::*;

const MANTA_VCF: &str = "##fileformat=VCFv4.1
##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Type of structural variant\">
##INFO=<ID=MATEID,Number=.,Type=String,Description=\"ID of mate breakend\">
##INFO=<ID=END,Number=1,Type=Integer,Description=\"End position\">
##INFO=<ID=SVLEN,Number=.,Type=Integer,Description=\"Difference in length\">
##INFO=<ID=IMPRECISE,Number=0,Type=Flag,Description=\"Imprecise structural variation\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=PR,Number=.,Type=Integer,Description=\"Spanning paired-read support\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA12878
chr1\t100\tMantaBND:1:0\tN\tN[chr1:500[\t10\tPASS\tSVTYPE=BND;MATEID=MantaBND:1:1;IMPRECISE\tGT:PR\t0/1:5,3
chr3\t700\tMantaDEL:2\tG\t<DEL>\t50\tPASS\tSVTYPE=DEL;END=900;SVLEN=-200\tGT:PR\t1/1:0,9
chr1\t500\tMantaBND:1:1\tN\t]chr1:100]N\t20\tPASS\tSVTYPE=BND;MATEID=MantaBND:1:0\tGT:PR\t0/1:4,3
chr4\t10\tMantaBND:3:0\tA\tA[chr9:20[\t.\tPASS\tSVTYPE=BND;MATEID=MantaBND:3:1\tGT:PR\t0/1:1,1
chr9\t20\tMantaBND:3:1\tT\t]chr4:10]T\t.\tPASS\tSVTYPE=BND;MATEID=MantaBND:3:0\tGT:PR\t0/1:1,1
";

const CONFIG: &str = "id: manta
format:
  PR:
    value: $FORMAT/PR/1
    type: integer
    number: 1
";

fn normalized_lines(notation: Notation) -> Vec<String> {
    let config = Configuration::from_yaml_str(CONFIG).unwrap();
    let mut out = Vec::new();
    NormalizeCommand::new()
        .with_notation(notation)
        .with_no_date(true)
        .with_mute_warnings(true)
        .run_reader(MANTA_VCF.as_bytes(), &config, &mut out)
        .unwrap();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[test]
fn test_mates_fold_into_one_record_in_input_order() {
    let warnings = Warnings::muted();
    let mut vcf = parse_vcf(MANTA_VCF, &warnings).unwrap();
    let converted = convert_breakends(&mut vcf.records, &warnings).unwrap();

    let ids: Vec<&str> = converted.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["MantaBND:1:0", "MantaDEL:2", "MantaBND:3:0"]);
    assert!(vcf.records[2].processed);
    assert!(vcf.records[4].processed);

    let deletion = &converted[0];
    assert_eq!(deletion.svtype(), Some("DEL"));
    assert_eq!(deletion.info_first("SVLEN"), Some("-400"));
    assert_eq!(deletion.qual, "15.0");

    let translocation = &converted[2];
    assert_eq!(translocation.svtype(), Some("TRA"));
    assert_eq!(translocation.info_first("SVLEN"), Some("0"));
    assert_eq!(translocation.info_first("CHR2"), Some("chr9"));
    assert_eq!(translocation.info_first("END"), Some("20"));
    assert_eq!(translocation.qual, ".");
}

#[test]
fn test_breakpoint_output_numbering() {
    let lines = normalized_lines(Notation::Breakpoint);

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "chr1\t100\tmanta_0\tN\t<DEL>\t15.0\tPASS\tEND=500;IMPRECISE;SVLEN=-400;SVTYPE=DEL\tGT:PR\t0/1:3"
    );
    assert!(lines[1].starts_with("chr3\t700\tmanta_1\tG\t<DEL>\t50\tPASS\tEND=900;SVLEN=-200;SVTYPE=DEL\t"));
    assert_eq!(
        lines[2],
        "chr4\t10\tmanta_2\tA\t<TRA>\t.\tPASS\tCHR2=chr9;END=20;SVLEN=0;SVTYPE=TRA\tGT:PR\t0/1:1"
    );
}

#[test]
fn test_breakend_output_for_deletion() {
    let lines = normalized_lines(Notation::Breakend);

    // three BND records pass through, the deletion becomes two
    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines[1],
        "chr3\t700\tmanta_1_01\tG\t.\t50\tPASS\tMATEID=manta_1_02;SVTYPE=BND\tGT:PR\t1/1:9"
    );
    assert_eq!(
        lines[2],
        "chr3\t900\tmanta_1_02\tN\t.\t50\tPASS\tMATEID=manta_1_01;SVTYPE=BND\tGT:PR\t1/1:9"
    );
    assert!(lines[3].starts_with("chr1\t500\tmanta_2\t"));
}

#[test]
fn test_breakpoint_record_splits_on_own_chromosome() {
    let warnings = Warnings::muted();
    let vcf = parse_vcf(MANTA_VCF, &warnings).unwrap();
    let (first, second) = to_breakend(&vcf.records[1]).unwrap();

    assert_eq!(first.chrom, "chr3");
    assert_eq!(second.chrom, "chr3");
    assert_eq!(second.pos, 900);
    assert_eq!(first.info_first("MATEID"), Some("MantaDEL:2_02"));
    assert_eq!(second.info_first("MATEID"), Some("MantaDEL:2_01"));
    assert_eq!(second.samples, first.samples);
}

#[test]
fn test_unchanged_keeps_every_record() {
    let lines = normalized_lines(Notation::Unchanged);
    assert_eq!(lines.len(), 5);
    assert!(lines[0].contains("\tN[chr1:500[\t"));
}

#[test]
fn test_translocation_without_chr2_splits_on_own_chromosome() {
    let vcf = "##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
chr4\t10\tt1\tA\t<TRA>\t.\tPASS\tSVTYPE=TRA;END=20
";
    let config = Configuration::from_yaml_str("id: x\n").unwrap();
    let mut out = Vec::new();
    NormalizeCommand::new()
        .with_notation(Notation::Breakend)
        .with_no_date(true)
        .with_mute_warnings(true)
        .run_reader(vcf.as_bytes(), &config, &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "chr4\t20\tx_0_02\tN\t.\t.\tPASS\tMATEID=x_0_01;SVTYPE=BND");
}

use crate::sequence::{read_alignment, Record, GAP};
use color_eyre::eyre::{Report, Result};
use std::io::Write;

#[test]
fn record_normalizes_symbols() {
    let record = Record::new("s1", b"acgtNRY-.");
    assert_eq!(record.sequence, [b'A', b'C', b'G', b'T', GAP, GAP, GAP, GAP, GAP]);
    assert_eq!(record.len(), 9);
}

#[test]
fn read_multiline_fasta() -> Result<(), Report> {
    let mut file = tempfile::Builder::new().suffix(".fasta").tempfile()?;
    writeln!(file, ">s1 description\nACGT\nAC\n>s2\nTTTTAA")?;

    let records = read_alignment(&file.path())?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "s1");
    assert_eq!(records[0].sequence, b"ACGTAC");
    assert_eq!(records[1].sequence, b"TTTTAA");
    Ok(())
}

#[test]
fn read_empty_fasta() -> Result<(), Report> {
    let file = tempfile::Builder::new().suffix(".fasta").tempfile()?;
    assert!(read_alignment(&file.path()).is_err());
    Ok(())
}

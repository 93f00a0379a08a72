use crate::utils::{create_parent_dir, get_delimiter, mix_seed, open_reader, verbosity::Verbosity};
use color_eyre::eyre::{Report, Result};
use std::io::{BufRead, Write};

#[test]
fn delimiter_from_extension() -> Result<(), Report> {
    assert_eq!(get_delimiter(&"out/partition.tsv")?, '\t');
    assert_eq!(get_delimiter(&"out/partition.txt")?, '\t');
    assert_eq!(get_delimiter(&"out/partition.csv")?, ',');
    assert!(get_delimiter(&"out/partition.json").is_err());
    Ok(())
}

#[test]
fn open_reader_zst() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("alignment.fasta.zst");
    let compressed = zstd::stream::encode_all(&b">s1\nACGT\n"[..], 0)?;
    std::fs::write(&path, compressed)?;

    let lines: Vec<String> = open_reader(&path)?.lines().collect::<Result<_, _>>()?;
    assert_eq!(lines, [">s1", "ACGT"]);
    Ok(())
}

#[test]
fn open_reader_missing() {
    assert!(open_reader(&"does/not/exist.fasta").is_err());
}

#[test]
fn parent_dir_created() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/deeper/partition.tsv");
    create_parent_dir(&path)?;
    assert!(path.parent().unwrap().exists());

    let mut file = std::fs::File::create(&path)?;
    writeln!(file, "id")?;
    Ok(())
}

#[test]
fn seeds_are_spread() {
    let seeds: Vec<u64> = (0..16).map(|i| mix_seed(7, i)).collect();
    let mut unique = seeds.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), seeds.len());
}

#[test]
fn verbosity_for_rust_log() {
    assert_eq!(Verbosity::default().to_string(), "info");
    assert_eq!(Verbosity::Debug.to_string(), "debug");
}

use crate::table::Table;
use color_eyre::eyre::{Report, Result};

fn example() -> Result<Table<String>, Report> {
    let mut table = Table::new();
    table.headers = ["id", "level_1", "level_2"].map(String::from).to_vec();
    table.add_row(["seq1", "0", "1"].map(String::from).to_vec())?;
    table.add_row(["seq2", "1", "NA"].map(String::from).to_vec())?;
    Ok(table)
}

#[test]
fn add_row_checks_width() -> Result<(), Report> {
    let mut table = example()?;
    assert!(table.add_row(vec!["seq3".to_string()]).is_err());
    assert_eq!(table.rows.len(), 2);
    Ok(())
}

#[test]
fn write_tsv() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("partition.tsv");
    let table = example()?;
    table.write(&path)?;

    let content = std::fs::read_to_string(&path)?;
    assert_eq!(content, "id\tlevel_1\tlevel_2\nseq1\t0\t1\nseq2\t1\tNA\n");
    Ok(())
}

#[test]
fn write_unknown_extension() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    assert!(example()?.write(&dir.path().join("partition.json")).is_err());
    Ok(())
}

#[test]
fn markdown() -> Result<(), Report> {
    let markdown = example()?.to_markdown();
    let lines: Vec<&str> = markdown.lines().collect();
    assert_eq!(lines[0], "|  id  | level_1 | level_2 |");
    assert_eq!(lines[1], "|------|---------|---------|");
    assert_eq!(lines[3], "| seq2 |    1    |   NA    |");
    Ok(())
}

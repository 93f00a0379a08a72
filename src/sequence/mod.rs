//! Aligned sequence [records](Record) and the FASTA alignment reader.

#[cfg(test)]
mod tests;

use crate::utils;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::debug;
use noodles::fasta;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

/// Symbol used for gaps, missing data and ambiguous bases.
pub const GAP: u8 = b'-';

/// Nucleotides that are kept as-is, everything else collapses to [`GAP`].
pub const ALPHABET: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Normalize a raw alignment symbol.
///
/// ```rust
/// use hierbaps::sequence::{normalize, GAP};
/// assert_eq!(normalize(b'a'), b'A');
/// assert_eq!(normalize(b'N'), GAP);
/// assert_eq!(normalize(b'R'), GAP);
/// ```
pub fn normalize(symbol: u8) -> u8 {
    let symbol = symbol.to_ascii_uppercase();
    match ALPHABET.contains(&symbol) {
        true => symbol,
        false => GAP,
    }
}

// ----------------------------------------------------------------------------
// Record
// ----------------------------------------------------------------------------

/// Reduced representation of an aligned sequence record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl Record {
    pub fn new(id: &str, sequence: &[u8]) -> Self {
        Record { id: id.to_string(), sequence: sequence.iter().map(|b| normalize(*b)).collect() }
    }

    /// Parse fasta record into a normalized sequence record.
    pub fn from_fasta(fasta: &fasta::Record) -> Self {
        Record::new(fasta.name(), fasta.sequence().as_ref())
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Read all records of a fasta alignment (optionally `.zst` compressed).
///
/// ## Examples
///
/// ```rust
/// use hierbaps::sequence::read_alignment;
/// use std::io::Write;
///
/// let mut file = tempfile::Builder::new().suffix(".fasta").tempfile()?;
/// writeln!(file, ">s1\nACGT\n>s2\nACNT")?;
/// let records = read_alignment(&file.path())?;
/// assert_eq!(records[1].sequence, b"AC-T");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn read_alignment<P>(path: &P) -> Result<Vec<Record>, Report>
where
    P: AsRef<Path> + Debug,
{
    let mut reader = fasta::Reader::new(utils::open_reader(path)?);

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let fasta = result.wrap_err_with(|| eyre!("Unable to read fasta record {i}: {path:?}"))?;
        records.push(Record::from_fasta(&fasta));
    }

    if records.is_empty() {
        return Err(eyre!("No sequences were found in the alignment: {path:?}")
            .suggestion("Is the input a FASTA file with '>' headers?"));
    }

    debug!("Read {} sequences from {path:?}", records.len());
    Ok(records)
}

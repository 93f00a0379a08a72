//! The [SNP matrix](SnpMatrix) and its per-level [sub-alignment](SubAlignment) views.

#[cfg(test)]
mod tests;

use crate::sequence::Record;
use color_eyre::eyre::{Report, Result};
use color_eyre::Help;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ----------------------------------------------------------------------------
// InputError
// ----------------------------------------------------------------------------

/// Malformed input, raised before any search begins.
#[derive(Clone, Debug, PartialEq)]
pub enum InputError {
    /// The matrix or member set has no sequences.
    Empty,
    /// A sequence row does not have one symbol per site.
    SiteCountMismatch { id: String, expected: usize, found: usize },
    /// Aligned sequences have different lengths.
    LengthMismatch { id: String, expected: usize, found: usize },
    /// The same sequence identifier appears more than once.
    DuplicateId(String),
    /// The number of rows does not match the number of identifiers.
    RowCountMismatch { expected: usize, found: usize },
    /// A member index does not refer to a matrix row.
    MemberOutOfRange { member: usize, sequences: usize },
    /// A partition does not cover the sub-alignment members.
    PartitionSizeMismatch { expected: usize, found: usize },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Empty => write!(f, "input has no sequences"),
            InputError::SiteCountMismatch { id, expected, found } => {
                write!(f, "sequence {id} has {found} sites, expected {expected}")
            }
            InputError::LengthMismatch { id, expected, found } => {
                write!(f, "sequence {id} has length {found}, expected {expected}")
            }
            InputError::DuplicateId(id) => write!(f, "duplicate sequence id: {id}"),
            InputError::RowCountMismatch { expected, found } => {
                write!(f, "found {found} rows for {expected} sequence ids")
            }
            InputError::MemberOutOfRange { member, sequences } => {
                write!(f, "member {member} is out of range for {sequences} sequences")
            }
            InputError::PartitionSizeMismatch { expected, found } => {
                write!(f, "partition covers {found} members, expected {expected}")
            }
        }
    }
}

impl std::error::Error for InputError {}

// ----------------------------------------------------------------------------
// SnpMatrix
// ----------------------------------------------------------------------------

/// Sequences by variable alignment positions.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SnpMatrix {
    /// Sequence identifiers, in input order.
    ids: Vec<String>,
    /// 1-based alignment coordinate of every column.
    positions: Vec<usize>,
    /// One symbol per column, per sequence.
    rows: Vec<Vec<u8>>,
}

impl SnpMatrix {
    /// Build a matrix from pre-extracted rows, checking its shape.
    ///
    /// Symbols are taken as-is, any byte value is a valid allele.
    ///
    /// ```rust
    /// use hierbaps::SnpMatrix;
    /// let matrix = SnpMatrix::new(
    ///     vec!["s1".into(), "s2".into()],
    ///     vec![10, 42],
    ///     vec![b"AC".to_vec(), b"AT".to_vec()],
    /// )?;
    /// assert_eq!(matrix.num_sites(), 2);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new(ids: Vec<String>, positions: Vec<usize>, rows: Vec<Vec<u8>>) -> Result<Self, Report> {
        if ids.is_empty() || rows.is_empty() {
            return Err(Report::new(InputError::Empty));
        }
        if ids.len() != rows.len() {
            return Err(Report::new(InputError::RowCountMismatch {
                expected: ids.len(),
                found: rows.len(),
            }));
        }

        let mut seen = HashSet::new();
        for (id, row) in ids.iter().zip(rows.iter()) {
            if !seen.insert(id.as_str()) {
                return Err(Report::new(InputError::DuplicateId(id.clone()))
                    .suggestion("Sequence identifiers must be unique."));
            }
            if row.len() != positions.len() {
                return Err(Report::new(InputError::SiteCountMismatch {
                    id: id.clone(),
                    expected: positions.len(),
                    found: row.len(),
                }));
            }
        }

        Ok(SnpMatrix { ids, positions, rows })
    }

    /// Extract the variable columns of an alignment.
    ///
    /// A column is variable when it holds at least two distinct symbols (the gap symbol counts).
    /// An alignment without variable columns yields a matrix with zero sites.
    ///
    /// ```rust
    /// use hierbaps::{sequence::Record, SnpMatrix};
    /// let records = vec![Record::new("s1", b"AACGT"), Record::new("s2", b"AATGT")];
    /// let matrix = SnpMatrix::from_alignment(&records)?;
    /// assert_eq!(matrix.positions(), [3]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_alignment(records: &[Record]) -> Result<Self, Report> {
        let first = records.first().ok_or_else(|| Report::new(InputError::Empty))?;
        let length = first.len();

        if let Some(record) = records.iter().find(|r| r.len() != length) {
            return Err(Report::new(InputError::LengthMismatch {
                id: record.id.clone(),
                expected: length,
                found: record.len(),
            })
            .suggestion(format!("Are you sure {} is aligned correctly?", record.id)));
        }

        let columns = (0..length)
            .filter(|&col| records.iter().map(|r| r.sequence[col]).unique().nth(1).is_some())
            .collect_vec();

        let ids = records.iter().map(|r| r.id.clone()).collect_vec();
        let positions = columns.iter().map(|col| col + 1).collect_vec();
        let rows = records.iter().map(|r| columns.iter().map(|&col| r.sequence[col]).collect()).collect();

        SnpMatrix::new(ids, positions, rows)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn row(&self, i: usize) -> &[u8] {
        &self.rows[i]
    }

    pub fn num_sequences(&self) -> usize {
        self.ids.len()
    }

    pub fn num_sites(&self) -> usize {
        self.positions.len()
    }

    /// View over all sequences.
    pub fn view(&self) -> Result<SubAlignment, Report> {
        SubAlignment::new(self, (0..self.num_sequences()).collect())
    }
}

// ----------------------------------------------------------------------------
// SubAlignment
// ----------------------------------------------------------------------------

/// A variable column of a [`SubAlignment`].
#[derive(Clone, Debug, PartialEq)]
pub struct Site {
    /// Column index into the [`SnpMatrix`].
    pub column: usize,
    /// 1-based alignment coordinate.
    pub position: usize,
    /// Sorted symbols observed among the members.
    pub alphabet: Vec<u8>,
}

/// The matrix restricted to a member subset and to the sites still variable within it.
///
/// Members are addressed by their local index (position in [`members`](SubAlignment::members)),
/// alleles by their code (index into the site alphabet).
#[derive(Clone, Debug, PartialEq)]
pub struct SubAlignment {
    members: Vec<usize>,
    sites: Vec<Site>,
    /// Allele codes, `codes[member][site]`.
    codes: Vec<Vec<u8>>,
}

impl SubAlignment {
    /// Restrict a matrix to `members` (row indices), keeping locally variable sites only.
    pub fn new(matrix: &SnpMatrix, members: Vec<usize>) -> Result<Self, Report> {
        if members.is_empty() {
            return Err(Report::new(InputError::Empty));
        }
        if let Some(&member) = members.iter().find(|&&m| m >= matrix.num_sequences()) {
            return Err(Report::new(InputError::MemberOutOfRange {
                member,
                sequences: matrix.num_sequences(),
            }));
        }

        let sites = (0..matrix.num_sites())
            .filter_map(|column| {
                let alphabet =
                    members.iter().map(|&m| matrix.rows[m][column]).unique().sorted().collect_vec();
                (alphabet.len() > 1).then(|| Site {
                    column,
                    position: matrix.positions[column],
                    alphabet,
                })
            })
            .collect_vec();

        let codes = members
            .iter()
            .map(|&m| {
                sites
                    .iter()
                    .map(|site| {
                        let symbol = matrix.rows[m][site.column];
                        // alphabet was built from these very symbols
                        site.alphabet.iter().position(|s| *s == symbol).unwrap_or_default() as u8
                    })
                    .collect()
            })
            .collect();

        Ok(SubAlignment { members, sites, codes })
    }

    /// Global row indices of the members, in local order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    /// No site varies among the members.
    pub fn is_degenerate(&self) -> bool {
        self.sites.is_empty()
    }

    /// Size of the member by site matrix.
    pub fn cells(&self) -> usize {
        self.members.len() * self.sites.len()
    }

    /// Allele codes of one member across all sites.
    pub fn codes(&self, member: usize) -> &[u8] {
        &self.codes[member]
    }

    /// Largest alphabet over all sites.
    pub fn max_alphabet(&self) -> usize {
        self.sites.iter().map(|s| s.alphabet.len()).max().unwrap_or(1)
    }
}

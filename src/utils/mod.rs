pub mod verbosity;

#[cfg(test)]
mod tests;

use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use zstd::stream::read::Decoder;

/// Compression formats that input files may be stored in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decompress {
    Zst,
}

impl FromStr for Decompress {
    type Err = Report;
    fn from_str(s: &str) -> Result<Self, Report> {
        match s {
            "zst" => Ok(Decompress::Zst),
            _ext => Err(eyre!("Decompression for {_ext:?} is not implemented yet.")),
        }
    }
}

/// Open a file for buffered reading, decompressing on the fly based on the extension.
///
/// Files ending in `.zst` are streamed through a zstd decoder, anything else is read as-is.
///
/// ## Examples
///
/// ```rust
/// use hierbaps::utils::open_reader;
/// use std::io::{BufRead, Write};
///
/// let mut file = tempfile::Builder::new().suffix(".fasta").tempfile()?;
/// writeln!(file, ">s1\nACGT")?;
/// let lines: Vec<String> = open_reader(&file.path())?.lines().collect::<Result<_, _>>()?;
/// assert_eq!(lines, [">s1", "ACGT"]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn open_reader<P>(path: &P) -> Result<Box<dyn BufRead>, Report>
where
    P: AsRef<Path> + Debug,
{
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open file: {path:?}"))
        .suggestion("Check that the alignment path exists and is readable.")?;

    let ext = path.as_ref().extension().and_then(|e| e.to_str()).unwrap_or_default();

    match Decompress::from_str(ext) {
        Ok(Decompress::Zst) => {
            let decoder = Decoder::new(file).wrap_err(format!("Failed to decode: {path:?}"))?;
            Ok(Box::new(BufReader::new(decoder)))
        }
        Err(_) => Ok(Box::new(BufReader::new(file))),
    }
}

/// Get delimiter based on file extension.
///
/// ## Examples
///
/// - `.tsv` => `\t`
/// - `.txt` => `\t`
/// - `.csv` => `,`
///
/// Note that `.txt` is assumed to be tab-delimited!
///
/// ```rust
/// use hierbaps::utils::get_delimiter;
///
/// assert_eq!(get_delimiter(&"partition.tsv")?, '\t');
/// assert_eq!(get_delimiter(&"partition.csv")?, ',');
/// assert!(get_delimiter(&"partition").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn get_delimiter<P>(path: &P) -> Result<char, Report>
where
    P: AsRef<Path> + Debug,
{
    let ext = path
        .as_ref()
        .extension()
        .wrap_err(format!("Failed to get file extension: {path:?}"))?
        .to_str()
        .wrap_err(format!("Failed to convert file extension to str: {path:?}"))?;
    match ext {
        "tsv" | "txt" => Ok('\t'),
        "csv" => Ok(','),
        _ext => {
            Err(eyre!("Unknown file extension: {_ext:?}").suggestion("Options: tsv, csv, or txt"))
        }
    }
}

/// Create the parent directory of a file path, if it doesn't exist yet.
pub fn create_parent_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory: {parent:?}"))?;
        }
    }
    Ok(())
}

/// Mix a seed with a stream index (splitmix64), giving independent well-spread child seeds.
///
/// ```rust
/// use hierbaps::utils::mix_seed;
/// assert_eq!(mix_seed(42, 0), mix_seed(42, 0));
/// assert_ne!(mix_seed(42, 0), mix_seed(42, 1));
/// ```
pub fn mix_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed.wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

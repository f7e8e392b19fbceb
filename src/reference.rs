//! Contig names and lengths of the reference sequence, read from the
//! samtools-style `.fai` index that must sit next to the fasta file.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use bio::io::fasta;

use crate::error::ConfigureError;
use crate::utils::with_appended_extension;

/// Contig lengths of a reference fasta.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceIndex {
    pub fasta: PathBuf,
    lengths: HashMap<String, u64>,
}

impl ReferenceIndex {
    /// Path of the index file expected for a fasta file.
    pub fn index_path(fasta: &Path) -> PathBuf {
        with_appended_extension(fasta, ".fai")
    }

    /// Reads the `.fai` index belonging to `fasta`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use seqerr_configure::reference::ReferenceIndex;
    /// use std::path::Path;
    ///
    /// let reference = ReferenceIndex::from_fasta(Path::new("genome.fa")).unwrap();
    /// println!("chr1: {:?}", reference.contig_length("chr1"));
    /// ```
    pub fn from_fasta(fasta: &Path) -> Result<Self, ConfigureError> {
        let index = Self::index_path(fasta);
        if !index.is_file() {
            return Err(ConfigureError::MissingFastaIndex(index));
        }
        Self::from_reader(File::open(&index)?, fasta)
    }

    /// Reads `.fai` formatted text describing the contigs of `fasta`.
    pub fn from_reader<R: Read>(reader: R, fasta: &Path) -> Result<Self, ConfigureError> {
        let source = Self::index_path(fasta);
        let index = fasta::Index::new(reader)
            .map_err(|e| ConfigureError::MalformedFastaIndex(source.clone(), format!("{:#}", e)))?;

        let mut lengths = HashMap::new();
        for sequence in index.sequences() {
            if lengths.contains_key(&sequence.name) {
                return Err(ConfigureError::MalformedFastaIndex(source, format!("duplicate contig '{}'", sequence.name)));
            }
            lengths.insert(sequence.name, sequence.len);
        }

        log::debug!("Read {} contigs from fasta index: {}", lengths.len(), source.display());

        Ok(Self { fasta: fasta.to_path_buf(), lengths })
    }

    pub fn contig_length(&self, name: &str) -> Option<u64> {
        self.lengths.get(name).copied()
    }
}

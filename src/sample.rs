//! Consistency checks over the set of sample alignment files (BAM/CRAM).
//!
//! Files are first accumulated per role with [`SampleSet::append`] and then
//! checked in one batched pass with [`SampleSet::check`]. The pass sorts the
//! accumulated files before checking, so the outcome does not depend on the
//! order in which roles or files were appended.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ConfigureError;
use crate::reference::ReferenceIndex;
use crate::utils::with_appended_extension;

/// Alignment container formats accepted as sample input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    Bam,
    Cram,
}

impl SampleFormat {
    /// Infers the container format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bam") => Some(Self::Bam),
            Some(ext) if ext.eq_ignore_ascii_case("cram") => Some(Self::Cram),
            _ => None,
        }
    }

    /// Candidate index files for an alignment file, in order of preference.
    pub fn index_candidates(&self, path: &Path) -> Vec<PathBuf> {
        match self {
            SampleFormat::Bam => vec![
                with_appended_extension(path, ".bai"),
                path.with_extension("bai"),
                with_appended_extension(path, ".csi"),
            ],
            SampleFormat::Cram => vec![
                with_appended_extension(path, ".crai"),
                path.with_extension("crai"),
            ],
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleFormat::Bam => write!(f, "BAM"),
            SampleFormat::Cram => write!(f, "CRAM"),
        }
    }
}

/// Reads the sequence dictionary (`@SQ` name and length) of an alignment file.
/// CRAM decoding may need the reference fasta, which is passed along.
pub trait HeaderReader {
    fn read_contigs(&self, path: &Path, format: SampleFormat, reference: &Path) -> Result<Vec<(String, u64)>, ConfigureError>;
}

/// Header reader that shells out to the `htsfile` binary shipped in the private
/// executables directory.
pub struct HtsfileHeaderReader {
    htsfile: PathBuf,
}

impl HtsfileHeaderReader {
    pub fn new(htsfile: &Path) -> Self {
        Self { htsfile: htsfile.to_path_buf() }
    }
}

impl HeaderReader for HtsfileHeaderReader {
    fn read_contigs(&self, path: &Path, _format: SampleFormat, _reference: &Path) -> Result<Vec<(String, u64)>, ConfigureError> {
        let cmd = format!("{} -h {}", self.htsfile.display(), path.display());
        log::debug!("Running command: {}", cmd);

        let output = Command::new(&self.htsfile)
            .arg("-h")
            .arg(path)
            .output()
            .map_err(|e| ConfigureError::CommandExecutionFailed(cmd.clone(), e.to_string()))?;

        if !output.status.success() {
            return Err(ConfigureError::CommandFailed(cmd, output.status.code().unwrap_or(-1)));
        }

        parse_sam_header_contigs(&String::from_utf8_lossy(&output.stdout))
            .map_err(|msg| ConfigureError::CommandExecutionFailed(cmd, msg))
    }
}

/// Header reader using rust-htslib directly, CRAM files are opened against the reference.
#[cfg(feature = "htslib")]
pub struct HtslibHeaderReader;

#[cfg(feature = "htslib")]
impl HeaderReader for HtslibHeaderReader {
    fn read_contigs(&self, path: &Path, format: SampleFormat, reference: &Path) -> Result<Vec<(String, u64)>, ConfigureError> {
        use rust_htslib::bam::{self, Read};

        let open_err = |e: rust_htslib::errors::Error| {
            ConfigureError::CommandExecutionFailed(format!("open {}", path.display()), e.to_string())
        };

        let mut reader = bam::Reader::from_path(path).map_err(open_err)?;
        if format == SampleFormat::Cram {
            reader.set_reference(reference).map_err(open_err)?;
        }

        let header = reader.header();
        let contigs = (0..header.target_count())
            .map(|tid| {
                let name = String::from_utf8_lossy(header.tid2name(tid)).into_owned();
                let length = header.target_len(tid).unwrap_or(0);
                (name, length)
            })
            .collect();

        Ok(contigs)
    }
}

/// Extracts `(SN, LN)` pairs from the `@SQ` lines of a textual SAM header.
pub fn parse_sam_header_contigs(header: &str) -> Result<Vec<(String, u64)>, String> {
    let mut contigs = Vec::new();
    for line in header.lines().filter(|line| line.starts_with("@SQ")) {
        let mut name = None;
        let mut length = None;
        for field in line.split('\t').skip(1) {
            if let Some(value) = field.strip_prefix("SN:") {
                name = Some(value.to_string());
            } else if let Some(value) = field.strip_prefix("LN:") {
                length = Some(value.parse::<u64>().map_err(|e| format!("invalid @SQ length '{}': {}", value, e))?);
            }
        }
        match (name, length) {
            (Some(name), Some(length)) => contigs.push((name, length)),
            _ => return Err(format!("@SQ line without SN and LN tags: '{}'", line)),
        }
    }
    Ok(contigs)
}


#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SampleFile {
    path: PathBuf,
    label: String,
}

/// Accumulates sample files by role and validates them together.
#[derive(Clone, Debug, Default)]
pub struct SampleSet {
    samples: Vec<SampleFile>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds sample files for a role label such as "Input".
    pub fn append(&mut self, label: &str, paths: &[PathBuf]) {
        self.samples.extend(paths.iter().map(|path| SampleFile {
            path: path.clone(),
            label: label.to_string(),
        }));
    }

    /// Validates all accumulated files.
    ///
    /// Checks, for every file: that it is not repeated, that its format is BAM
    /// or CRAM, that its index exists, and that every contig in its header is
    /// present in the reference with the same length. Finally all files must list
    /// their shared contigs in the same order.
    pub fn check(&self, reader: &dyn HeaderReader, reference: &ReferenceIndex) -> Result<(), ConfigureError> {
        let mut samples = self.samples.clone();
        samples.sort();

        for pair in samples.windows(2) {
            if pair[0].path == pair[1].path {
                return Err(ConfigureError::RepeatedSampleFile(pair[0].path.clone()));
            }
        }

        let mut formats = Vec::with_capacity(samples.len());
        for sample in &samples {
            let format = SampleFormat::from_path(&sample.path)
                .ok_or_else(|| ConfigureError::UnknownSampleFormat(sample.label.clone(), sample.path.clone()))?;

            if !format.index_candidates(&sample.path).iter().any(|index| index.is_file()) {
                return Err(ConfigureError::MissingSampleIndex(sample.label.clone(), sample.path.clone()));
            }
            formats.push(format);
        }

        let mut dictionaries: Vec<(&SampleFile, Vec<String>)> = Vec::with_capacity(samples.len());
        for (sample, format) in samples.iter().zip(formats) {
            let contigs = reader
                .read_contigs(&sample.path, format, &reference.fasta)
                .map_err(|e| ConfigureError::SampleHeader(sample.label.clone(), sample.path.clone(), e.to_string()))?;

            check_against_reference(sample, &contigs, reference)?;

            log::debug!("{} {} file {} matches the reference ({} contigs)", sample.label, format, sample.path.display(), contigs.len());
            dictionaries.push((sample, contigs.into_iter().map(|(name, _)| name).collect()));
        }

        if let Some(((first, first_order), rest)) = dictionaries.split_first() {
            let rank: HashMap<&str, usize> = first_order.iter().enumerate().map(|(i, name)| (name.as_str(), i)).collect();
            for (sample, order) in rest {
                let shared: Vec<usize> = order.iter().filter_map(|name| rank.get(name.as_str()).copied()).collect();
                if shared.windows(2).any(|w| w[0] > w[1]) {
                    return Err(ConfigureError::ChromosomeOrderMismatch(sample.path.clone(), first.path.clone()));
                }
            }
        }

        Ok(())
    }
}

fn check_against_reference(sample: &SampleFile, contigs: &[(String, u64)], reference: &ReferenceIndex) -> Result<(), ConfigureError> {
    for (name, length) in contigs {
        match reference.contig_length(name) {
            None => {
                return Err(ConfigureError::ChromosomeMissingFromReference(
                    name.clone(),
                    sample.label.clone(),
                    sample.path.clone(),
                ))
            }
            Some(ref_length) if ref_length != *length => {
                return Err(ConfigureError::ChromosomeLengthMismatch(
                    name.clone(),
                    ref_length,
                    *length,
                    sample.label.clone(),
                    sample.path.clone(),
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

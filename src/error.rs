use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigureError {

    #[error("No {0} sample BAM/CRAM files specified")]
    MissingSampleFile(String),

    #[error("More than one {0} sample BAM/CRAM files specified")]
    MultipleSampleFiles(String),

    #[error("Can't find {0} file: '{1}'")]
    MissingFile(String, PathBuf),

    #[error("Expected {0} file is empty: '{1}'")]
    EmptyFile(String, PathBuf),

    #[error("Can't find expected {0} index file: '{1}'")]
    MissingTabixIndex(String, PathBuf),

    #[error("No reference fasta file specified (--referenceFasta is required)")]
    MissingReference,

    #[error("Can't find expected fasta index file: '{0}'")]
    MissingFastaIndex(PathBuf),

    #[error("Malformed fasta index file '{0}': {1}")]
    MalformedFastaIndex(PathBuf, String),

    #[error("Scan size must be a positive number of megabases, got: {0}")]
    InvalidScanSize(u32),

    #[error("Repeated input BAM/CRAM file specified: '{0}'")]
    RepeatedSampleFile(PathBuf),

    #[error("Unrecognized {0} sample file format, expected a .bam or .cram file: '{1}'")]
    UnknownSampleFormat(String, PathBuf),

    #[error("Can't find expected {0} BAM/CRAM index file for: '{1}'")]
    MissingSampleIndex(String, PathBuf),

    #[error("Failed to read the header of {0} BAM/CRAM file '{1}': {2}")]
    SampleHeader(String, PathBuf, String),

    #[error("Reference genome mismatch: reference fasta file is missing chromosome '{0}' found in {1} BAM/CRAM file: '{2}'")]
    ChromosomeMissingFromReference(String, String, PathBuf),

    #[error("Reference genome mismatch: chromosome '{0}' has length {1} in reference but {2} in {3} BAM/CRAM file: '{4}'")]
    ChromosomeLengthMismatch(String, u64, u64, String, PathBuf),

    #[error("Chromosome order of BAM/CRAM file '{0}' does not match the order in '{1}'")]
    ChromosomeOrderMismatch(PathBuf, PathBuf),

    #[error("Can't parse genomic region argument: '{0}'")]
    InvalidRegion(String),

    #[error("Region argument '{0}' refers to chromosome '{1}' which is not in the reference")]
    RegionChromosomeNotInReference(String, String),

    #[error("Region argument '{0}' ends past the length of chromosome '{1}' ({2})")]
    RegionOutOfBounds(String, String, u64),

    #[error("Can't find expected {0} executable: '{1}'")]
    MissingExecutable(String, PathBuf),

    #[error("Malformed configuration file '{0}' at line {1}: {2}")]
    MalformedConfig(PathBuf, usize, String),

    #[error("Configuration file '{0}' is missing section [{1}]")]
    MissingConfigSection(PathBuf, String),

    #[error("Invalid value for option '{0}' in configuration: {1}")]
    InvalidConfigValue(String, String),

    #[error("Failed to create run directory '{0}': {1}")]
    RunDir(PathBuf, std::io::Error),

    #[error("Failed to execute command '{0}': {1}")]
    CommandExecutionFailed(String, String),

    #[error("Command '{0}' exited with status code: {1}")]
    CommandFailed(String, i32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}

impl ConfigureError {
    /// Whether the error reflects user input failing a domain rule rather
    /// than a failure of the filesystem underneath the configuration run.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            ConfigureError::RunDir(..) | ConfigureError::Io(_) | ConfigureError::Persist(_)
        )
    }
}

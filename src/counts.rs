//! This module ties the configuration stages of the sequence error counts
//! workflow together: option resolution, the sample set check, the workflow
//! invariants and the run script.
//!
//! The primary structures are `SequenceErrorCountsBuilder`, which collects the
//! raw user options, and `SequenceErrorCounts`, the validated configuration that
//! can only be obtained through `SequenceErrorCountsBuilder::build`. Nothing is
//! written to disk until `SequenceErrorCounts::configure` is called.

use std::path::PathBuf;

use crate::error::ConfigureError;
use crate::ini::IniSections;
use crate::options::{resolve, CountsOptions, InstallLayout, OptionDefaults, RawOptions, SAMPLE_LABEL};
use crate::reference::ReferenceIndex;
use crate::runscript::RunScript;
use crate::sample::{HeaderReader, SampleSet};
#[cfg(not(feature = "htslib"))]
use crate::sample::HtsfileHeaderReader;
#[cfg(feature = "htslib")]
use crate::sample::HtslibHeaderReader;
use crate::workflow::WorkflowDescriptor;

/// Validated configuration of the sequence error counts workflow.
#[derive(Clone, Debug)]
pub struct SequenceErrorCounts {
    pub options: CountsOptions,
    pub descriptor: WorkflowDescriptor,
    pub command: Option<String>,
}

impl SequenceErrorCounts {
    /// Creates a new `SequenceErrorCountsBuilder` for the given installation.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use seqerr_configure::prelude::*;
    /// use std::path::{Path, PathBuf};
    ///
    /// let layout = InstallLayout::from_root(Path::new("/opt/counts")).unwrap();
    /// let counts = SequenceErrorCounts::builder(&layout)
    ///     .bam(vec![PathBuf::from("sample.bam")])
    ///     .reference_fasta(PathBuf::from("genome.fa"))
    ///     .build()
    ///     .unwrap();
    /// let script = counts.configure().unwrap();
    /// ```
    pub fn builder(layout: &InstallLayout) -> SequenceErrorCountsBuilder {
        SequenceErrorCountsBuilder::new(layout)
    }

    /// Configuration sections embedded in the run script.
    pub fn sections(&self) -> Result<IniSections, ConfigureError> {
        let mut sections = IniSections::default();
        sections.insert(self.options.to_section()?);
        Ok(sections)
    }

    /// Writes `<runDir>/runWorkflow.py` and returns its path.
    pub fn configure(&self) -> Result<PathBuf, ConfigureError> {
        let sections = self.sections()?;
        RunScript::in_run_dir(&self.options.run_dir, &self.descriptor, &sections)
            .command(self.command.clone())
            .write()
    }
}

/// Builder for constructing a `SequenceErrorCounts` instance.
pub struct SequenceErrorCountsBuilder {
    pub layout: InstallLayout,
    pub defaults: OptionDefaults,
    pub raw: RawOptions,
    pub command: Option<String>,
    pub config: Option<PathBuf>,
}

impl SequenceErrorCountsBuilder {
    /// Creates a builder with the computed defaults of the installation.
    pub fn new(layout: &InstallLayout) -> Self {
        Self {
            defaults: OptionDefaults::new(layout),
            layout: layout.clone(),
            raw: RawOptions::default(),
            command: None,
            config: None,
        }
    }
    /// Sets the sample BAM/CRAM files.
    pub fn bam<T: Into<Vec<PathBuf>>>(mut self, bam: T) -> Self {
        self.raw.bam_list = bam.into();
        self
    }
    /// Sets the tabix indexed ploidy BED file.
    pub fn ploidy<T: Into<Option<PathBuf>>>(mut self, ploidy: T) -> Self {
        self.raw.ploidy_bed = ploidy.into();
        self
    }
    /// Sets the tabix indexed target regions BED file.
    pub fn target_regions<T: Into<Option<PathBuf>>>(mut self, target_regions: T) -> Self {
        self.raw.target_regions_bed = target_regions.into();
        self
    }
    /// Enables or disables the observed indel report; unset falls back to the defaults.
    pub fn report_observed_indels<T: Into<Option<bool>>>(mut self, report: T) -> Self {
        self.raw.is_report_observed_indels = report.into();
        self
    }
    pub fn reference_fasta<T: Into<Option<PathBuf>>>(mut self, reference_fasta: T) -> Self {
        self.raw.reference_fasta = reference_fasta.into();
        self
    }
    pub fn run_dir<T: Into<Option<PathBuf>>>(mut self, run_dir: T) -> Self {
        self.raw.run_dir = run_dir.into();
        self
    }
    /// Sets the `--region` arguments restricting the called genome segments.
    pub fn regions<T: Into<Vec<String>>>(mut self, regions: T) -> Self {
        self.raw.region_str_list = regions.into();
        self
    }
    pub fn call_regions<T: Into<Option<PathBuf>>>(mut self, call_regions: T) -> Self {
        self.raw.call_regions_bed = call_regions.into();
        self
    }
    pub fn scan_size_mb<T: Into<Option<u32>>>(mut self, scan_size_mb: T) -> Self {
        self.raw.scan_size_mb = scan_size_mb.into();
        self
    }
    pub fn extra_counts_arguments<T: Into<Option<String>>>(mut self, args: T) -> Self {
        self.raw.extra_counts_arguments = args.into();
        self
    }
    /// Sets the configuration command recorded in the run script.
    pub fn command<T: Into<Option<String>>>(mut self, command: T) -> Self {
        self.command = command.into();
        self
    }
    /// Sets an INI file with user defaults. Without it, the installed defaults
    /// file is used when present.
    pub fn config<T: Into<Option<PathBuf>>>(mut self, config: T) -> Self {
        self.config = config.into();
        self
    }

    fn load_defaults(&self) -> Result<OptionDefaults, ConfigureError> {
        let installed = self.layout.default_config_file();
        match &self.config {
            Some(path) => self.defaults.clone().load_config(path),
            None if installed.is_file() => self.defaults.clone().load_config(&installed),
            None => Ok(self.defaults.clone()),
        }
    }

    /// Validates the options and builds the `SequenceErrorCounts` instance,
    /// reading sample headers with the `htsfile` binary of the installation
    /// (or rust-htslib when compiled with the 'htslib' feature).
    pub fn build(self) -> Result<SequenceErrorCounts, ConfigureError> {
        let defaults = self.load_defaults()?;

        #[cfg(feature = "htslib")]
        let reader = HtslibHeaderReader;
        #[cfg(not(feature = "htslib"))]
        let reader = HtsfileHeaderReader::new(&defaults.htsfile_bin);

        self.build_with_defaults(defaults, &reader)
    }

    /// Same as [`SequenceErrorCountsBuilder::build`] with a custom sample header reader.
    pub fn build_with_reader(self, reader: &dyn HeaderReader) -> Result<SequenceErrorCounts, ConfigureError> {
        let defaults = self.load_defaults()?;
        self.build_with_defaults(defaults, reader)
    }

    fn build_with_defaults(self, defaults: OptionDefaults, reader: &dyn HeaderReader) -> Result<SequenceErrorCounts, ConfigureError> {
        let options = resolve(self.raw, &defaults)?;
        let reference = ReferenceIndex::from_fasta(&options.reference_fasta)?;

        check_single_sample(&options.bam_list, &reference, reader)?;

        let descriptor = WorkflowDescriptor::new(&self.layout, &options, &reference)?;

        log::info!("Validated configuration for {} run directory: {}", descriptor.class_name, options.run_dir.display());

        Ok(SequenceErrorCounts { options, descriptor, command: self.command })
    }
}

/// This workflow counts errors for exactly one sample; the restriction lives
/// here and not in `SampleSet`, which accepts any number of files per role.
fn check_single_sample(bam_list: &[PathBuf], reference: &ReferenceIndex, reader: &dyn HeaderReader) -> Result<(), ConfigureError> {
    if bam_list.len() > 1 {
        return Err(ConfigureError::MultipleSampleFiles(SAMPLE_LABEL.to_string()));
    }
    let mut samples = SampleSet::new();
    samples.append(SAMPLE_LABEL, bam_list);
    samples.check(reader, reference)
}

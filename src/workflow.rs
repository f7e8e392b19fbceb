//! Invariants of the downstream sequence error counts workflow.
//!
//! [`check_invariants`] runs before anything is written to disk. The same
//! function guards construction of the [`WorkflowDescriptor`] consumed by the
//! run script materializer, so a descriptor can only exist for options that
//! passed every check.

use std::path::PathBuf;

use crate::error::ConfigureError;
use crate::options::{CountsOptions, InstallLayout, PRIMARY_SECTION};
use crate::reference::ReferenceIndex;
use crate::utils::is_executable;

pub const WORKFLOW_CLASS: &str = "SequenceErrorCountsWorkflow";
pub const WORKFLOW_MODULE: &str = "sequenceErrorCountsWorkflow";

/// A genomic interval from a `--region` argument, 1-based and inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub chrom: String,
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl Region {
    /// Parses `chrom`, `chrom:start` or `chrom:start-end`. Thousands separators
    /// in positions are accepted. Contig names containing ':' are resolved
    /// against the reference before the string is split.
    pub fn parse(region: &str, reference: &ReferenceIndex) -> Result<Self, ConfigureError> {
        let invalid = || ConfigureError::InvalidRegion(region.to_string());

        if reference.contig_length(region).is_some() {
            return Ok(Self { chrom: region.to_string(), start: None, end: None });
        }

        let (chrom, range) = region.rsplit_once(':').ok_or_else(invalid)?;
        if chrom.is_empty() {
            return Err(invalid());
        }
        let position = |s: &str| s.replace(',', "").parse::<u64>().map_err(|_| invalid());

        let (start, end) = match range.split_once('-') {
            Some((start, end)) => (position(start)?, Some(position(end)?)),
            None => (position(range)?, None),
        };
        if start == 0 || end.is_some_and(|end| end < start) {
            return Err(invalid());
        }

        Ok(Self { chrom: chrom.to_string(), start: Some(start), end })
    }
}

/// Checks the invariants the downstream workflow relies on.
///
/// * each region names a reference contig and lies within it
/// * the private counting, merging and header binaries are executable
pub fn check_invariants(options: &CountsOptions, reference: &ReferenceIndex) -> Result<(), ConfigureError> {
    for region_str in &options.region_str_list {
        let region = Region::parse(region_str, reference)?;
        let length = reference
            .contig_length(&region.chrom)
            .ok_or_else(|| ConfigureError::RegionChromosomeNotInReference(region_str.clone(), region.chrom.clone()))?;

        let last = region.end.or(region.start).unwrap_or(length);
        if last > length {
            return Err(ConfigureError::RegionOutOfBounds(region_str.clone(), region.chrom, length));
        }
    }

    for (label, bin) in [
        ("sequence error counting", &options.get_counts_bin),
        ("sequence error count merging", &options.merge_counts_bin),
        ("htsfile", &options.htsfile_bin),
    ] {
        if !is_executable(bin) {
            return Err(ConfigureError::MissingExecutable(label.to_string(), bin.clone()));
        }
    }

    Ok(())
}

/// Where the run script finds the workflow and which configuration it runs.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowDescriptor {
    /// Directory added to the module search path of the run script.
    pub module_dir: PathBuf,
    pub module: String,
    pub class_name: String,
    pub primary_section: String,
}

impl WorkflowDescriptor {
    /// Describes the sequence error counts workflow for validated options.
    pub fn new(layout: &InstallLayout, options: &CountsOptions, reference: &ReferenceIndex) -> Result<Self, ConfigureError> {
        check_invariants(options, reference)?;

        Ok(Self {
            module_dir: layout.workflow_dir.clone(),
            module: WORKFLOW_MODULE.to_string(),
            class_name: WORKFLOW_CLASS.to_string(),
            primary_section: PRIMARY_SECTION.to_string(),
        })
    }

    /// Python source file holding the workflow entry point.
    pub fn entry_point(&self) -> PathBuf {
        self.module_dir.join(format!("{}.py", self.module))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;

    fn reference() -> ReferenceIndex {
        ReferenceIndex::from_reader(Cursor::new("chr1\t1000\t6\t60\t61\nHLA-A*01:01\t3000\t1030\t60\t61\n"), Path::new("ref.fa")).unwrap()
    }

    fn options(regions: &[&str], libexec: &Path) -> CountsOptions {
        CountsOptions {
            reference_fasta: PathBuf::from("/ref/genome.fa"),
            run_dir: PathBuf::from("/runs/counts"),
            bam_list: vec![PathBuf::from("/data/sample.bam")],
            ploidy_bed: None,
            target_regions_bed: None,
            call_regions_bed: None,
            region_str_list: regions.iter().map(|r| r.to_string()).collect(),
            is_report_observed_indels: false,
            scan_size_mb: 12,
            extra_counts_arguments: None,
            libexec_dir: libexec.to_path_buf(),
            get_counts_bin: libexec.join("GetSequenceErrorCounts"),
            merge_counts_bin: libexec.join("MergeSequenceErrorCounts"),
            htsfile_bin: libexec.join("htsfile"),
            workflow_version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn parses_region_forms() {
        let reference = reference();
        assert_eq!(
            Region::parse("chr1:1,000-1,000", &reference).unwrap(),
            Region { chrom: "chr1".to_string(), start: Some(1000), end: Some(1000) }
        );
        assert_eq!(Region::parse("chr1:20", &reference).unwrap().end, None);
        assert_eq!(Region::parse("HLA-A*01:01", &reference).unwrap().start, None);
        assert_eq!(Region::parse("HLA-A*01:01:5-10", &reference).unwrap().chrom, "HLA-A*01:01");

        for bad in ["chr1:0-10", "chr1:10-5", "chr1:a-b", ":1-2", "chr2"] {
            assert!(matches!(Region::parse(bad, &reference), Err(ConfigureError::InvalidRegion(_))), "{}", bad);
        }
    }

    #[test]
    fn region_outside_reference_fails() {
        let reference = reference();
        let libexec = PathBuf::from("/nonexistent/libexec");

        let err = check_invariants(&options(&["chrX:1-10"], &libexec), &reference).unwrap_err();
        assert!(matches!(err, ConfigureError::RegionChromosomeNotInReference(..)));

        let err = check_invariants(&options(&["chr1:900-1001"], &libexec), &reference).unwrap_err();
        assert!(matches!(err, ConfigureError::RegionOutOfBounds(_, _, 1000)));
    }

    #[test]
    fn missing_binaries_fail() {
        let err = check_invariants(&options(&["chr1"], Path::new("/nonexistent/libexec")), &reference()).unwrap_err();
        assert!(matches!(err, ConfigureError::MissingExecutable(..)));
        assert!(err.to_string().contains("GetSequenceErrorCounts"));
    }

    #[cfg(unix)]
    #[test]
    fn descriptor_requires_invariants() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::from_root(dir.path()).unwrap();
        std::fs::create_dir_all(&layout.libexec_dir).unwrap();
        for name in ["GetSequenceErrorCounts", "MergeSequenceErrorCounts", "htsfile"] {
            let bin = layout.libexec_dir.join(name);
            std::fs::write(&bin, "#!/bin/sh\n").unwrap();
            std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let descriptor = WorkflowDescriptor::new(&layout, &options(&["chr1:1-1000"], &layout.libexec_dir), &reference()).unwrap();
        assert_eq!(descriptor.class_name, "SequenceErrorCountsWorkflow");
        assert_eq!(descriptor.primary_section, "counts");
        assert!(descriptor.entry_point().ends_with("lib/python/sequenceErrorCountsWorkflow.py"));

        assert!(WorkflowDescriptor::new(&layout, &options(&["chr9"], &layout.libexec_dir), &reference()).is_err());
    }
}

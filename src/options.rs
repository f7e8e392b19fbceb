//! Option resolution: computed defaults, the optional defaults file and the
//! ordered validating transforms from [`RawOptions`] to [`CountsOptions`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigureError;
use crate::ini::{IniSection, IniSections};
use crate::tabix::check_optional_tabix_indexed_file;
use crate::utils::{absolute_path, exe_file, validate_existing_file};
use crate::reference::ReferenceIndex;

/// Name of the configuration section holding the workflow options.
pub const PRIMARY_SECTION: &str = "counts";
/// Run directory used when none is given.
pub const DEFAULT_RUN_DIR: &str = "SequenceErrorCountsWorkflow";
pub const DEFAULT_SCAN_SIZE_MB: u32 = 12;
/// Name of the defaults file looked up in the installed configuration directory.
pub const DEFAULT_CONFIG_FILE: &str = "configureSequenceErrorCountsWorkflow.ini";

pub const SAMPLE_LABEL: &str = "Input";
pub const PLOIDY_LABEL: &str = "ploidy bed";
pub const TARGET_REGIONS_LABEL: &str = "targeted-regions bed";
pub const CALL_REGIONS_LABEL: &str = "call regions bed";


/// Directories of an installation, passed in explicitly instead of being
/// discovered from the location of the running program.
#[derive(Clone, Debug, PartialEq)]
pub struct InstallLayout {
    pub root: PathBuf,
    /// Private executables (counting, merging and header introspection binaries).
    pub libexec_dir: PathBuf,
    /// Location of the workflow module loaded by the run script.
    pub workflow_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl InstallLayout {
    /// Standard layout below an installation root: `libexec/`, `lib/python/`, `share/config/`.
    pub fn from_root(root: &Path) -> Result<Self, ConfigureError> {
        let root = absolute_path(root)?;
        Ok(Self {
            libexec_dir: root.join("libexec"),
            workflow_dir: root.join("lib").join("python"),
            config_dir: root.join("share").join("config"),
            root,
        })
    }

    /// Layout for a program installed as `<root>/bin/<program>`.
    pub fn from_executable(exe: &Path) -> Result<Self, ConfigureError> {
        let bin_dir = exe.parent().unwrap_or(Path::new("."));
        let root = bin_dir.parent().unwrap_or(bin_dir);
        Self::from_root(root)
    }

    pub fn default_config_file(&self) -> PathBuf {
        self.config_dir.join(DEFAULT_CONFIG_FILE)
    }
}


/// Defaults the raw options fall back to.
///
/// Binary paths are always derived from the private executables directory and
/// cannot be changed through the defaults file or the command line.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionDefaults {
    pub run_dir: PathBuf,
    pub reference_fasta: Option<PathBuf>,
    pub scan_size_mb: u32,
    pub is_report_observed_indels: bool,
    pub extra_counts_arguments: Option<String>,
    pub libexec_dir: PathBuf,
    pub get_counts_bin: PathBuf,
    pub merge_counts_bin: PathBuf,
    pub htsfile_bin: PathBuf,
}

impl OptionDefaults {
    pub fn new(layout: &InstallLayout) -> Self {
        let libexec_dir = layout.libexec_dir.clone();
        Self {
            run_dir: PathBuf::from(DEFAULT_RUN_DIR),
            reference_fasta: None,
            scan_size_mb: DEFAULT_SCAN_SIZE_MB,
            is_report_observed_indels: false,
            extra_counts_arguments: None,
            get_counts_bin: libexec_dir.join(exe_file("GetSequenceErrorCounts")),
            merge_counts_bin: libexec_dir.join(exe_file("MergeSequenceErrorCounts")),
            htsfile_bin: libexec_dir.join(exe_file("htsfile")),
            libexec_dir,
        }
    }

    /// Loads user defaults from the `[counts]` section of an INI file.
    pub fn load_config(self, path: &Path) -> Result<Self, ConfigureError> {
        let doc = IniSections::from_file(path)?;
        let section = doc
            .section(PRIMARY_SECTION)
            .ok_or_else(|| ConfigureError::MissingConfigSection(path.to_path_buf(), PRIMARY_SECTION.to_string()))?;

        log::info!("Reading configuration defaults from: {}", path.display());
        self.with_config(section)
    }

    /// Overlays values from a configuration section. Unknown keys are ignored
    /// with a warning, which includes attempts to override binary paths.
    pub fn with_config(mut self, section: &IniSection) -> Result<Self, ConfigureError> {
        for (key, _) in &section.entries {
            let value = match section.get_value(key) {
                Some(value) => value,
                None => continue,
            };
            match key.as_str() {
                "runDir" => self.run_dir = PathBuf::from(config_string(key, value)?),
                "referenceFasta" => self.reference_fasta = config_optional_string(key, value)?.map(PathBuf::from),
                "extraCountsArguments" => self.extra_counts_arguments = config_optional_string(key, value)?,
                "scanSizeMb" => {
                    self.scan_size_mb = value
                        .as_u64()
                        .and_then(|v| u32::try_from(v).ok())
                        .ok_or_else(|| ConfigureError::InvalidConfigValue(key.clone(), format!("expected a positive integer, got {}", value)))?
                }
                "isReportObservedIndels" => {
                    self.is_report_observed_indels = value
                        .as_bool()
                        .ok_or_else(|| ConfigureError::InvalidConfigValue(key.clone(), format!("expected true or false, got {}", value)))?
                }
                _ => log::warn!("Ignoring unsupported configuration option: {}", key),
            }
        }
        Ok(self)
    }
}

fn config_string(key: &str, value: Value) -> Result<String, ConfigureError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ConfigureError::InvalidConfigValue(key.to_string(), format!("expected a string, got {}", other))),
    }
}

fn config_optional_string(key: &str, value: Value) -> Result<Option<String>, ConfigureError> {
    match value {
        Value::Null => Ok(None),
        other => config_string(key, other).map(Some),
    }
}


/// Unvalidated options as supplied by the user.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawOptions {
    pub bam_list: Vec<PathBuf>,
    pub ploidy_bed: Option<PathBuf>,
    pub target_regions_bed: Option<PathBuf>,
    pub is_report_observed_indels: Option<bool>,
    pub reference_fasta: Option<PathBuf>,
    pub run_dir: Option<PathBuf>,
    pub region_str_list: Vec<String>,
    pub call_regions_bed: Option<PathBuf>,
    pub scan_size_mb: Option<u32>,
    pub extra_counts_arguments: Option<String>,
}

/// Fully resolved and validated options of the sequence error counts workflow.
///
/// Serialized as the `[counts]` section of the run script.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountsOptions {
    pub reference_fasta: PathBuf,
    pub run_dir: PathBuf,
    pub bam_list: Vec<PathBuf>,
    pub ploidy_bed: Option<PathBuf>,
    pub target_regions_bed: Option<PathBuf>,
    pub call_regions_bed: Option<PathBuf>,
    pub region_str_list: Vec<String>,
    pub is_report_observed_indels: bool,
    pub scan_size_mb: u32,
    pub extra_counts_arguments: Option<String>,
    pub libexec_dir: PathBuf,
    pub get_counts_bin: PathBuf,
    pub merge_counts_bin: PathBuf,
    pub htsfile_bin: PathBuf,
    pub workflow_version: String,
}

impl CountsOptions {
    /// Configuration section written to the run script.
    pub fn to_section(&self) -> Result<IniSection, ConfigureError> {
        IniSection::from_serializable(PRIMARY_SECTION, self)
    }

    pub fn from_section(section: &IniSection) -> Result<Self, ConfigureError> {
        section.to_deserializable()
    }
}

/// Resolves raw options against the defaults.
///
/// Runs, in order: the shared base checks (reference, run directory, scan size),
/// sample list normalization, and the tabix index checks of the three optional
/// annotation files. The first failure aborts resolution.
pub fn resolve(raw: RawOptions, defaults: &OptionDefaults) -> Result<CountsOptions, ConfigureError> {

    // Base options
    let reference_fasta = raw
        .reference_fasta
        .or_else(|| defaults.reference_fasta.clone())
        .ok_or(ConfigureError::MissingReference)?;
    let reference_fasta = validate_existing_file(&reference_fasta, "reference fasta")?;
    let fasta_index = ReferenceIndex::index_path(&reference_fasta);
    if !fasta_index.is_file() {
        return Err(ConfigureError::MissingFastaIndex(fasta_index));
    }

    let run_dir = absolute_path(raw.run_dir.as_deref().unwrap_or(defaults.run_dir.as_path()))?;

    let scan_size_mb = raw.scan_size_mb.unwrap_or(defaults.scan_size_mb);
    if scan_size_mb == 0 {
        return Err(ConfigureError::InvalidScanSize(scan_size_mb));
    }

    // Sample files
    if raw.bam_list.is_empty() {
        return Err(ConfigureError::MissingSampleFile(SAMPLE_LABEL.to_string()));
    }
    let bam_list = raw
        .bam_list
        .iter()
        .map(|bam| validate_existing_file(bam, &format!("{} BAM/CRAM", SAMPLE_LABEL)))
        .collect::<Result<Vec<_>, _>>()?;

    // Tabix indexed annotations
    let ploidy_bed = check_optional_tabix_indexed_file(raw.ploidy_bed.as_deref(), PLOIDY_LABEL)?;
    let target_regions_bed = check_optional_tabix_indexed_file(raw.target_regions_bed.as_deref(), TARGET_REGIONS_LABEL)?;
    let call_regions_bed = check_optional_tabix_indexed_file(raw.call_regions_bed.as_deref(), CALL_REGIONS_LABEL)?;

    let options = CountsOptions {
        reference_fasta,
        run_dir,
        bam_list,
        ploidy_bed,
        target_regions_bed,
        call_regions_bed,
        region_str_list: raw.region_str_list,
        is_report_observed_indels: raw.is_report_observed_indels.unwrap_or(defaults.is_report_observed_indels),
        scan_size_mb,
        extra_counts_arguments: raw.extra_counts_arguments.or_else(|| defaults.extra_counts_arguments.clone()),
        libexec_dir: defaults.libexec_dir.clone(),
        get_counts_bin: defaults.get_counts_bin.clone(),
        merge_counts_bin: defaults.merge_counts_bin.clone(),
        htsfile_bin: defaults.htsfile_bin.clone(),
        workflow_version: clap::crate_version!().to_string(),
    };

    log::debug!("Resolved options: {:?}", options);

    Ok(options)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabix::tabix_index_path;
    use rstest::{fixture, rstest};
    use std::path::Path;
    use tempfile::TempDir;

    struct Inputs {
        dir: TempDir,
        reference: PathBuf,
        bam: PathBuf,
    }

    #[fixture]
    fn inputs() -> Inputs {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("genome.fa");
        std::fs::write(&reference, ">chr1\nACGT\n").unwrap();
        std::fs::write(ReferenceIndex::index_path(&reference), "chr1\t4\t6\t4\t5\n").unwrap();
        let bam = dir.path().join("sample.bam");
        std::fs::write(&bam, b"BAM").unwrap();
        Inputs { dir, reference, bam }
    }

    fn layout(dir: &Path) -> InstallLayout {
        InstallLayout::from_root(&dir.join("install")).unwrap()
    }

    fn raw(inputs: &Inputs) -> RawOptions {
        RawOptions {
            bam_list: vec![inputs.bam.clone()],
            reference_fasta: Some(inputs.reference.clone()),
            run_dir: Some(inputs.dir.path().join("run")),
            ..Default::default()
        }
    }

    #[rstest]
    fn defaults_derive_binaries_from_libexec() {
        let layout = InstallLayout::from_root(Path::new("/opt/counts")).unwrap();
        let defaults = OptionDefaults::new(&layout);

        assert_eq!(defaults.run_dir, PathBuf::from("SequenceErrorCountsWorkflow"));
        assert_eq!(defaults.get_counts_bin, PathBuf::from("/opt/counts/libexec").join(exe_file("GetSequenceErrorCounts")));
        assert_eq!(defaults.merge_counts_bin, PathBuf::from("/opt/counts/libexec").join(exe_file("MergeSequenceErrorCounts")));
        assert!(defaults.extra_counts_arguments.is_none());
        assert_eq!(layout.workflow_dir, PathBuf::from("/opt/counts/lib/python"));
    }

    #[rstest]
    fn layout_from_executable() {
        let layout = InstallLayout::from_executable(Path::new("/opt/counts/bin/seqerr-configure")).unwrap();
        assert_eq!(layout.root, PathBuf::from("/opt/counts"));
    }

    #[rstest]
    fn resolves_valid_options(inputs: Inputs) {
        let defaults = OptionDefaults::new(&layout(inputs.dir.path()));
        let options = resolve(raw(&inputs), &defaults).unwrap();

        assert_eq!(options.bam_list, vec![inputs.bam.clone()]);
        assert!(options.run_dir.is_absolute());
        assert_eq!(options.scan_size_mb, DEFAULT_SCAN_SIZE_MB);
        assert!(options.get_counts_bin.is_absolute());
        assert!(options.ploidy_bed.is_none());
    }

    #[rstest]
    fn zero_samples_fail(inputs: Inputs) {
        let defaults = OptionDefaults::new(&layout(inputs.dir.path()));
        let err = resolve(RawOptions { bam_list: vec![], ..raw(&inputs) }, &defaults).unwrap_err();

        assert!(matches!(err, ConfigureError::MissingSampleFile(_)));
        assert!(err.is_configuration());
        assert!(!inputs.dir.path().join("run").exists());
    }

    #[rstest]
    fn missing_reference_fails(inputs: Inputs) {
        let defaults = OptionDefaults::new(&layout(inputs.dir.path()));
        let err = resolve(RawOptions { reference_fasta: None, ..raw(&inputs) }, &defaults).unwrap_err();
        assert!(matches!(err, ConfigureError::MissingReference));
    }

    #[rstest]
    fn missing_sample_file_fails(inputs: Inputs) {
        let defaults = OptionDefaults::new(&layout(inputs.dir.path()));
        let missing = inputs.dir.path().join("missing.bam");
        let err = resolve(RawOptions { bam_list: vec![missing], ..raw(&inputs) }, &defaults).unwrap_err();
        assert!(matches!(err, ConfigureError::MissingFile(..)));
    }

    #[rstest]
    #[case::ploidy(PLOIDY_LABEL)]
    #[case::target_regions(TARGET_REGIONS_LABEL)]
    #[case::call_regions(CALL_REGIONS_LABEL)]
    fn annotation_without_index_names_label(inputs: Inputs, #[case] label: &str) {
        let bed = inputs.dir.path().join("annotation.bed.gz");
        std::fs::write(&bed, b"bgzf").unwrap();

        let with_bed = |raw: RawOptions| match label {
            PLOIDY_LABEL => RawOptions { ploidy_bed: Some(bed.clone()), ..raw },
            TARGET_REGIONS_LABEL => RawOptions { target_regions_bed: Some(bed.clone()), ..raw },
            _ => RawOptions { call_regions_bed: Some(bed.clone()), ..raw },
        };

        let defaults = OptionDefaults::new(&layout(inputs.dir.path()));
        let err = resolve(with_bed(raw(&inputs)), &defaults).unwrap_err();
        assert!(matches!(err, ConfigureError::MissingTabixIndex(..)));
        assert!(err.to_string().contains(label));
        assert!(!inputs.dir.path().join("run").exists());

        std::fs::write(tabix_index_path(&bed), b"tbi").unwrap();
        let options = resolve(with_bed(raw(&inputs)), &defaults).unwrap();
        let resolved = match label {
            PLOIDY_LABEL => options.ploidy_bed,
            TARGET_REGIONS_LABEL => options.target_regions_bed,
            _ => options.call_regions_bed,
        };
        assert_eq!(resolved, Some(bed));
    }

    #[rstest]
    fn config_section_overrides_defaults(inputs: Inputs) {
        let config = inputs.dir.path().join("defaults.ini");
        std::fs::write(
            &config,
            "[counts]\nscanSizeMb = 4\nextraCountsArguments = --max-depth 100\nisReportObservedIndels = true\ngetCountsBin = /tmp/evil\n",
        )
        .unwrap();

        let layout = layout(inputs.dir.path());
        let defaults = OptionDefaults::new(&layout).load_config(&config).unwrap();
        assert_eq!(defaults.scan_size_mb, 4);
        assert_eq!(defaults.extra_counts_arguments.as_deref(), Some("--max-depth 100"));
        assert!(defaults.is_report_observed_indels);
        assert_eq!(defaults.get_counts_bin, OptionDefaults::new(&layout).get_counts_bin);

        // command line wins over the defaults file
        let options = resolve(RawOptions { scan_size_mb: Some(8), ..raw(&inputs) }, &defaults).unwrap();
        assert_eq!(options.scan_size_mb, 8);
        assert!(options.is_report_observed_indels);

        let options = resolve(RawOptions { is_report_observed_indels: Some(false), ..raw(&inputs) }, &defaults).unwrap();
        assert!(!options.is_report_observed_indels);
    }

    #[rstest]
    fn config_without_section_fails(inputs: Inputs) {
        let config = inputs.dir.path().join("defaults.ini");
        std::fs::write(&config, "[other]\nkey = value\n").unwrap();

        let err = OptionDefaults::new(&layout(inputs.dir.path())).load_config(&config).unwrap_err();
        assert!(matches!(err, ConfigureError::MissingConfigSection(..)));
    }

    #[rstest]
    fn section_round_trip_is_lossless(inputs: Inputs) {
        let defaults = OptionDefaults::new(&layout(inputs.dir.path()));
        let options = resolve(
            RawOptions {
                region_str_list: vec!["chr1:1-4".to_string()],
                extra_counts_arguments: Some("--flag \"quoted\"".to_string()),
                is_report_observed_indels: Some(true),
                ..raw(&inputs)
            },
            &defaults,
        )
        .unwrap();

        let mut doc = IniSections::default();
        doc.insert(options.to_section().unwrap());
        let parsed = IniSections::parse(&doc.render(), Path::new("runWorkflow.py")).unwrap();
        let restored = CountsOptions::from_section(parsed.section(PRIMARY_SECTION).unwrap()).unwrap();

        assert_eq!(restored, options);
    }
}

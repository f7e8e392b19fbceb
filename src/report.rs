use std::path::{Path, PathBuf};
use std::io::Write;
use chrono::{SecondsFormat, Local};
use clap::crate_version;
use serde::{Deserialize, Serialize};
use crate::{counts::SequenceErrorCounts, error::ConfigureError, options::CountsOptions};


/// Summary of one configuration run, optionally written as JSON next to the run script.
#[derive(Serialize, Deserialize)]
pub struct ConfigureReport {
    pub version: String,
    pub date: String,
    pub command: String,
    pub workflow: String,
    pub run_script: PathBuf,
    pub settings: CountsOptions
}
impl ConfigureReport {
    pub fn create(counts: &SequenceErrorCounts, run_script: &Path, json: &Option<PathBuf>) -> Result<Self, ConfigureError> {

        let report = Self {
            version: crate_version!().to_string(),
            date: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            command: match counts.command {
                Some(ref cmd) => cmd.to_string(),
                None => String::new()
            },
            workflow: counts.descriptor.class_name.clone(),
            run_script: run_script.to_path_buf(),
            settings: counts.options.clone()
        };

        if let Some(json) = json {
            Self::to_json(&report, json)?;
        }

        Ok(report)
    }
    pub fn to_json(report: &Self, output: &Path) -> Result<(), ConfigureError> {
        let mut file = std::fs::File::create(output)?;
        let json_string = serde_json::to_string_pretty(report)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::InstallLayout;
    use crate::workflow::WorkflowDescriptor;

    #[test]
    fn writes_json_summary() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::from_root(Path::new("/opt/counts")).unwrap();
        let options = CountsOptions {
            reference_fasta: PathBuf::from("/ref/genome.fa"),
            run_dir: PathBuf::from("/runs/counts"),
            bam_list: vec![PathBuf::from("/data/sample.bam")],
            ploidy_bed: None,
            target_regions_bed: None,
            call_regions_bed: None,
            region_str_list: vec![],
            is_report_observed_indels: true,
            scan_size_mb: 12,
            extra_counts_arguments: None,
            libexec_dir: layout.libexec_dir.clone(),
            get_counts_bin: layout.libexec_dir.join("GetSequenceErrorCounts"),
            merge_counts_bin: layout.libexec_dir.join("MergeSequenceErrorCounts"),
            htsfile_bin: layout.libexec_dir.join("htsfile"),
            workflow_version: "0.1.0".to_string(),
        };
        let counts = SequenceErrorCounts {
            options,
            descriptor: WorkflowDescriptor {
                module_dir: layout.workflow_dir.clone(),
                module: "sequenceErrorCountsWorkflow".to_string(),
                class_name: "SequenceErrorCountsWorkflow".to_string(),
                primary_section: "counts".to_string(),
            },
            command: Some("seqerr-configure --bam sample.bam".to_string()),
        };

        let json = dir.path().join("summary.json");
        ConfigureReport::create(&counts, Path::new("/runs/counts/runWorkflow.py"), &Some(json.clone())).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value["workflow"], "SequenceErrorCountsWorkflow");
        assert_eq!(value["settings"]["isReportObservedIndels"], true);
        assert_eq!(value["run_script"], "/runs/counts/runWorkflow.py");
    }
}

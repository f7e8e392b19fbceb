use std::ffi::OsString;
use std::path::PathBuf;
use clap::{crate_version, Args, Parser};

use crate::prelude::*;

#[derive(Debug, Parser)]
#[command(
    author="Eike Steinig (@esteinig)",
    version=crate_version!(),
    about="Configure the sequence error counts workflow and write its run script",
    help_template="\
{before-help}{name} {version}
{author-with-newline}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
"
)]
#[command(styles=get_styles())]
#[command(arg_required_else_help(true))]
pub struct App {
    /// Output logs to file instead of terminal
    ///
    /// Specify a file path to store the output logs. If not provided,
    /// logs will be displayed in the terminal.
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,
    /// Installation root directory
    ///
    /// Root containing 'libexec/', 'lib/python/' and 'share/config/'. Defaults
    /// to the parent of the directory holding this program.
    #[arg(long="installDir", value_name="DIR", hide=true)]
    pub install_dir: Option<PathBuf>,
    /// Configuration summary output file (.json)
    #[arg(long, value_name="FILE")]
    pub json: Option<PathBuf>,

    #[command(flatten)]
    pub workflow: CountsArgs,
}

/// Command-line arguments of the sequence error counts workflow
#[derive(Args, Debug)]
pub struct CountsArgs {
    /// Sample BAM or CRAM file [required]
    ///
    /// Exactly one sample alignment file with its index (.bai/.csi or .crai)
    /// is accepted by this workflow.
    #[arg(long="bam", value_name="FILE")]
    bam: Vec<PathBuf>,
    /// Ploidy BED file (tabix indexed)
    ///
    /// The BED records should provide either 1 or 0 in the 5th 'score' column
    /// to indicate haploid or deleted status respectively. File must be tabix
    /// indexed.
    #[arg(long="ploidy", value_name="FILE")]
    ploidy: Option<PathBuf>,
    /// BED file of regions to allow variant calls (tabix indexed)
    ///
    /// Calls outside these areas are filtered as OffTarget. File must be
    /// tabix indexed.
    #[arg(long="targetRegions", value_name="FILE")]
    target_regions: Option<PathBuf>,
    /// Report all observed indels by location in a separate BED file
    ///
    /// The report is written in addition to the summary counts. Given without
    /// a value the report is enabled; '--reportObservedIndels false' disables
    /// a report enabled in the configuration file.
    #[arg(long="reportObservedIndels", value_name="BOOL", num_args=0..=1, default_missing_value="true")]
    report_observed_indels: Option<bool>,
    /// Samtools-indexed reference fasta file [required]
    #[arg(long="referenceFasta", value_name="FILE")]
    reference_fasta: Option<PathBuf>,
    /// Name of directory to be created where all workflow scripts and output will be written
    ///
    /// Each analysis requires a separate directory. Default is
    /// 'SequenceErrorCountsWorkflow' in the current directory.
    #[arg(long="runDir", value_name="DIR")]
    run_dir: Option<PathBuf>,
    /// Limit the analysis to a region of the genome
    ///
    /// Format is 'chrom', 'chrom:start' or 'chrom:start-end' with 1-based
    /// inclusive positions. May be given multiple times.
    #[arg(long="region", value_name="REGION")]
    region: Vec<String>,
    /// Restrict the analysis to regions in a tabix indexed BED file
    #[arg(long="callRegions", value_name="FILE")]
    call_regions: Option<PathBuf>,
    /// Maximum sequence region size (in megabases) scanned by each task
    #[arg(long="scanSizeMb", value_name="INT")]
    scan_size_mb: Option<u32>,
    /// Additional arguments passed to the counting binary
    ///
    /// Arguments must be a quoted string e.g. '--max-depth 100'
    #[arg(long="extraCountsArguments", value_name="STR", allow_hyphen_values=true, hide=true)]
    extra_counts_arguments: Option<String>,
    /// Configuration file with default option values ([counts] section)
    #[arg(long="config", value_name="FILE")]
    config: Option<PathBuf>,
}
impl CountsArgs {
    /// Validates the provided arguments and builds a `SequenceErrorCounts` instance.
    ///
    /// This method checks the provided arguments for consistency and constructs
    /// a `SequenceErrorCounts` instance based on the validated arguments.
    ///
    /// # Returns
    ///
    /// * `Result<SequenceErrorCounts, ConfigureError>` - Ok with the validated configuration, otherwise an error.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use clap::Parser;
    /// use seqerr_configure::prelude::*;
    /// use seqerr_configure::terminal::App;
    /// use std::path::Path;
    ///
    /// let app = App::parse();
    /// let layout = InstallLayout::from_root(Path::new("/opt/counts")).unwrap();
    /// let counts = app.workflow.validate_and_build(&layout).unwrap();
    /// ```
    pub fn validate_and_build(self, layout: &InstallLayout) -> Result<SequenceErrorCounts, ConfigureError> {

        let command = command_line(std::env::args_os());

        SequenceErrorCountsBuilder::new(layout)
            .command(command)
            .config(self.config)
            .bam(self.bam)
            .ploidy(self.ploidy)
            .target_regions(self.target_regions)
            .report_observed_indels(self.report_observed_indels)
            .reference_fasta(self.reference_fasta)
            .run_dir(self.run_dir)
            .regions(self.region)
            .call_regions(self.call_regions)
            .scan_size_mb(self.scan_size_mb)
            .extra_counts_arguments(self.extra_counts_arguments)
            .build()
    }
}

/// Joins the program arguments into the command recorded in the run script.
/// Arguments that are not valid UTF-8 are converted lossily.
pub fn command_line<I: IntoIterator<Item = OsString>>(args: I) -> String {
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<String>>()
        .join(" ")
}

/// Configures the styles for the command-line interface.
pub fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .header(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .literal(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
}

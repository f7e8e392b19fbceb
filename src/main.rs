use anyhow::Result;
use clap::Parser;

use seqerr_configure::prelude::*;
use seqerr_configure::terminal::App;

fn main() -> Result<()> {

    let cli = App::parse();

    init_logger(cli.log_file)?;

    let layout = match cli.install_dir {
        Some(dir) => InstallLayout::from_root(&dir)?,
        None => InstallLayout::from_executable(&std::env::current_exe()?)?,
    };
    log::debug!("Installation layout: {:?}", layout);

    let counts = cli.workflow.validate_and_build(&layout)?;
    let script = counts.configure()?;

    if cli.json.is_some() {
        ConfigureReport::create(&counts, &script, &cli.json)?;
    }

    println!(
        "\nSuccessfully created workflow run script.\nTo execute the workflow, run the following script and set appropriate options:\n\n{}\n",
        script.display()
    );

    Ok(())
}

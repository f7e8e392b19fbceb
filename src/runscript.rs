//! Materializes the validated configuration as `<runDir>/runWorkflow.py`.
//!
//! The script is self-contained: it embeds the workflow module location, the
//! workflow class, the primary section name and the resolved configuration
//! sections, so it can be executed later without the original command line.

use std::fs::create_dir_all;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::ConfigureError;
use crate::ini::IniSections;
use crate::workflow::WorkflowDescriptor;

pub const RUN_SCRIPT_NAME: &str = "runWorkflow.py";

/// Renders a value as a quoted string literal; JSON string syntax is valid Python.
fn py_str(value: &str) -> Result<String, ConfigureError> {
    Ok(serde_json::to_string(value)?)
}

/// The run script of one configuration invocation.
pub struct RunScript<'a> {
    pub path: PathBuf,
    pub descriptor: &'a WorkflowDescriptor,
    pub sections: &'a IniSections,
    pub command: Option<String>,
}

impl<'a> RunScript<'a> {
    /// Run script placed at the fixed location inside the run directory.
    pub fn in_run_dir(run_dir: &Path, descriptor: &'a WorkflowDescriptor, sections: &'a IniSections) -> Self {
        Self {
            path: run_dir.join(RUN_SCRIPT_NAME),
            descriptor,
            sections,
            command: None,
        }
    }

    /// Sets the configuration command recorded in the script header.
    pub fn command<T: Into<Option<String>>>(mut self, command: T) -> Self {
        self.command = command.into();
        self
    }

    /// Renders the script source. Identical inputs render identical bytes.
    pub fn render(&self) -> Result<String, ConfigureError> {
        let command = self.command.as_deref().unwrap_or("").replace(['\n', '\r'], " ");

        Ok(format!(
r#"#!/usr/bin/env python3
# -*- coding: utf-8 -*-
# Workflow run script auto-generated by command: '{command}'
#

import configparser
import json
import os
import sys

workflowModuleDir = {module_dir}
workflowEntryPoint = {entry_point}
workflowClassName = {class_name}
primarySectionName = {section}

configText = {config}

sys.path.append(workflowModuleDir)

from {module} import {class_ident}


def loadIniSections():
    """Parse the embedded configuration, every value is a JSON literal."""
    config = configparser.RawConfigParser(inline_comment_prefixes=None)
    config.optionxform = str
    config.read_string(configText)

    iniSections = dict()
    for section in config.sections():
        iniSections[section] = dict((key, json.loads(value)) for (key, value) in config.items(section))
    return iniSections


class WorkflowOptions(object):
    pass


def parseLimit(value, scale, flag):
    """Convert a --jobs/--memGb value to an integer, 'unlimited' passes through."""
    if value is None or value == "unlimited":
        return value
    try:
        return int(value) * scale
    except ValueError:
        sys.exit("Invalid value for %s: '%s', must be an integer or 'unlimited'" % (flag, value))


def get_run_options():
    from optparse import OptionParser

    parser = OptionParser(usage="%prog [options]", description="Run the " + workflowClassName + " workflow.")
    parser.add_option("-m", "--mode", type="string", dest="mode",
                      help="select run mode (local|sge)")
    parser.add_option("-j", "--jobs", type="string", dest="jobs",
                      help="number of jobs, must be an integer or 'unlimited' (default: Estimate total cores on this node for local mode, 128 for sge mode)")
    parser.add_option("-g", "--memGb", type="string", dest="memGb",
                      help="gigabytes of memory available to run workflow (default: Estimate the total memory for this node for local mode, 'unlimited' for sge mode)")
    parser.add_option("-q", "--quiet", dest="isQuiet", action="store_true", default=False,
                      help="Don't write any log output to stderr (but still write to workspace/pyflow.data/logs/pyflow_log.txt)")
    parser.add_option("-d", "--dryRun", dest="isDryRun", action="store_true", default=False,
                      help="dryRun workflow code without actually running command-tasks")

    (options, args) = parser.parse_args()

    if len(args):
        parser.print_help()
        sys.exit(2)

    if options.mode is None:
        parser.print_help()
        sys.exit(2)
    elif options.mode not in ["local", "sge"]:
        parser.error("Invalid mode. Available modes are: local, sge")

    return options


def main():
    runOptions = get_run_options()
    iniSections = loadIniSections()

    workflowOptions = WorkflowOptions()
    for (key, value) in iniSections[primarySectionName].items():
        setattr(workflowOptions, key, value)

    workflow = {class_ident}(workflowOptions, iniSections)

    retval = workflow.run(mode=runOptions.mode,
                          nCores=parseLimit(runOptions.jobs, 1, "--jobs"),
                          memMb=parseLimit(runOptions.memGb, 1024, "--memGb"),
                          dataDirRoot=os.path.join(workflowOptions.runDir, "workspace"),
                          isQuiet=runOptions.isQuiet,
                          isDryRun=runOptions.isDryRun)
    sys.exit(retval)


if __name__ == "__main__":
    main()
"#,
            command = command,
            module_dir = py_str(&self.descriptor.module_dir.to_string_lossy())?,
            entry_point = py_str(&self.descriptor.entry_point().to_string_lossy())?,
            class_name = py_str(&self.descriptor.class_name)?,
            section = py_str(&self.descriptor.primary_section)?,
            config = py_str(&self.sections.render())?,
            module = self.descriptor.module,
            class_ident = self.descriptor.class_name,
        ))
    }

    /// Creates the run directory if needed and writes the script, replacing any
    /// previous script at the same path.
    pub fn write(&self) -> Result<PathBuf, ConfigureError> {
        let run_dir = self.path.parent().unwrap_or(Path::new("."));
        create_dir_all(run_dir).map_err(|e| ConfigureError::RunDir(run_dir.to_path_buf(), e))?;

        let source = self.render()?;

        let mut file = NamedTempFile::new_in(run_dir)?;
        file.write_all(source.as_bytes())?;
        file.flush()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file().set_permissions(std::fs::Permissions::from_mode(0o755))?;
        }

        file.persist(&self.path)?;

        log::info!("Wrote workflow run script: {}", self.path.display());

        Ok(self.path.clone())
    }
}

/// Extracts the embedded configuration text from a rendered run script.
pub fn embedded_config(script: &str) -> Option<String> {
    let line = script.lines().find(|line| line.starts_with("configText = "))?;
    serde_json::from_str(line.trim_start_matches("configText = ")).ok()
}

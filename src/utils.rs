use env_logger::Builder;
use log::LevelFilter;
use std::{fs::OpenOptions, io::Write, path::{Path, PathBuf}};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::error::ConfigureError;


/// Appends the platform executable suffix to a binary name.
///
/// # Example
///
/// ```
/// use seqerr_configure::utils::exe_file;
///
/// let name = exe_file("GetSequenceErrorCounts");
/// assert!(name.starts_with("GetSequenceErrorCounts"));
/// ```
pub fn exe_file(name: &str) -> String {
    format!("{}{}", name, std::env::consts::EXE_SUFFIX)
}

/// Rewrites a path to absolute form relative to the current working directory.
///
/// The path does not need to exist.
pub fn absolute_path(path: &Path) -> Result<PathBuf, ConfigureError> {
    Ok(std::path::absolute(path)?)
}

/// Absolutizes a path and checks that it names an existing regular file.
///
/// # Arguments
///
/// * `path` - The user supplied path.
/// * `label` - Human readable description used in the error message.
pub fn validate_existing_file(path: &Path, label: &str) -> Result<PathBuf, ConfigureError> {
    let path = absolute_path(path)?;
    if !path.is_file() {
        return Err(ConfigureError::MissingFile(label.to_string(), path))
    }
    Ok(path)
}

/// Builds the sibling path formed by appending `suffix` to the full file name,
/// e.g. `ploidy.bed.gz` + `.tbi` -> `ploidy.bed.gz.tbi`.
pub fn with_appended_extension(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Checks whether the path is a regular file the current user may execute.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}


pub fn init_logger(log_file: Option<PathBuf>) -> Result<(), ConfigureError> {
    let mut builder = Builder::new();
    let plain = log_file.is_some();

    builder.format(move |buf, record| {
        let timestamp = buf.timestamp();

        if plain {
            return writeln!(buf, "{} [{}] - {}", timestamp, record.level(), record.args());
        }

        // Logs go to stderr so the confirmation note on stdout stays clean
        let mut stream = StandardStream::stderr(ColorChoice::Auto);

        let mut style = ColorSpec::new();
        match record.level() {
            log::Level::Trace => style.set_fg(Some(Color::White)).set_bold(true),
            log::Level::Debug => style.set_fg(Some(Color::Rgb(255, 195, 0))).set_bold(true),
            log::Level::Info => style.set_fg(Some(Color::Green)).set_bold(true),
            log::Level::Warn => style.set_fg(Some(Color::Rgb(255, 102, 0))).set_bold(true),
            log::Level::Error => style.set_fg(Some(Color::Red)).set_bold(true),
        };

        let mut default_style = ColorSpec::new();
        default_style.set_fg(Some(Color::White));

        stream.set_color(&default_style)?;
        write!(&mut stream, "{} [", timestamp)?;

        stream.set_color(&style)?;
        write!(&mut stream, "{}", record.level())?;

        stream.set_color(&default_style)?;
        writeln!(&mut stream, "] - {}", record.args())?;

        stream.reset()
    });

    builder.filter(None, LevelFilter::Info);
    builder.parse_default_env();

    if let Some(log_path) = log_file {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(log_path)?;

        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appended_extension_keeps_full_name() {
        let index = with_appended_extension(Path::new("/data/ploidy.bed.gz"), ".tbi");
        assert_eq!(index, PathBuf::from("/data/ploidy.bed.gz.tbi"));
    }

    #[test]
    fn absolute_path_is_absolute() {
        let path = absolute_path(Path::new("some/relative/file.bam")).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("some/relative/file.bam"));
    }

    #[test]
    fn missing_file_names_label() {
        let err = validate_existing_file(Path::new("does/not/exist.bam"), "Input BAM/CRAM").unwrap_err();
        assert!(err.to_string().contains("Input BAM/CRAM"));
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_is_checked() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("tool");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        assert!(!is_executable(&bin));

        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(is_executable(&bin));
        assert!(!is_executable(dir.path()));
    }
}

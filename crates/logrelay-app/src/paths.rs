//! Locating the log file to tail
//!
//! Resolution order, first hit wins:
//! 1. An explicit path from the command line
//! 2. The value of `-logFile` in the external command's arguments
//! 3. `[log] path` from the config file
//! 4. The platform's default Editor.log location

use std::path::{Path, PathBuf};

use logrelay_core::prelude::*;

/// Argument the external program uses to redirect its log
pub const LOG_FILE_ARG: &str = "-logFile";

/// Where the editor writes its log when not told otherwise
pub fn default_editor_log_path() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir().map(|dir| dir.join("Unity").join("Editor").join("Editor.log"))
    } else if cfg!(target_os = "macos") {
        dirs::home_dir().map(|home| {
            home.join("Library")
                .join("Logs")
                .join("Unity")
                .join("Editor.log")
        })
    } else {
        dirs::home_dir().map(|home| home.join(".config").join("unity3d").join("Editor.log"))
    }
}

/// Value following the last `-logFile` in `args`.
///
/// A trailing `-logFile` with no value, or a value of `-` (log to stdout),
/// yields `None`.
pub fn find_log_file_arg<S: AsRef<str>>(args: &[S]) -> Option<PathBuf> {
    let pos = args.iter().rposition(|arg| arg.as_ref() == LOG_FILE_ARG)?;
    let value = args.get(pos + 1)?.as_ref();
    if value.is_empty() || value == "-" {
        return None;
    }
    Some(PathBuf::from(value))
}

/// Pick the log path to tail; relative paths are taken from `cwd`
pub fn resolve_log_path<S: AsRef<str>>(
    explicit: Option<&Path>,
    command_args: &[S],
    configured: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf> {
    let (path, source) = if let Some(path) = explicit {
        (path.to_path_buf(), "command line")
    } else if let Some(path) = find_log_file_arg(command_args) {
        (path, LOG_FILE_ARG)
    } else if let Some(path) = configured {
        (path.to_path_buf(), "config")
    } else {
        (
            default_editor_log_path().ok_or(Error::LogPathUnavailable)?,
            "platform default",
        )
    };

    let path = if path.is_relative() {
        cwd.join(path)
    } else {
        path
    };
    debug!("Log path {} (from {})", path.display(), source);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_log_file_arg_takes_last_occurrence() {
        let command = args(&[
            "-batchmode",
            "-logFile",
            "first.log",
            "-projectPath",
            "/proj",
            "-logFile",
            "second.log",
        ]);
        assert_eq!(find_log_file_arg(&command), Some(PathBuf::from("second.log")));
    }

    #[test]
    fn test_find_log_file_arg_without_value() {
        assert_eq!(find_log_file_arg(&args(&["-batchmode", "-logFile"])), None);
        assert_eq!(find_log_file_arg(&args(&["-logFile", "-"])), None);
        assert_eq!(find_log_file_arg::<String>(&[]), None);
    }

    #[test]
    fn test_find_log_file_arg_is_case_sensitive() {
        assert_eq!(find_log_file_arg(&args(&["-logfile", "x.log"])), None);
    }

    #[test]
    fn test_default_path_ends_with_editor_log() {
        if let Some(path) = default_editor_log_path() {
            assert!(path.ends_with("Editor.log"));
        }
    }

    #[test]
    fn test_resolution_order() {
        let cwd = Path::new("/work");
        let command = args(&["-logFile", "from-arg.log"]);
        let configured = Path::new("/etc/from-config.log");

        let explicit = resolve_log_path(
            Some(Path::new("/tmp/explicit.log")),
            &command,
            Some(configured),
            cwd,
        )
        .unwrap();
        assert_eq!(explicit, PathBuf::from("/tmp/explicit.log"));

        let from_arg = resolve_log_path(None, &command, Some(configured), cwd).unwrap();
        assert_eq!(from_arg, PathBuf::from("/work/from-arg.log"));

        let from_config =
            resolve_log_path::<String>(None, &[], Some(configured), cwd).unwrap();
        assert_eq!(from_config, PathBuf::from("/etc/from-config.log"));
    }

    #[test]
    fn test_resolution_falls_back_to_platform_default() {
        let resolved = resolve_log_path::<String>(None, &[], None, Path::new("/work"));
        match default_editor_log_path() {
            Some(default) => assert_eq!(resolved.unwrap(), default),
            None => assert!(matches!(resolved, Err(Error::LogPathUnavailable))),
        }
    }
}

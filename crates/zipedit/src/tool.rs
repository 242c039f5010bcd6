//! Driver for the external 7-Zip command line tool.
//!
//! Two invocations are used: extract-one (`x`) and add/overwrite (`a`). Each
//! runs to completion and is reduced to a single result; per-file status lines
//! from the tool's output are parsed into a side report and logged.

use crate::error::{FileStatus, ToolError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Environment variable naming the tool binary.
pub const TOOL_ENV: &str = "ZIPEDIT_7Z";

/// Binary names searched on `PATH`, in order of preference.
const CANDIDATES: &[&str] = &["7za", "7zz", "7z"];

/// Files the tool reported on during an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub extracted: Vec<String>,
    pub file_errors: Vec<FileStatus>,
}

/// A resolved 7-Zip executable.
#[derive(Debug, Clone)]
pub struct SevenZip {
    binary: PathBuf,
}

impl SevenZip {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Resolve the binary: explicit configuration, then `ZIPEDIT_7Z`, then
    /// `PATH`.
    pub fn locate(configured: Option<&Path>) -> Option<Self> {
        if let Some(path) = configured {
            return Some(Self::new(path));
        }
        if let Some(path) = std::env::var_os(TOOL_ENV).filter(|v| !v.is_empty()) {
            return Some(Self::new(path));
        }
        find_candidate(std::env::var_os("PATH")).map(Self::new)
    }

    /// Arguments for extracting the single entry `entry` into `out_dir`.
    pub fn extract_args(
        archive: &Path,
        out_dir: &Path,
        entry: &str,
        password: Option<&str>,
    ) -> Vec<OsString> {
        let mut output_switch = OsString::from("-o");
        output_switch.push(out_dir);

        let mut args: Vec<OsString> = vec![
            "x".into(),
            archive.into(),
            output_switch,
            "-y".into(),
            "-scsUTF-8".into(),
            "-bb1".into(),
        ];
        if let Some(switch) = password_switch(password) {
            args.push(switch.into());
        }
        args.push(entry.into());
        args
    }

    /// Arguments for adding `relative` (resolved against the working
    /// directory) to `archive`, overwriting the entry of the same path.
    pub fn add_args(archive: &Path, relative: &str, password: Option<&str>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "a".into(),
            "-scsUTF-8".into(),
            archive.into(),
            relative.into(),
        ];
        if let Some(switch) = password_switch(password) {
            args.push(switch.into());
        }
        args.push("-y".into());
        args
    }

    /// Extract one entry. Succeeds when the tool exits with status 0; the
    /// report carries any per-file errors it printed along the way.
    pub async fn extract_one(
        &self,
        archive: &Path,
        out_dir: &Path,
        entry: &str,
        password: Option<&str>,
    ) -> Result<ExtractReport, ToolError> {
        let args = Self::extract_args(archive, out_dir, entry, password);
        let output = self.run(&args, None).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let report = parse_report(&stdout, &stderr);

        for file in &report.extracted {
            debug!(file = %file, "Tool extracted file");
        }
        for status in &report.file_errors {
            debug!(file = %status.file, message = %status.message, "Tool reported file error");
        }

        if !output.status.success() {
            return Err(ToolError::Exit {
                code: output.status.code(),
                detail: summarize(&stderr),
            });
        }

        Ok(report)
    }

    /// Add `relative` from `cwd` into `archive`.
    pub async fn add(
        &self,
        archive: &Path,
        cwd: &Path,
        relative: &str,
        password: Option<&str>,
    ) -> Result<(), ToolError> {
        let args = Self::add_args(archive, relative, password);
        let output = self.run(&args, Some(cwd)).await?;

        if !output.status.success() {
            return Err(ToolError::Exit {
                code: output.status.code(),
                detail: summarize(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        Ok(())
    }

    async fn run(&self, args: &[OsString], cwd: Option<&Path>) -> Result<Output, ToolError> {
        debug!(
            binary = %self.binary.display(),
            args = ?redact(args),
            cwd = ?cwd,
            "Running archiving tool"
        );

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        command.output().await.map_err(ToolError::Spawn)
    }
}

/// `-p<password>`, or nothing for an absent or empty password: a bare `-p`
/// makes 7-Zip prompt on stdin.
fn password_switch(password: Option<&str>) -> Option<String> {
    password
        .filter(|p| !p.is_empty())
        .map(|p| format!("-p{}", p))
}

/// Arguments with any password replaced, for logging.
pub fn redact(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|a| {
            let a = a.to_string_lossy();
            if a.starts_with("-p") && a.len() > 2 {
                "-p***".to_string()
            } else {
                a.into_owned()
            }
        })
        .collect()
}

/// Parse `- <file>` progress lines and `ERROR: <message> : <file>` lines.
pub fn parse_report(stdout: &str, stderr: &str) -> ExtractReport {
    let mut report = ExtractReport::default();

    for line in stdout.lines().chain(stderr.lines()) {
        let line = line.trim();

        if let Some(file) = line.strip_prefix("- ") {
            report.extracted.push(file.to_string());
        } else if let Some(rest) = line.strip_prefix("ERROR:") {
            let rest = rest.trim();
            let status = match rest.rsplit_once(" : ") {
                Some((message, file)) => FileStatus {
                    file: file.trim().to_string(),
                    message: message.trim().to_string(),
                },
                None => FileStatus {
                    file: String::new(),
                    message: rest.to_string(),
                },
            };
            report.file_errors.push(status);
        }
    }

    report
}

/// First few non-empty lines of the tool's error stream.
fn summarize(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join("; ")
}

/// First of [`CANDIDATES`] that resolves to an executable on `paths`.
fn find_candidate(paths: Option<OsString>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    CANDIDATES
        .iter()
        .find_map(|name| which::which_in(name, paths.as_ref(), &cwd).ok())
}

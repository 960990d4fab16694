//! Tab-separated manifest of `name\tURL` lines.
//!
//! The first line is a header and is skipped. Each remaining non-blank line
//! becomes one [`TaskItem`]. Malformed lines fail the whole parse with the
//! 1-based line number so a bad manifest is caught before any download starts.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// One file to download: output name under the save directory and its source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    name: String,
    url: String,
}

impl TaskItem {
    /// Builds an item after validating the name and URL (same rules as the parser).
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self, ManifestError> {
        let name = name.into();
        let url = url.into();
        check_name(&name, 0)?;
        check_url(&url, 0)?;
        Ok(Self { name, url })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for TaskItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Parse-time failure; `line` is 1-based (0 when not read from a file).
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("line {line}: expected `name<TAB>url`")]
    MissingTab { line: usize },
    #[error("line {line}: empty name")]
    EmptyName { line: usize },
    #[error("line {line}: empty url")]
    EmptyUrl { line: usize },
    #[error("line {line}: unsafe output name {name:?}")]
    UnsafeName { line: usize, name: String },
    #[error("line {line}: invalid url {url:?}: {reason}")]
    InvalidUrl {
        line: usize,
        url: String,
        reason: String,
    },
    #[error("reading manifest: {0}")]
    Io(#[from] std::io::Error),
}

/// How to interpret the manifest file.
#[derive(Debug, Clone, Copy)]
pub struct ManifestOptions {
    /// Skip the first line. False for header-less files such as the failure log.
    pub has_header: bool,
    /// Return items last-line-first (matches the order the batch has always been dispatched in).
    pub reverse: bool,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            reverse: true,
        }
    }
}

/// Reads and parses a manifest file.
pub fn read_manifest(path: &Path, opts: ManifestOptions) -> Result<Vec<TaskItem>, ManifestError> {
    let file = File::open(path)?;
    parse_manifest(file, opts)
}

/// Parses manifest text from any reader.
pub fn parse_manifest<R: Read>(reader: R, opts: ManifestOptions) -> Result<Vec<TaskItem>, ManifestError> {
    let mut items = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if opts.has_header && idx == 0 {
            continue;
        }
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        items.push(parse_line(line, line_no)?);
    }
    if opts.reverse {
        items.reverse();
    }
    Ok(items)
}

fn parse_line(line: &str, line_no: usize) -> Result<TaskItem, ManifestError> {
    let mut cols = line.split('\t');
    let name = cols.next().unwrap_or("").trim();
    let url = cols
        .next()
        .ok_or(ManifestError::MissingTab { line: line_no })?
        .trim();
    check_name(name, line_no)?;
    check_url(url, line_no)?;
    Ok(TaskItem {
        name: name.to_string(),
        url: url.to_string(),
    })
}

/// Rejects names that are empty or would resolve outside the save directory.
fn check_name(name: &str, line: usize) -> Result<(), ManifestError> {
    if name.is_empty() {
        return Err(ManifestError::EmptyName { line });
    }
    let unsafe_name = name == "."
        || name == ".."
        || name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control());
    if unsafe_name {
        return Err(ManifestError::UnsafeName {
            line,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn check_url(raw: &str, line: usize) -> Result<(), ManifestError> {
    if raw.is_empty() {
        return Err(ManifestError::EmptyUrl { line });
    }
    let invalid = |reason: String| ManifestError::InvalidUrl {
        line,
        url: raw.to_string(),
        reason,
    };
    let parsed = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}

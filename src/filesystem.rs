use crate::core::error::{Result, ScribeError};
use crate::core::runner::{ExecutionRequest, ToolRunner};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeEntry {
    pub path: PathBuf,
    /// Byte count, or the reason it could not be determined.
    pub size: std::result::Result<u64, String>,
}

impl SizeEntry {
    pub fn sized(path: impl Into<PathBuf>, bytes: u64) -> Self {
        Self {
            path: path.into(),
            size: Ok(bytes),
        }
    }
}

pub fn du_request(dir: &Path, depth: usize) -> ExecutionRequest {
    ExecutionRequest::new("du")
        .arg("--bytes")
        .arg("--max-depth")
        .arg(depth.to_string())
        .arg(dir)
}

/// Parses `du --bytes` output (`<size>\t<path>` per line).
pub fn parse_du_output(output: &str) -> Result<Vec<SizeEntry>> {
    let mut entries = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let (size, path) = line
            .split_once('\t')
            .ok_or_else(|| ScribeError::unexpected("du", format!("missing tab in {:?}", line)))?;
        let bytes = size
            .trim()
            .parse::<u64>()
            .map_err(|_| ScribeError::unexpected("du", format!("bad size in {:?}", line)))?;
        entries.push(SizeEntry::sized(path, bytes));
    }
    Ok(entries)
}

pub fn parse_stat_size(output: &str) -> Result<u64> {
    output
        .trim()
        .parse::<u64>()
        .map_err(|_| ScribeError::unexpected("stat", format!("bad size {:?}", output.trim())))
}

/// Sizes of `dir` and its subdirectories up to `depth`, optionally followed by
/// the individual files found at levels `0..=depth`.
///
/// A file that cannot be stat'ed becomes an entry carrying the error message.
pub fn directory_sizes<R: ToolRunner>(
    runner: &R,
    dir: &Path,
    depth: usize,
    include_files: bool,
) -> Result<Vec<SizeEntry>> {
    let mut entries = parse_du_output(&runner.output(&du_request(dir, depth))?)?;

    if include_files {
        let mut files = Vec::new();
        collect_files(dir, 0, depth, &mut files);
        for file in files {
            let request = ExecutionRequest::new("stat").arg("-c").arg("%s").arg(&file);
            let size = runner
                .output(&request)
                .and_then(|out| parse_stat_size(&out))
                .map_err(|e| {
                    warn!(path = %file.display(), error = %e, "could not size file");
                    e.to_string()
                });
            entries.push(SizeEntry { path: file, size });
        }
    }

    Ok(entries)
}

fn collect_files(dir: &Path, level: usize, depth: usize, out: &mut Vec<PathBuf>) {
    let mut paths: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };
    paths.sort();

    for path in paths {
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_file() => out.push(path),
            Ok(meta) if meta.is_dir() && level < depth => collect_files(&path, level + 1, depth, out),
            _ => {}
        }
    }
}

//! Embedded / appended data detection
//!
//! A file is flagged when it is itself an archive container, or when binwalk
//! reports more signature hits than a single host file plausibly carries.

use crate::core::error::Result;
use crate::core::runner::{ExecutionRequest, ExecutionResult, ToolRunner};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SCANNER: &str = "binwalk";
pub const SIGNATURE_PROBE_LEN: u64 = 8;
pub const DEFAULT_HIT_THRESHOLD: usize = 2;
pub const DEFAULT_EXCLUDED_KEYWORDS: [&str; 2] = ["tif", "tiff"];

pub const ARCHIVE_SIGNATURES: &[(&[u8], &str)] = &[
    (b"PK", "ZIP archive"),
    (b"Rar!", "RAR archive"),
    (&[0x1F, 0x8B], "GZIP archive"),
    (b"BZh", "BZIP2 archive"),
    (&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C], "7z archive"),
    (b"ustar", "TAR archive"),
    (b"POSIX", "TAR archive"),
];

/// Tunables of the statistical stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicPolicy {
    /// A file is a candidate when it has strictly more hits than this.
    pub hit_threshold: usize,
    /// Lowercase substrings that disqualify a report line.
    pub excluded_keywords: Vec<String>,
}

impl Default for HeuristicPolicy {
    fn default() -> Self {
        Self {
            hit_threshold: DEFAULT_HIT_THRESHOLD,
            excluded_keywords: DEFAULT_EXCLUDED_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

pub fn archive_signature(header: &[u8]) -> Option<&'static str> {
    ARCHIVE_SIGNATURES
        .iter()
        .find(|(magic, _)| header.starts_with(magic))
        .map(|(_, name)| *name)
}

/// Counts report lines that look like a located signature: non-blank, first
/// token is a decimal offset, and no excluded keyword anywhere on the line.
pub fn count_signature_hits(report: &str, policy: &HeuristicPolicy) -> usize {
    report
        .lines()
        .filter(|line| is_signature_line(line, policy))
        .count()
}

fn is_signature_line(line: &str, policy: &HeuristicPolicy) -> bool {
    let lowered = line.to_lowercase();
    if policy
        .excluded_keywords
        .iter()
        .any(|k| lowered.contains(k.as_str()))
    {
        return false;
    }

    match line.split_whitespace().next() {
        Some(first) => first.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn read_header(path: &Path) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(SIGNATURE_PROBE_LEN as usize);
    File::open(path)?
        .take(SIGNATURE_PROBE_LEN)
        .read_to_end(&mut header)?;
    Ok(header)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions<'a> {
    pub output_dir: Option<&'a Path>,
    /// Recursion depth for matryoshka extraction; 0 leaves binwalk's default.
    pub depth: u32,
    pub quiet: bool,
}

pub fn extraction_request(file: &Path, options: &ExtractOptions<'_>) -> ExecutionRequest {
    let mut request = ExecutionRequest::new(SCANNER)
        .arg("--extract")
        .arg("-M")
        .arg(file);
    if options.depth > 0 {
        request = request.arg("--depth").arg(options.depth.to_string());
    }
    if let Some(dir) = options.output_dir {
        request = request.arg("--directory").arg(dir);
    }
    if options.quiet {
        request = request.arg("--quiet");
    }
    request
}

/// Result of walking a directory for candidates.
#[derive(Debug, Default)]
pub struct SearchReport {
    pub scanned: usize,
    pub candidates: Vec<PathBuf>,
    /// Entries that could not be visited, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

pub struct EmbeddedScanner<R: ToolRunner> {
    runner: R,
    policy: HeuristicPolicy,
}

impl<R: ToolRunner> EmbeddedScanner<R> {
    pub fn new(runner: R) -> Self {
        Self::with_policy(runner, HeuristicPolicy::default())
    }

    pub fn with_policy(runner: R, policy: HeuristicPolicy) -> Self {
        Self { runner, policy }
    }

    pub fn policy(&self) -> &HeuristicPolicy {
        &self.policy
    }

    /// Raw binwalk signature report for `path`.
    pub fn report(&self, path: &Path) -> Result<String> {
        self.runner
            .output(&ExecutionRequest::new(SCANNER).arg(path))
    }

    /// Two-stage decision. Never fails: a scanner error is logged and the
    /// file is treated as not embedded so a directory walk can continue.
    pub fn is_embedded_candidate(&self, path: &Path) -> bool {
        match read_header(path) {
            Ok(header) => {
                if let Some(kind) = archive_signature(&header) {
                    debug!(path = %path.display(), kind, "archive signature");
                    return true;
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read file header");
            }
        }

        match self.report(path) {
            Ok(report) => {
                let hits = count_signature_hits(&report, &self.policy);
                debug!(path = %path.display(), hits, "signature hits");
                hits > self.policy.hit_threshold
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "error analyzing file");
                false
            }
        }
    }

    /// Walks `dir` sequentially, descending at most `max_depth` levels below
    /// it, and collects every embedded candidate.
    pub fn search(&self, dir: &Path, max_depth: usize) -> SearchReport {
        let mut report = SearchReport::default();
        self.search_level(dir, 0, max_depth, &mut report);
        info!(
            root = %dir.display(),
            scanned = report.scanned,
            candidates = report.candidates.len(),
            "embedded search complete"
        );
        report
    }

    fn search_level(&self, dir: &Path, level: usize, max_depth: usize, report: &mut SearchReport) {
        let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                report.skipped.push((dir.to_path_buf(), e.to_string()));
                return;
            }
        };
        entries.sort();

        let mut subdirs = Vec::new();
        for path in entries {
            match fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => subdirs.push(path),
                Ok(meta) if meta.is_file() => self.scan_file(path, report),
                // Links to files are scanned; linked directories are never entered.
                Ok(meta) if meta.file_type().is_symlink() => match fs::metadata(&path) {
                    Ok(target) if target.is_file() => self.scan_file(path, report),
                    Ok(_) => debug!(path = %path.display(), "not following symlink"),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping dangling symlink");
                        report.skipped.push((path, e.to_string()));
                    }
                },
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping entry");
                    report.skipped.push((path, e.to_string()));
                }
            }
        }

        if level < max_depth {
            for subdir in subdirs {
                self.search_level(&subdir, level + 1, max_depth, report);
            }
        }
    }

    fn scan_file(&self, path: PathBuf, report: &mut SearchReport) {
        report.scanned += 1;
        if self.is_embedded_candidate(&path) {
            report.candidates.push(path);
        }
    }

    /// Carves embedded files out of `file` with binwalk's recursive extractor.
    pub fn extract(&self, file: &Path, options: &ExtractOptions<'_>) -> Result<ExecutionResult> {
        let request = extraction_request(file, options);
        info!(command = %request, "extracting embedded files");
        self.runner.execute(&request)
    }
}

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// External programs the commands shell out to.
pub const EXTERNAL_TOOLS: &[&str] = &[
    "exiftool", "ffmpeg", "binwalk", "fdisk", "parted", "file", "disktype", "ewfinfo",
    "ewfexport", "losetup", "mount", "umount", "du", "find", "stat",
];

pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let search_path = env::var_os("PATH")?;
    find_in(program, &search_path)
}

pub fn find_in(program: &str, search_path: &OsStr) -> Option<PathBuf> {
    env::split_paths(search_path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

/// Tools from `tools` that cannot be found on `PATH`, in input order.
pub fn missing_tools(tools: &[&str]) -> Vec<String> {
    let search_path = env::var_os("PATH").unwrap_or_default();
    missing_tools_in(tools, &search_path)
}

pub fn missing_tools_in(tools: &[&str], search_path: &OsStr) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| find_in(tool, search_path).is_none())
        .map(|tool| tool.to_string())
        .collect()
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

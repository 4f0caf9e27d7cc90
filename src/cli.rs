use clap::{Parser, Subcommand};
use datascribe::metadata::{ExportFormat, MetadataKind};
use datascribe::parse_size;
use std::path::PathBuf;

/// Datascribe - forensic triage front-end
///
/// Drives exiftool, binwalk, parted, losetup and du, and reformats their
/// output for an operator.
#[derive(Parser)]
#[command(name = "datascribe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Forensic triage front-end for external analysis tools", long_about = None)]
pub struct Cli {
    /// Use this working directory for this invocation only
    #[arg(long, global = true, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Persist a new working directory
    #[arg(long, value_name = "DIR")]
    pub set_workdir: Option<PathBuf>,

    /// Print the working directory in effect
    #[arg(long)]
    pub show_workdir: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Directory, disk image and tooling commands
    #[command(subcommand)]
    Filesystem(FilesystemCommand),

    /// exiftool metadata commands
    #[command(subcommand)]
    Metadata(MetadataCommand),

    /// Embedded data detection and carving
    #[command(subcommand)]
    Multimedia(MultimediaCommand),
}

#[derive(Subcommand)]
pub enum FilesystemCommand {
    /// Size of a directory and its subdirectories
    DirectorySize {
        dir: PathBuf,

        /// Levels below DIR to report
        #[arg(long, default_value = "0")]
        depth: usize,

        /// Also list individual files
        #[arg(long)]
        include_files: bool,

        /// Hide entries smaller than this (e.g. 10MB, 1,5gb)
        #[arg(long, value_parser = parse_size_arg)]
        min_size: Option<u64>,
    },

    /// Mount a disk image read-only through a loop device
    MountImage {
        image: PathBuf,

        mount_point: PathBuf,

        /// 1-based partition to mount instead of asking
        #[arg(short, long)]
        partition: Option<usize>,
    },

    /// Unmount a mounted image and remove its mount point
    UnmountImage {
        mount_point: PathBuf,

        /// Loop device to detach afterwards (e.g. /dev/loop0)
        #[arg(long)]
        loop_device: Option<String>,
    },

    /// List external tools missing from PATH
    Tools,
}

#[derive(Subcommand)]
pub enum MetadataCommand {
    /// Extract metadata and export it to a file
    Extract {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "all")]
        kind: MetadataKind,

        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Directory for the export (defaults to the working directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Print GPS coordinates of a file
    Gps { file: PathBuf },
}

#[derive(Subcommand)]
pub enum MultimediaCommand {
    /// List files that likely carry embedded or appended data
    SearchEmbedded {
        dir: PathBuf,

        /// Levels below DIR to descend into
        #[arg(long, default_value = "0")]
        depth: usize,
    },

    /// Carve embedded files out of FILE with binwalk
    ExtractEmbedded {
        file: PathBuf,

        #[arg(long, default_value = "extraction_output")]
        output_dir: PathBuf,

        /// Matryoshka extraction depth (0 = binwalk default)
        #[arg(long, default_value = "0")]
        depth: u32,

        /// Suppress binwalk's own output
        #[arg(long)]
        quiet: bool,
    },

    /// Print binwalk's signature report for FILE
    EmbeddedContent { file: PathBuf },
}

fn parse_size_arg(text: &str) -> Result<u64, String> {
    parse_size(text).map_err(|e| e.to_string())
}

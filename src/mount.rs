//! Read-only disk image mounting
//!
//! `Unmounted -> LoopAttached -> PartitionsEnumerated -> Mounted -> Unmounted`
//!
//! The image is bound to a loop device with partition probing, the partition
//! table is read with parted, one partition (or the whole device when there is
//! no table) is mounted `ro,noexec`. Any failure after the loop device exists
//! detaches it again before the error is returned.

use crate::core::error::{Result, ScribeError};
use crate::core::runner::{ExecutionRequest, ToolRunner};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MOUNT_OPTIONS: &str = "ro,noexec";

/// A numbered partition of a loop device, e.g. `/dev/loop0p2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescriptor {
    pub device: String,
    pub number: u32,
    /// Remaining columns of the partition table row (start, end, size, fs...).
    pub summary: String,
}

impl PartitionDescriptor {
    pub fn new(loop_device: &str, number: u32, summary: impl Into<String>) -> Self {
        Self {
            device: format!("{}p{}", loop_device, number),
            number,
            summary: summary.into(),
        }
    }
}

impl fmt::Display for PartitionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.summary.is_empty() {
            write!(f, "{}", self.device)
        } else {
            write!(f, "{} ({})", self.device, self.summary)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSession {
    pub image: PathBuf,
    pub loop_device: String,
    /// Device node that was mounted: a partition or the whole loop device.
    pub device: String,
    pub partition: Option<u32>,
    pub mount_point: PathBuf,
}

/// Picks which partition to mount. Returns a 1-based index into the list.
pub trait PartitionChooser {
    fn choose(&self, partitions: &[PartitionDescriptor]) -> Result<usize>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FirstPartition;

impl PartitionChooser for FirstPartition {
    fn choose(&self, _partitions: &[PartitionDescriptor]) -> Result<usize> {
        Ok(1)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedPartition(pub usize);

impl PartitionChooser for FixedPartition {
    fn choose(&self, _partitions: &[PartitionDescriptor]) -> Result<usize> {
        Ok(self.0)
    }
}

impl<F> PartitionChooser for F
where
    F: Fn(&[PartitionDescriptor]) -> Result<usize>,
{
    fn choose(&self, partitions: &[PartitionDescriptor]) -> Result<usize> {
        self(partitions)
    }
}

pub fn select<'a>(
    partitions: &'a [PartitionDescriptor],
    chooser: &dyn PartitionChooser,
) -> Result<&'a PartitionDescriptor> {
    let choice = chooser.choose(partitions)?;
    if choice == 0 || choice > partitions.len() {
        return Err(ScribeError::InvalidSelection {
            choice,
            count: partitions.len(),
        });
    }
    Ok(&partitions[choice - 1])
}

/// Parses `parted -s <dev> print`. Every row starting with a partition number
/// yields `<loop-device>p<number>`.
///
/// A `Partition Table: loop` report describes a bare filesystem: parted lists
/// it as partition 1 but no `p1` node exists, so it yields no partitions.
pub fn parse_partition_table(loop_device: &str, report: &str) -> Result<Vec<PartitionDescriptor>> {
    if is_bare_filesystem(report) {
        return Ok(Vec::new());
    }

    let mut partitions = Vec::new();
    for line in report.lines() {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        if !first.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let number = first.parse::<u32>().map_err(|_| {
            ScribeError::unexpected("parted", format!("bad partition number in {:?}", line))
        })?;
        let summary = tokens.collect::<Vec<_>>().join(" ");
        partitions.push(PartitionDescriptor::new(loop_device, number, summary));
    }
    Ok(partitions)
}

fn is_bare_filesystem(report: &str) -> bool {
    report.lines().any(|line| {
        line.trim()
            .strip_prefix("Partition Table:")
            .is_some_and(|label| label.trim() == "loop")
    })
}

/// Creates `target` when missing and insists that it is an empty directory.
pub fn prepare_mount_point(target: &Path) -> Result<()> {
    if !target.exists() {
        fs::create_dir_all(target)?;
    }
    if !target.is_dir() {
        return Err(ScribeError::WrongPathType {
            path: target.to_path_buf(),
            expected: "directory",
        });
    }
    if fs::read_dir(target)?.next().is_some() {
        return Err(ScribeError::MountPointNotEmpty(target.to_path_buf()));
    }
    Ok(())
}

pub struct MountOrchestrator<R: ToolRunner> {
    runner: R,
}

impl<R: ToolRunner> MountOrchestrator<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn mount_image(
        &self,
        image: &Path,
        target: &Path,
        chooser: &dyn PartitionChooser,
    ) -> Result<MountSession> {
        prepare_mount_point(target)?;
        let loop_device = self.attach(image)?;

        match self.mount_attached(image, &loop_device, target, chooser) {
            Ok(session) => Ok(session),
            Err(e) => {
                if let Err(detach_err) = self.detach(&loop_device) {
                    warn!(
                        loop_device = %loop_device,
                        error = %detach_err,
                        "could not detach loop device after failed mount"
                    );
                }
                Err(e)
            }
        }
    }

    fn mount_attached(
        &self,
        image: &Path,
        loop_device: &str,
        target: &Path,
        chooser: &dyn PartitionChooser,
    ) -> Result<MountSession> {
        let partitions = self.enumerate(loop_device).unwrap_or_else(|e| {
            warn!(loop_device, error = %e, "partition enumeration failed");
            Vec::new()
        });

        let (device, partition) = if partitions.is_empty() {
            info!(loop_device, "no partitions found, mounting whole device");
            (loop_device.to_string(), None)
        } else {
            let selected = select(&partitions, chooser)?;
            (selected.device.clone(), Some(selected.number))
        };

        self.mount_device(&device, target)?;

        Ok(MountSession {
            image: image.to_path_buf(),
            loop_device: loop_device.to_string(),
            device,
            partition,
            mount_point: target.to_path_buf(),
        })
    }

    /// `losetup -fP --show <image>`; returns the allocated loop device.
    pub fn attach(&self, image: &Path) -> Result<String> {
        let request = ExecutionRequest::new("losetup")
            .arg("-fP")
            .arg("--show")
            .arg(image);
        let loop_device = self.runner.output(&request).map_err(|e| match e {
            ScribeError::ExternalToolFailure { stderr, .. } => ScribeError::LoopSetupFailure {
                image: image.to_path_buf(),
                message: stderr,
            },
            other => other,
        })?;

        if !loop_device.starts_with("/dev/") {
            return Err(ScribeError::LoopSetupFailure {
                image: image.to_path_buf(),
                message: format!("losetup reported no device: {:?}", loop_device),
            });
        }

        info!(image = %image.display(), loop_device = %loop_device, "loop device attached");
        Ok(loop_device)
    }

    pub fn enumerate(&self, loop_device: &str) -> Result<Vec<PartitionDescriptor>> {
        let request = ExecutionRequest::new("parted")
            .arg("-s")
            .arg(loop_device)
            .arg("print");
        parse_partition_table(loop_device, &self.runner.output(&request)?)
    }

    pub fn mount_device(&self, device: &str, target: &Path) -> Result<()> {
        let request = ExecutionRequest::new("mount")
            .arg("-o")
            .arg(MOUNT_OPTIONS)
            .arg(device)
            .arg(target);
        self.runner.execute(&request)?;
        info!(device, target = %target.display(), "mounted read-only");
        Ok(())
    }

    pub fn detach(&self, loop_device: &str) -> Result<()> {
        self.runner
            .execute(&ExecutionRequest::new("losetup").arg("-d").arg(loop_device))?;
        info!(loop_device, "loop device detached");
        Ok(())
    }

    /// Unmounts `target`, removes the emptied directory and optionally detaches
    /// the loop device that backed it. Nothing is removed if umount fails.
    ///
    /// The detach is attempted even when the directory cannot be removed; the
    /// first error is returned and a later one is logged.
    pub fn unmount(&self, target: &Path, loop_device: Option<&str>) -> Result<()> {
        let request = ExecutionRequest::new("umount").arg(target);
        self.runner.execute(&request).map_err(|e| match e {
            ScribeError::ExternalToolFailure { stderr, .. } => ScribeError::UnmountFailure {
                target: target.to_path_buf(),
                message: stderr,
            },
            other => other,
        })?;
        info!(target = %target.display(), "unmounted");

        let removed = fs::remove_dir(target);

        if let Some(loop_device) = loop_device {
            if let Err(e) = self.detach(loop_device) {
                if removed.is_ok() {
                    return Err(e);
                }
                warn!(loop_device, error = %e, "could not detach loop device after unmount");
            }
        }

        removed?;
        Ok(())
    }
}

mod cli;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use console::style;
use dialoguer::{Select, theme::ColorfulTheme};
use std::process::ExitCode;

use cli::{Cli, Commands, FilesystemCommand, MetadataCommand, MultimediaCommand};
use datascribe::config::{Config, ConfigStore};
use datascribe::embedded::{EmbeddedScanner, ExtractOptions};
use datascribe::mount::{FixedPartition, MountOrchestrator, PartitionChooser, PartitionDescriptor};
use datascribe::{ScribeError, SystemRunner, check_type, filesystem, format_size, metadata, resolve, tools};

fn main() -> ExitCode {
    let cli = Cli::parse();
    datascribe::logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = ConfigStore::at_default_location();

    if let Some(dir) = &cli.set_workdir {
        let config = store
            .set_working_directory(dir)
            .context("Failed to set working directory")?;
        println!("Working directory set to {}", config.workdir.display());
    }

    let config = match &cli.workdir {
        Some(dir) => Config::new(std::path::absolute(dir)?),
        None => store.load().context("Failed to load configuration")?,
    };

    if cli.show_workdir {
        println!("{}", config.workdir.display());
    }

    let Some(command) = cli.command else {
        if cli.set_workdir.is_none() && !cli.show_workdir {
            Cli::command().print_help()?;
        }
        return Ok(());
    };

    match command {
        Commands::Filesystem(cmd) => run_filesystem(cmd, &config),
        Commands::Metadata(cmd) => run_metadata(cmd, &config),
        Commands::Multimedia(cmd) => run_multimedia(cmd, &config),
    }
}

fn run_filesystem(cmd: FilesystemCommand, config: &Config) -> Result<()> {
    let workdir = &config.workdir;

    match cmd {
        FilesystemCommand::DirectorySize {
            dir,
            depth,
            include_files,
            min_size,
        } => {
            let dir = check_type(workdir, &dir, false)?;
            let entries = filesystem::directory_sizes(&SystemRunner, &dir, depth, include_files)
                .with_context(|| format!("Error listing directory sizes for {}", dir.display()))?;

            println!("Directory size summary for '{}':", dir.display());
            for entry in entries {
                match entry.size {
                    Ok(bytes) if bytes >= min_size.unwrap_or(0) => {
                        println!("- {}: {}", entry.path.display(), format_size(bytes));
                    }
                    Ok(_) => {}
                    Err(message) => {
                        println!("- {}: {}", entry.path.display(), style(message).yellow());
                    }
                }
            }
        }

        FilesystemCommand::MountImage {
            image,
            mount_point,
            partition,
        } => {
            warn_unless_root();
            let image = check_type(workdir, &image, true)?;
            let target = resolve(workdir, &mount_point);
            let orchestrator = MountOrchestrator::new(SystemRunner);

            let session = match partition {
                Some(index) => orchestrator.mount_image(&image, &target, &FixedPartition(index)),
                None => orchestrator.mount_image(&image, &target, &PromptChooser),
            }
            .with_context(|| format!("Failed to mount {}", image.display()))?;

            println!(
                "{} {} mounted read-only at {}",
                style("Mounted:").green().bold(),
                session.device,
                session.mount_point.display()
            );
            println!(
                "Unmount with: datascribe filesystem unmount-image {} --loop-device {}",
                session.mount_point.display(),
                session.loop_device
            );
        }

        FilesystemCommand::UnmountImage {
            mount_point,
            loop_device,
        } => {
            warn_unless_root();
            let target = check_type(workdir, &mount_point, false)?;
            MountOrchestrator::new(SystemRunner)
                .unmount(&target, loop_device.as_deref())
                .with_context(|| format!("Failed to unmount {}", target.display()))?;
            println!("Unmounted and removed {}", target.display());
        }

        FilesystemCommand::Tools => {
            let missing = tools::missing_tools(tools::EXTERNAL_TOOLS);
            if missing.is_empty() {
                println!("{}", style("All external tools are available.").green());
            } else {
                println!("{}", style("Missing tools:").yellow().bold());
                for tool in missing {
                    println!("- {}", tool);
                }
            }
        }
    }

    Ok(())
}

fn run_metadata(cmd: MetadataCommand, config: &Config) -> Result<()> {
    let workdir = &config.workdir;

    match cmd {
        MetadataCommand::Extract {
            file,
            kind,
            format,
            output_dir,
        } => {
            let file = check_type(workdir, &file, true)?;
            let out_dir = output_dir
                .map(|d| resolve(workdir, &d))
                .unwrap_or_else(|| workdir.clone());

            let record = metadata::extract_metadata(&SystemRunner, &file, kind)
                .with_context(|| format!("Failed to read metadata of {}", file.display()))?;
            let path = metadata::export(&record, &file, kind, format, &out_dir)?;
            println!("Metadata written to {}", path.display());
        }

        MetadataCommand::Gps { file } => {
            let file = check_type(workdir, &file, true)?;
            let position = metadata::gps_position(&SystemRunner, &file)?;
            println!("GPS position of {}: {}", file.display(), position);
        }
    }

    Ok(())
}

fn run_multimedia(cmd: MultimediaCommand, config: &Config) -> Result<()> {
    let workdir = &config.workdir;
    let scanner = EmbeddedScanner::new(SystemRunner);

    match cmd {
        MultimediaCommand::SearchEmbedded { dir, depth } => {
            let dir = check_type(workdir, &dir, false)?;
            let report = scanner.search(&dir, depth);

            for candidate in &report.candidates {
                println!("- {}", candidate.display());
            }
            for (path, reason) in &report.skipped {
                eprintln!("{} {}: {}", style("warning:").yellow(), path.display(), reason);
            }
            println!(
                "{} of {} files look like they carry embedded data",
                report.candidates.len(),
                report.scanned
            );
        }

        MultimediaCommand::ExtractEmbedded {
            file,
            output_dir,
            depth,
            quiet,
        } => {
            let file = check_type(workdir, &file, true)?;
            let output_dir = resolve(workdir, &output_dir);
            let options = ExtractOptions {
                output_dir: Some(&output_dir),
                depth,
                quiet,
            };
            let result = scanner
                .extract(&file, &options)
                .context("Error extracting embedded files")?;
            if !quiet && !result.stdout().is_empty() {
                println!("{}", result.stdout());
            }
            println!("Embedded files extracted to {}", output_dir.display());
        }

        MultimediaCommand::EmbeddedContent { file } => {
            let file = check_type(workdir, &file, true)?;
            println!("{}", scanner.report(&file)?);
        }
    }

    Ok(())
}

/// Asks the operator which partition to mount.
struct PromptChooser;

impl PartitionChooser for PromptChooser {
    fn choose(&self, partitions: &[PartitionDescriptor]) -> datascribe::Result<usize> {
        let items: Vec<String> = partitions.iter().map(|p| p.to_string()).collect();
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select partition to mount")
            .items(&items)
            .default(0)
            .interact()
            .map(|index| index + 1)
            .map_err(|e| ScribeError::Io(std::io::Error::other(e)))
    }
}

fn warn_unless_root() {
    if !rustix::process::geteuid().is_root() {
        eprintln!(
            "{} loop devices and mounts usually require root",
            style("warning:").yellow()
        );
    }
}

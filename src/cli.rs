//! Command-line interface definitions
//!
//! The `securefs` binary is a thin diagnostic front end: it opens one jail
//! and runs a single confined operation in it. Arguments are grouped by
//! the component that consumes them.

use crate::jail::{FileKind, Jail};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nix::sys::stat::Mode;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Run filesystem operations confined to a root directory
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Jail root configuration
    #[command(flatten)]
    pub root: RootConfig,

    /// Output and logging configuration
    #[command(flatten)]
    pub output: OutputConfig,

    /// Operation to run inside the jail
    #[command(subcommand)]
    pub command: Command,
}

// ============================================================================
// FUNCTIONAL GROUPS: Organized by what component consumes them
// ============================================================================

/// Jail root configuration
///
/// Used by: `main()` to build the `Jail`
#[derive(clap::Args, Debug, Clone)]
pub struct RootConfig {
    /// Root directory every path is confined to
    #[arg(long, short = 'r', value_name = "DIR", default_value = "/")]
    pub root: PathBuf,
}

/// Output and logging configuration
///
/// Used by: `main()` to install the tracing subscriber
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl OutputConfig {
    /// Log level selected by `--verbose`/`--quiet`
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

/// Operations exposed on the command line
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print a file to stdout
    Cat {
        /// Path inside the jail
        path: PathBuf,
    },
    /// Write stdin to a file, creating or truncating it
    Write {
        /// Path inside the jail
        path: PathBuf,
        /// Permissions for a newly created file (octal)
        #[arg(long, default_value = "644", value_parser = parse_mode)]
        mode: u32,
    },
    /// List a directory
    Ls {
        /// Directory inside the jail
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Show metadata
    Stat {
        /// Path inside the jail
        path: PathBuf,
    },
    /// Create a directory
    Mkdir {
        /// Directory inside the jail
        path: PathBuf,
        /// Create missing parents, succeed if it already exists
        #[arg(short, long)]
        parents: bool,
        /// Permissions for created directories (octal)
        #[arg(long, default_value = "755", value_parser = parse_mode)]
        mode: u32,
    },
    /// Remove a file, symlink or empty directory
    Rm {
        /// Path inside the jail
        path: PathBuf,
    },
    /// Create a symbolic link (only symbolic links are supported)
    Ln {
        /// Make a symbolic link
        #[arg(short = 's', long, required = true)]
        symbolic: bool,
        /// Link target, stored verbatim
        target: PathBuf,
        /// Path of the new link inside the jail
        link: PathBuf,
    },
    /// Print the absolute host path a jail path resolves to
    Realpath {
        /// Path inside the jail
        path: PathBuf,
    },
}

/// Parse an octal permission string such as `644` or `0o755`
///
/// # Errors
///
/// Returns a message if the value is not octal or exceeds `0o7777`.
pub fn parse_mode(value: &str) -> std::result::Result<u32, String> {
    let digits = value.trim_start_matches("0o");
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|e| format!("invalid octal mode '{value}': {e}"))?;
    if mode > 0o7777 {
        return Err(format!("mode '{value}' is out of range (max 7777)"));
    }
    Ok(mode)
}

impl Args {
    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if both --quiet and --verbose are used.
    pub fn validate(&self) -> Result<()> {
        if self.output.quiet && self.output.verbose > 0 {
            anyhow::bail!("--quiet and --verbose cannot be used together");
        }
        Ok(())
    }
}

fn kind_marker(kind: FileKind) -> char {
    match kind {
        FileKind::File => '-',
        FileKind::Directory => 'd',
        FileKind::Symlink => 'l',
        FileKind::Fifo => 'p',
        FileKind::Socket => 's',
        FileKind::CharDevice => 'c',
        FileKind::BlockDevice => 'b',
        FileKind::Unknown => '?',
    }
}

/// Run `command` inside `jail`
///
/// File contents for `write` are taken from `input`; everything printed goes
/// to `out`.
///
/// # Errors
///
/// Returns the failed jail operation with context, or an I/O error on `input`/`out`.
pub fn run(
    jail: &Jail,
    command: &Command,
    input: &mut impl Read,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Cat { path } => {
            let content = jail
                .read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            out.write_all(&content)?;
        }
        Command::Write { path, mode } => {
            let mut content = Vec::new();
            input.read_to_end(&mut content).context("Failed to read stdin")?;
            jail.write(path, &content, Mode::from_bits_truncate(*mode))
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Command::Ls { path } => {
            let entries = jail
                .read_dir(path)
                .with_context(|| format!("Failed to list {}", path.display()))?;
            for entry in entries {
                writeln!(out, "{} {}", kind_marker(entry.kind), entry.name.to_string_lossy())?;
            }
        }
        Command::Stat { path } => {
            let metadata = jail
                .metadata(path)
                .with_context(|| format!("Failed to stat {}", path.display()))?;
            writeln!(out, "kind: {:?}", metadata.kind)?;
            writeln!(out, "size: {}", metadata.size)?;
            writeln!(out, "mode: {:o}", metadata.permissions())?;
            writeln!(out, "uid: {}", metadata.uid)?;
            writeln!(out, "gid: {}", metadata.gid)?;
            writeln!(out, "nlink: {}", metadata.nlink)?;
            writeln!(out, "inode: {}", metadata.ino)?;
        }
        Command::Mkdir { path, parents, mode } => {
            let mode = Mode::from_bits_truncate(*mode);
            let result = if *parents {
                jail.mkdir_all(path, mode)
            } else {
                jail.mkdir(path, mode)
            };
            result.with_context(|| format!("Failed to create directory {}", path.display()))?;
        }
        Command::Rm { path } => {
            jail.remove(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Command::Ln { target, link, .. } => {
            jail.symlink(target, link)
                .with_context(|| format!("Failed to create symlink {}", link.display()))?;
        }
        Command::Realpath { path } => {
            let resolved = jail
                .resolve_path(path)
                .with_context(|| format!("Failed to resolve {}", path.display()))?;
            writeln!(out, "{}", resolved.display())?;
        }
    }
    Ok(())
}

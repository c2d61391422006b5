use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use devdesc_model::DescriptionFormat;

mod analyze;
mod batch;
mod info;
mod validate;

#[derive(Parser)]
#[command(
    name = "devdesc",
    about = "Round-trip fidelity analysis for EDS and IODD device descriptions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, reconstruct, and score one device description
    Analyze {
        /// Input file (.eds, .xml, .iodd)
        input: PathBuf,

        /// Device id used for archival (defaults to the file stem)
        #[arg(long)]
        device_id: Option<String>,

        /// Minimum acceptable overall score
        #[arg(long, default_value_t = 90.0)]
        min_score: f64,

        /// Maximum acceptable data loss percentage
        #[arg(long, default_value_t = 5.0)]
        max_data_loss: f64,

        /// Print metrics and findings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a device description against the model rules
    Validate {
        /// Input file (.eds, .xml, .iodd)
        input: PathBuf,

        /// Elevate recommended-field findings to errors
        #[arg(long)]
        strict: bool,

        /// Suppress individual findings, print the summary only
        #[arg(short, long)]
        quiet: bool,
    },

    /// Display information about a device description
    Info {
        /// Input file (.eds, .xml, .iodd)
        input: PathBuf,
    },

    /// Analyze every description in a directory or EDS package archive
    Batch {
        /// Directory of .eds/.xml files, or a .zip EDS package
        input: PathBuf,

        /// Minimum acceptable overall score
        #[arg(long, default_value_t = 90.0)]
        min_score: f64,

        /// Maximum acceptable data loss percentage
        #[arg(long, default_value_t = 5.0)]
        max_data_loss: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Format {
    Eds,
    Iodd,
}

impl From<Format> for DescriptionFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Eds => DescriptionFormat::Eds,
            Format::Iodd => DescriptionFormat::Iodd,
        }
    }
}

fn detect_format(path: &Path) -> Result<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("eds") => Ok(Format::Eds),
        Some(ext) if ext.eq_ignore_ascii_case("xml") || ext.eq_ignore_ascii_case("iodd") => {
            Ok(Format::Iodd)
        }
        Some(ext) => bail!("Unknown file extension: .{ext}. Use .eds, .xml, or .iodd"),
        None => bail!("Cannot detect format: file has no extension"),
    }
}

fn device_id_for(path: &Path, explicit: Option<&str>) -> String {
    explicit.map_or_else(
        || {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed-device".into())
        },
        str::to_string,
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Command::Analyze {
            input,
            device_id,
            min_score,
            max_data_loss,
            json,
        } => analyze::run_analyze(&input, device_id.as_deref(), min_score, max_data_loss, json),

        Command::Validate { input, strict, quiet } => validate::run_validate(&input, strict, quiet),

        Command::Info { input } => info::run_info(&input),

        Command::Batch {
            input,
            min_score,
            max_data_loss,
        } => batch::run_batch(&input, min_score, max_data_loss),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_format_eds() {
        assert_eq!(detect_format(Path::new("device.eds")).unwrap(), Format::Eds);
        assert_eq!(detect_format(Path::new("DEVICE.EDS")).unwrap(), Format::Eds);
    }

    #[test]
    fn detect_format_iodd() {
        assert_eq!(detect_format(Path::new("device.xml")).unwrap(), Format::Iodd);
        assert_eq!(detect_format(Path::new("device.iodd")).unwrap(), Format::Iodd);
    }

    #[test]
    fn detect_format_unknown() {
        let err = detect_format(Path::new("device.txt")).unwrap_err();
        assert!(err.to_string().contains("Unknown file extension"));
        assert!(detect_format(Path::new("device")).is_err());
    }

    #[test]
    fn device_id_defaults_to_file_stem() {
        assert_eq!(device_id_for(Path::new("dir/my-device.eds"), None), "my-device");
        assert_eq!(device_id_for(Path::new("x.eds"), Some("dev-7")), "dev-7");
    }
}

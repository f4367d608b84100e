use crate::utils::{OutputFormat, Result};
use chrono::Datelike;
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="varbayes",
          version=&**FULL_VERSION,
          long_about = None,
          disable_help_subcommand = true,
          after_help = format!("Copyright (C) {}     varbayes developers.
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()),
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Bayesian short-variant caller")]
    Call(CallArgs),
}

#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub bandwidth: usize,
    pub banddepth: usize,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("call")))]
#[command(arg_required_else_help(true))]
pub struct CallArgs {
    #[clap(required = true)]
    #[clap(short = 'g')]
    #[clap(long = "genome")]
    #[clap(help = "Path to reference genome FASTA")]
    #[clap(value_name = "FASTA")]
    #[arg(value_parser = check_file_exists)]
    pub genome_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reads")]
    #[clap(help = "BAM file with aligned reads")]
    #[clap(value_name = "READS")]
    #[arg(value_parser = check_file_exists)]
    pub reads_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: PathBuf,

    #[clap(long = "region")]
    #[clap(value_name = "REGION")]
    #[clap(help = "Restrict calling to one region (chrom:start-end)")]
    pub region: Option<String>,

    #[clap(long = "targets")]
    #[clap(short = 'b')]
    #[clap(value_name = "TARGETS")]
    #[clap(help = "BED file with regions to call")]
    #[arg(value_parser = check_file_exists)]
    pub targets_path: Option<PathBuf>,

    #[clap(long = "output-format")]
    #[clap(value_name = "FORMAT")]
    #[clap(help = "Output format (vcf or json)")]
    #[clap(default_value = "vcf")]
    pub output_format: OutputFormat,

    #[clap(help_heading("Model"))]
    #[clap(short = 'p')]
    #[clap(long = "ploidy")]
    #[clap(value_name = "PLOIDY")]
    #[clap(help = "Number of allele copies per sample")]
    #[clap(default_value = "2")]
    #[arg(value_parser = ploidy_in_range)]
    pub ploidy: usize,

    #[clap(help_heading("Model"))]
    #[clap(long = "theta")]
    #[clap(value_name = "THETA")]
    #[clap(help = "Scaled mutation rate of the allele-frequency prior")]
    #[clap(default_value = "0.001")]
    #[arg(value_parser = ensure_positive_float)]
    pub theta: f64,

    #[clap(help_heading("Model"))]
    #[clap(long = "band")]
    #[clap(value_name = "BAND")]
    #[clap(help = "Genotype combination search band: WIDTH,DEPTH")]
    #[clap(default_value = "2,2")]
    #[arg(value_parser = band_from_string)]
    pub band: Band,

    #[clap(help_heading("Filtering"))]
    #[clap(long = "min-mapq")]
    #[clap(value_name = "MIN_MAPQ")]
    #[clap(help = "Minimum mapping quality for an observation to nominate a candidate allele")]
    #[clap(default_value = "30")]
    pub min_mapq: u8,

    #[clap(help_heading("Filtering"))]
    #[clap(long = "min-baseq")]
    #[clap(value_name = "MIN_BASEQ")]
    #[clap(help = "Minimum base quality for an observation to nominate a candidate allele")]
    #[clap(default_value = "20")]
    pub min_baseq: u8,

    #[clap(help_heading("Filtering"))]
    #[clap(long = "min-alt-count")]
    #[clap(value_name = "COUNT")]
    #[clap(help = "Minimum observations of a candidate allele in at least one sample")]
    #[clap(default_value = "2")]
    pub min_alt_count: usize,

    #[clap(help_heading("Filtering"))]
    #[clap(long = "min-alt-fraction")]
    #[clap(value_name = "FRAC")]
    #[clap(help = "Minimum fraction of a sample's observations supporting a candidate allele")]
    #[clap(default_value = "0.1")]
    #[arg(value_parser = ensure_unit_float)]
    pub min_alt_fraction: f64,

    #[clap(help_heading("Reporting"))]
    #[clap(long = "min-pvar")]
    #[clap(value_name = "PVAR")]
    #[clap(help = "Minimum probability of variation required to report a site")]
    #[clap(default_value = "0.9")]
    #[arg(value_parser = ensure_unit_float)]
    pub min_p_variant: f64,

    #[clap(help_heading("Reporting"))]
    #[clap(long = "suppress-output")]
    #[clap(help = "Run inference without emitting records")]
    pub suppress_output: bool,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "sample-name")]
    #[clap(value_name = "SAMPLE_NAME")]
    #[clap(help = "Sample name for reads without read groups")]
    #[clap(default_value = None)]
    #[arg(value_parser = check_sample_name_nonempty)]
    pub sample_name: Option<String>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-depth")]
    #[clap(value_name = "MAX_DEPTH")]
    #[clap(help = "Maximum locus depth; deeper loci are downsampled")]
    #[clap(default_value = "1000")]
    pub max_depth: usize,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(path.to_path_buf())
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn check_sample_name_nonempty(s: &str) -> Result<String> {
    if s.trim().is_empty() {
        Err("Sample name cannot be an empty string".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn ploidy_in_range(s: &str) -> Result<usize> {
    let ploidy: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid ploidy", s))?;
    if ploidy >= 1 {
        Ok(ploidy)
    } else {
        Err("Ploidy must be at least 1".into())
    }
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "The value must be between 0.0 and 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}

fn ensure_positive_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("The value must be positive, got: {}", value))
    }
}

fn band_from_string(s: &str) -> Result<Band> {
    const NUM_EXPECTED_VALUES: usize = 2;
    let values: Vec<usize> = s.split(',').filter_map(|x| x.parse().ok()).collect();
    if values.len() != NUM_EXPECTED_VALUES {
        return Err(format!(
            "Expected {} comma-separated positive values in band. Got {} -> {}",
            NUM_EXPECTED_VALUES,
            values.len(),
            s
        ));
    }

    if values.iter().any(|&val| val == 0) {
        return Err(format!("Band values must be positive. Got {}.", s));
    }

    Ok(Band {
        bandwidth: values[0],
        banddepth: values[1],
    })
}

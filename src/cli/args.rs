use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kira-atlas",
    version,
    about = "Interactive single-file HTML report for a gene list over an expression matrix"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Run(RunArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Expression matrix (genes x samples, optionally gzip-compressed).
    #[arg(long)]
    pub matrix: PathBuf,

    /// Gene ids, one per line or delimited.
    #[arg(long)]
    pub genes: PathBuf,

    /// Optional gene annotation table.
    #[arg(long)]
    pub annot: Option<PathBuf>,

    /// Output HTML file.
    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, default_value = "Gene Expression Atlas")]
    pub title: String,

    #[arg(long, value_enum, default_value_t = DelimiterArg::Auto)]
    pub delimiter: DelimiterArg,

    #[arg(long, default_value = "NA")]
    pub missing_token: String,

    #[arg(long, value_enum, default_value_t = LineScaleArg::Raw)]
    pub line_scale: LineScaleArg,

    /// Pseudocount added before log10 on the line chart.
    #[arg(long, default_value_t = 0.01)]
    pub log_epsilon: f64,

    #[arg(long, value_enum, default_value_t = BarStatArg::Mean)]
    pub bar_stat: BarStatArg,

    /// Plot each gene's mean in this condition instead of --bar-stat.
    #[arg(long)]
    pub reference_sample: Option<String>,

    /// Also write <stem>_data.tsv with the selected raw values.
    #[arg(long, default_value_t = false)]
    pub export_tables: bool,

    /// Also bundle the outputs into <stem>_atlas.zip.
    #[arg(long, default_value_t = false)]
    pub zip: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DelimiterArg {
    #[value(name = "auto")]
    Auto,
    #[value(name = "tab")]
    Tab,
    #[value(name = "comma")]
    Comma,
    #[value(name = "semicolon")]
    Semicolon,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LineScaleArg {
    #[value(name = "raw")]
    Raw,
    #[value(name = "log10")]
    Log10,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BarStatArg {
    #[value(name = "mean")]
    Mean,
    #[value(name = "median")]
    Median,
}

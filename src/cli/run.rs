use crate::chart::ChartConfig;
use crate::cli::args::{BarStatArg, Cli, Commands, DelimiterArg, LineScaleArg, RunArgs};
use crate::core::engine::{self, RunConfig, fmt_dur, stats_enabled};
use crate::core::matrix::LoadOptions;
use crate::core::model::{BarStat, LineScale};
use crate::core::stats::StatsConfig;
use crate::core::table::Delimiter;
use crate::report;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub fn entry() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Run(args) => run(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(args: RunArgs) -> Result<()> {
    let stats = stats_enabled();
    let t0 = Instant::now();

    stage(stats, "preflight", || {
        if !args.matrix.is_file() {
            bail!("matrix file not found: {}", args.matrix.display());
        }
        if !args.genes.is_file() {
            bail!("gene list not found: {}", args.genes.display());
        }
        if let Some(annot) = &args.annot {
            if !annot.is_file() {
                warn!(
                    "annotation file not found: {}; continuing without annotation",
                    annot.display()
                );
            }
        }
        if !(args.log_epsilon > 0.0 && args.log_epsilon.is_finite()) {
            bail!("--log-epsilon must be a positive number");
        }
        if args.output.as_os_str().is_empty() {
            bail!("--output must name a file");
        }
        Ok(())
    })?;

    let t_out = Instant::now();
    let out_dir = match args.output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output dir {}", out_dir.display()))?;
    let stem = args
        .output
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .context("failed to determine report name from --output")?;
    stage_done(stats, "mkdir", t_out);

    let config = run_config(&args);
    let t_engine = Instant::now();
    let output = match engine::run(&config) {
        Ok(o) => o,
        Err(e) => {
            if e.is_input_error() {
                error!("input rejected: {}", e);
            } else {
                error!("report generation failed: {}", e);
            }
            return Err(e.into());
        }
    };
    stage_done(stats, "engine", t_engine);

    let html_path = args.output.clone();
    let t_html = Instant::now();
    report::html::write(&html_path, &output.html)
        .with_context(|| format!("failed to write {}", html_path.display()))?;
    stage_done(stats, "html", t_html);
    info!(
        genes = output.report.meta.matched,
        bytes = output.html.len(),
        "wrote report {}",
        html_path.display()
    );

    let summary_path = out_dir.join(format!("{}_summary.txt", stem));
    let t_summary = Instant::now();
    report::summary_txt::write(&summary_path, &output.report)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    stage_done(stats, "summary", t_summary);

    let data_path = out_dir.join(format!("{}_data.tsv", stem));
    if args.export_tables {
        let t_data = Instant::now();
        report::data_tsv::write(&data_path, &output.dataset, &config.load.missing_token)
            .with_context(|| format!("failed to write {}", data_path.display()))?;
        stage_done(stats, "data_tsv", t_data);
        info!("wrote table {}", data_path.display());
    }

    if args.zip {
        let t_zip = Instant::now();
        let zip_path = out_dir.join(format!("{}_atlas.zip", stem));
        let html_name = file_name(&html_path);
        let summary_name = file_name(&summary_path);
        let data_name = file_name(&data_path);
        let mut files: Vec<(&str, &Path)> = vec![
            (html_name.as_str(), html_path.as_path()),
            (summary_name.as_str(), summary_path.as_path()),
        ];
        if args.export_tables {
            files.push((data_name.as_str(), data_path.as_path()));
        }
        report::zip::write_zip(&zip_path, &stem, &files)
            .with_context(|| "failed to create zip output")?;
        stage_done(stats, "zip", t_zip);
        info!("wrote archive {}", zip_path.display());
    }

    if stats {
        info!(target: "kira_stats", total = %fmt_dur(t0.elapsed()), output_dir = %out_dir.display());
    }
    Ok(())
}

fn run_config(args: &RunArgs) -> RunConfig {
    let delimiter = match args.delimiter {
        DelimiterArg::Auto => None,
        DelimiterArg::Tab => Some(Delimiter::Tab),
        DelimiterArg::Comma => Some(Delimiter::Comma),
        DelimiterArg::Semicolon => Some(Delimiter::Semicolon),
    };
    let line_scale = match args.line_scale {
        LineScaleArg::Raw => LineScale::Raw,
        LineScaleArg::Log10 => LineScale::Log10,
    };
    let bar_stat = match (&args.reference_sample, args.bar_stat) {
        (Some(name), _) => BarStat::Reference(name.clone()),
        (None, BarStatArg::Mean) => BarStat::Mean,
        (None, BarStatArg::Median) => BarStat::Median,
    };
    RunConfig {
        matrix: args.matrix.clone(),
        genes: args.genes.clone(),
        annot: args.annot.clone(),
        load: LoadOptions {
            delimiter,
            missing_token: args.missing_token.clone(),
        },
        stats: StatsConfig {
            line_scale,
            log_epsilon: args.log_epsilon,
            bar_stat,
        },
        chart: ChartConfig {
            title: args.title.clone(),
            ..ChartConfig::default()
        },
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn stage<F>(stats: bool, name: &str, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let t = Instant::now();
    let res = f();
    stage_done(stats, name, t);
    res
}

fn stage_done(stats: bool, name: &str, t: Instant) {
    engine::log_stage(stats, name, t);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec![
            "kira-atlas",
            "run",
            "--matrix",
            "m.tsv",
            "--genes",
            "g.txt",
            "--output",
            "out/report.html",
        ];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(a) => a,
        }
    }

    #[test]
    fn defaults_map_to_run_config() {
        let cfg = run_config(&args(&[]));
        assert_eq!(cfg.load.delimiter, None);
        assert_eq!(cfg.load.missing_token, "NA");
        assert_eq!(cfg.stats.line_scale, LineScale::Raw);
        assert_eq!(cfg.stats.bar_stat, BarStat::Mean);
        assert_eq!(cfg.chart.title, "Gene Expression Atlas");
        assert!(cfg.annot.is_none());
    }

    #[test]
    fn reference_sample_overrides_bar_stat() {
        let cfg = run_config(&args(&[
            "--bar-stat",
            "median",
            "--reference-sample",
            "liver",
            "--line-scale",
            "log10",
            "--delimiter",
            "comma",
        ]));
        assert_eq!(cfg.stats.bar_stat, BarStat::Reference("liver".to_string()));
        assert_eq!(cfg.stats.line_scale, LineScale::Log10);
        assert_eq!(cfg.load.delimiter, Some(Delimiter::Comma));
    }

    #[test]
    fn full_run_writes_report_and_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let matrix = dir.path().join("m.csv");
        let genes = dir.path().join("g.txt");
        fs::write(&matrix, "gene,A,B\nG1,1,2\nG2,3,NA\n").unwrap();
        fs::write(&genes, "G2\nG1\n").unwrap();
        let output = dir.path().join("nested").join("atlas.html");
        let argv = vec![
            "kira-atlas".to_string(),
            "run".to_string(),
            "--matrix".to_string(),
            matrix.display().to_string(),
            "--genes".to_string(),
            genes.display().to_string(),
            "--output".to_string(),
            output.display().to_string(),
            "--export-tables".to_string(),
            "--zip".to_string(),
        ];
        let Commands::Run(a) = Cli::parse_from(argv).command;
        run(a).unwrap();

        let nested = dir.path().join("nested");
        assert!(output.is_file());
        assert!(nested.join("atlas_summary.txt").is_file());
        assert_eq!(
            fs::read_to_string(nested.join("atlas_data.tsv")).unwrap(),
            "gene\tA\tB\nG2\t3\tNA\nG1\t1\t2\n"
        );
        assert!(nested.join("atlas_atlas.zip").is_file());
    }

    #[test]
    fn preflight_rejects_bad_epsilon_and_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(&["--log-epsilon", "0"]);
        assert!(run(a).is_err());
        let mut a = args(&[]);
        a.matrix = dir.path().join("missing.tsv");
        assert!(run(a).is_err());
    }
}

use crate::chart::{self, AnnotationState, ChartConfig, ReportContext, ReportModel};
use crate::core::align::{self, AlignedDataset};
use crate::core::annotation::{self, AnnotationTable};
use crate::core::error::Result;
use crate::core::genes;
use crate::core::io::InputKind;
use crate::core::matrix::{self, LoadOptions};
use crate::core::stats::{self, StatsConfig};
use crate::report;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

pub struct RunConfig {
    pub matrix: PathBuf,
    pub genes: PathBuf,
    pub annot: Option<PathBuf>,
    pub load: LoadOptions,
    pub stats: StatsConfig,
    pub chart: ChartConfig,
}

pub struct RunOutput {
    pub dataset: AlignedDataset,
    pub report: ReportModel,
    pub html: String,
    pub input_kind: InputKind,
}

/// Load, align, derive, model and render. Nothing is written to disk here.
pub fn run(cfg: &RunConfig) -> Result<RunOutput> {
    let stats = stats_enabled();

    let t_matrix = Instant::now();
    let (matrix, input_kind) = matrix::load(&cfg.matrix, &cfg.load)?;
    log_stage(stats, "engine.matrix", t_matrix);
    info!(
        genes = matrix.n_genes(),
        samples = matrix.n_samples(),
        delimiter = matrix.delimiter().as_str(),
        input = input_kind.as_str(),
        "loaded expression matrix {}",
        cfg.matrix.display()
    );

    let t_genes = Instant::now();
    let selection = genes::load(&cfg.genes)?;
    log_stage(stats, "engine.genes", t_genes);
    let mut warnings = Vec::new();
    if selection.duplicates() > 0 {
        warn!(
            duplicates = selection.duplicates(),
            "duplicate gene ids in gene list ignored"
        );
        warnings.push(format!(
            "{} duplicate gene id(s) in the gene list were ignored",
            selection.duplicates()
        ));
    }

    let t_annot = Instant::now();
    let (table, annotation_state) = load_annotation(cfg.annot.as_deref(), &mut warnings);
    log_stage(stats, "engine.annotation", t_annot);

    let t_align = Instant::now();
    let alignment = align::align(&matrix, &selection, table.as_ref())?;
    log_stage(stats, "engine.align", t_align);
    if !alignment.unmatched.is_empty() {
        warn!(
            unmatched = alignment.unmatched.len(),
            requested = selection.len(),
            "genes not found in matrix: {}",
            alignment.unmatched.join(", ")
        );
        warnings.push(format!(
            "{} of {} requested genes were not found in the matrix",
            alignment.unmatched.len(),
            selection.len()
        ));
    }
    let layout = &alignment.dataset.layout;
    info!(
        conditions = layout.groups().len(),
        replicated = layout.has_replicates(),
        "sample layout"
    );
    debug!(order = ?alignment.dataset.gene_ids(), "aligned genes");
    if table.is_some() {
        info!(
            annotated = alignment.dataset.annotated_genes(),
            genes = alignment.dataset.genes.len(),
            "annotation attached"
        );
    }

    let t_stats = Instant::now();
    let derived = stats::derive(&alignment.dataset, &cfg.stats)?;
    log_stage(stats, "engine.stats", t_stats);
    let zero_var = derived.heatmap.zero_variance_rows();
    if zero_var > 0 {
        warn!(rows = zero_var, "zero-variance heatmap rows drawn neutral");
    }

    let ctx = ReportContext {
        matrix_file: display_name(&cfg.matrix),
        genes_file: display_name(&cfg.genes),
        annotation: annotation_state,
        requested: selection.len(),
        unmatched: alignment.unmatched.clone(),
        warnings,
        generated_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    };

    let t_model = Instant::now();
    let model = chart::build(&alignment.dataset, &derived, &ctx, &cfg.chart);
    log_stage(stats, "engine.model", t_model);

    let t_render = Instant::now();
    let html = report::html::render(&model)?;
    log_stage(stats, "engine.render", t_render);

    Ok(RunOutput {
        dataset: alignment.dataset,
        report: model,
        html,
        input_kind,
    })
}

/// Annotation problems never abort a run: the report degrades to unannotated.
fn load_annotation(
    path: Option<&Path>,
    warnings: &mut Vec<String>,
) -> (Option<AnnotationTable>, AnnotationState) {
    let Some(path) = path else {
        return (None, AnnotationState::NotProvided);
    };
    let file = display_name(path);
    match annotation::load(path, None) {
        Ok(table) => {
            info!(
                records = table.len(),
                columns = table.columns().len(),
                id_column = table.id_column_name(),
                "loaded annotation {}",
                path.display()
            );
            if table.duplicates() > 0 {
                warn!(
                    duplicates = table.duplicates(),
                    "duplicate annotation records ignored; first record wins"
                );
                warnings.push(format!(
                    "{} duplicate annotation record(s) ignored",
                    table.duplicates()
                ));
            }
            let state = AnnotationState::Loaded {
                file,
                records: table.len(),
                duplicates: table.duplicates(),
            };
            (Some(table), state)
        }
        Err(e) => {
            warn!("annotation unavailable, continuing without it: {}", e);
            warnings.push(format!("annotation not used: {}", e));
            (
                None,
                AnnotationState::Degraded {
                    file,
                    reason: e.to_string(),
                },
            )
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn stats_enabled() -> bool {
    matches!(std::env::var("KIRA_STATS").as_deref(), Ok("1"))
}

pub fn log_stage(stats: bool, name: &str, t: Instant) {
    if stats {
        info!(target: "kira_stats", stage = name, time = %fmt_dur(t.elapsed()));
    }
}

pub fn fmt_dur(d: Duration) -> String {
    if d.as_secs_f64() < 1.0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AtlasError;
    use crate::core::model::Status;
    use std::fs;

    fn config(dir: &Path, annot: Option<&str>) -> RunConfig {
        let matrix = dir.join("counts.tsv");
        fs::write(
            &matrix,
            "gene_id\tliver\tliver\tbrain\theart\nG1\t1\t3\t8\t0\nG2\t5\t5\t5\t5\nG3\t10\tNA\t0\t4\n",
        )
        .unwrap();
        let genes = dir.join("genes.txt");
        fs::write(&genes, "G3\nG1, G9\nG3\n").unwrap();
        let annot = annot.map(|text| {
            let p = dir.join("annot.tsv");
            fs::write(&p, text).unwrap();
            p
        });
        RunConfig {
            matrix,
            genes,
            annot,
            load: LoadOptions::default(),
            stats: StatsConfig::default(),
            chart: ChartConfig::default(),
        }
    }

    #[test]
    fn end_to_end_report() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), Some("gene_id\tsymbol\nG1\tALB\nG3\tGFAP\n"));
        let out = run(&cfg).unwrap();

        assert_eq!(out.dataset.gene_ids(), vec!["G3", "G1"]);
        assert_eq!(out.report.unmatched, vec!["G9".to_string()]);
        assert_eq!(out.report.meta.requested, 3);
        assert_eq!(out.report.meta.statuses.genes, Status::Warn);
        assert_eq!(out.report.genes[1].display, "G1 (ALB)");
        assert_eq!(out.input_kind, InputKind::Plain);
        assert_eq!(
            out.report.line().unwrap().categories,
            vec!["liver", "brain", "heart"]
        );
        assert!(out.html.contains("id=\"atlas-model\""));
        // duplicate G3 in the list plus one unmatched gene
        assert_eq!(out.report.warnings.len(), 2);
    }

    #[test]
    fn broken_annotation_degrades_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), Some("gene_id\tsymbol\nG1\tALB\textra\n"));
        let out = run(&cfg).unwrap();
        assert!(matches!(
            out.report.meta.annotation,
            AnnotationState::Degraded { .. }
        ));
        assert_eq!(out.report.meta.statuses.annotation, Status::Warn);
        assert!(out.report.genes.iter().all(|g| g.annotation.is_empty()));
        assert_eq!(out.report.line().unwrap().series.len(), 2);
    }

    #[test]
    fn missing_annotation_file_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), None);
        cfg.annot = Some(dir.path().join("absent.tsv"));
        let out = run(&cfg).unwrap();
        assert!(matches!(
            out.report.meta.annotation,
            AnnotationState::Degraded { .. }
        ));
    }

    #[test]
    fn no_matching_genes_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), None);
        fs::write(&cfg.genes, "X1\nX2\n").unwrap();
        let err = run(&cfg).err().unwrap();
        assert!(matches!(err, AtlasError::NoGenesMatched { requested: 2 }));
        assert!(err.is_input_error());
    }

    #[test]
    fn formats_durations() {
        assert_eq!(fmt_dur(Duration::from_millis(42)), "42ms");
        assert_eq!(fmt_dur(Duration::from_millis(1500)), "1.500s");
    }
}

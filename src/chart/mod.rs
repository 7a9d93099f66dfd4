//! Chart-agnostic visualization models.
//!
//! Everything here is a pure function of the aligned dataset and its derived
//! series. Gene order in every model is the order of `ReportModel::genes`,
//! which is the user's selection order restricted to matched genes.

use crate::core::align::AlignedDataset;
use crate::core::model::{BarStat, LineScale, Status};
use crate::core::stats::DerivedSeries;
use serde::Serialize;

pub mod axis;
pub mod palette;

pub use axis::{AXIS_MARGIN, AxisBounds};
pub use palette::Palette;

#[derive(Clone, Debug)]
pub struct ChartConfig {
    pub title: String,
    pub palette: Palette,
    pub margin: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "Gene Expression Atlas".to_string(),
            palette: Palette::default(),
            margin: AXIS_MARGIN,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnnotationState {
    NotProvided,
    Loaded {
        file: String,
        records: usize,
        duplicates: usize,
    },
    /// The table could not be used; the report carries no annotation.
    Degraded { file: String, reason: String },
}

/// Run facts the charts do not compute themselves.
#[derive(Clone, Debug)]
pub struct ReportContext {
    pub matrix_file: String,
    pub genes_file: String,
    pub annotation: AnnotationState,
    pub requested: usize,
    pub unmatched: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnotationField {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneLabel {
    pub id: String,
    pub display: String,
    pub color: String,
    pub annotation: Vec<AnnotationField>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LineSeriesModel {
    pub gene: usize,
    pub values: Vec<Option<f64>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LineModel {
    pub categories: Vec<String>,
    pub series: Vec<LineSeriesModel>,
    pub scale: LineScale,
    pub x_label: String,
    pub y_label: String,
    pub y_axis: AxisBounds,
}

#[derive(Clone, Debug, Serialize)]
pub struct BarModel {
    pub genes: Vec<String>,
    pub values: Vec<f64>,
    pub missing: Vec<bool>,
    pub rank: Vec<usize>,
    pub stat: BarStat,
    pub y_label: String,
    pub y_axis: AxisBounds,
}

#[derive(Clone, Debug, Serialize)]
pub struct HeatmapCellModel {
    pub z: f64,
    pub raw: Option<f64>,
    pub neutral: bool,
    pub color: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ColorScale {
    pub min: f64,
    pub mid: f64,
    pub max: f64,
    pub low_color: String,
    pub mid_color: String,
    pub high_color: String,
    pub missing_color: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct HeatmapModel {
    pub genes: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<HeatmapCellModel>>,
    pub zero_variance: Vec<bool>,
    pub color_scale: ColorScale,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReplicateTrackModel {
    pub name: String,
    pub color: String,
    /// `(condition index, value)` pairs.
    pub points: Vec<(usize, f64)>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReplicateGeneModel {
    pub gene: usize,
    pub tracks: Vec<ReplicateTrackModel>,
    pub y_axis: AxisBounds,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReplicateModel {
    pub conditions: Vec<String>,
    pub genes: Vec<ReplicateGeneModel>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TableRowModel {
    pub gene: usize,
    pub values: Vec<Option<f64>>,
    pub annotation: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TableModel {
    pub id_column: String,
    pub value_columns: Vec<String>,
    pub annotation_columns: Vec<String>,
    pub rows: Vec<TableRowModel>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartModel {
    Line(LineModel),
    Bar(BarModel),
    Heatmap(HeatmapModel),
    Replicates(ReplicateModel),
}

#[derive(Clone, Debug, Serialize)]
pub struct ModuleStatuses {
    pub genes: Status,
    pub annotation: Status,
    pub line: Status,
    pub bar: Status,
    pub heatmap: Status,
    pub replicates: Status,
    pub table: Status,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportMeta {
    pub matrix_file: String,
    pub genes_file: String,
    pub annotation: AnnotationState,
    pub requested: usize,
    pub matched: usize,
    pub samples: usize,
    pub conditions: usize,
    pub zero_variance_rows: usize,
    pub generated_at: u64,
    pub statuses: ModuleStatuses,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportModel {
    pub title: String,
    pub meta: ReportMeta,
    pub genes: Vec<GeneLabel>,
    pub charts: Vec<ChartModel>,
    pub table: TableModel,
    pub unmatched: Vec<String>,
    pub warnings: Vec<String>,
}

impl ReportModel {
    pub fn line(&self) -> Option<&LineModel> {
        self.charts.iter().find_map(|c| match c {
            ChartModel::Line(m) => Some(m),
            _ => None,
        })
    }

    pub fn bar(&self) -> Option<&BarModel> {
        self.charts.iter().find_map(|c| match c {
            ChartModel::Bar(m) => Some(m),
            _ => None,
        })
    }

    pub fn heatmap(&self) -> Option<&HeatmapModel> {
        self.charts.iter().find_map(|c| match c {
            ChartModel::Heatmap(m) => Some(m),
            _ => None,
        })
    }

    pub fn replicates(&self) -> Option<&ReplicateModel> {
        self.charts.iter().find_map(|c| match c {
            ChartModel::Replicates(m) => Some(m),
            _ => None,
        })
    }
}

pub fn build(
    dataset: &AlignedDataset,
    derived: &DerivedSeries,
    ctx: &ReportContext,
    cfg: &ChartConfig,
) -> ReportModel {
    let genes = gene_labels(dataset, cfg);
    let line = build_line(derived, cfg);
    let bar = build_bar(derived, cfg);
    let heatmap = build_heatmap(derived, cfg);
    let replicates = build_replicates(derived, cfg);
    let table = build_table(dataset);

    let statuses = ModuleStatuses {
        genes: if ctx.unmatched.is_empty() {
            Status::Pass
        } else {
            Status::Warn
        },
        annotation: match ctx.annotation {
            AnnotationState::Degraded { .. } => Status::Warn,
            _ => Status::Pass,
        },
        line: Status::Pass,
        bar: if bar.missing.iter().any(|&m| m) {
            Status::Warn
        } else {
            Status::Pass
        },
        heatmap: if heatmap.zero_variance.iter().any(|&z| z) {
            Status::Warn
        } else {
            Status::Pass
        },
        replicates: Status::Pass,
        table: Status::Pass,
    };
    let meta = ReportMeta {
        matrix_file: ctx.matrix_file.clone(),
        genes_file: ctx.genes_file.clone(),
        annotation: ctx.annotation.clone(),
        requested: ctx.requested,
        matched: dataset.genes.len(),
        samples: dataset.layout.samples().len(),
        conditions: dataset.layout.groups().len(),
        zero_variance_rows: derived.heatmap.zero_variance_rows(),
        generated_at: ctx.generated_at,
        statuses,
    };

    let mut warnings = ctx.warnings.clone();
    if meta.zero_variance_rows > 0 {
        warnings.push(format!(
            "{} gene(s) have zero variance across conditions; heatmap rows drawn neutral",
            meta.zero_variance_rows
        ));
    }

    ReportModel {
        title: cfg.title.clone(),
        meta,
        genes,
        charts: vec![
            ChartModel::Line(line),
            ChartModel::Bar(bar),
            ChartModel::Heatmap(heatmap),
            ChartModel::Replicates(replicates),
        ],
        table,
        unmatched: ctx.unmatched.clone(),
        warnings,
    }
}

fn gene_labels(dataset: &AlignedDataset, cfg: &ChartConfig) -> Vec<GeneLabel> {
    dataset
        .genes
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let annotation = g
                .annotation
                .as_ref()
                .map(|attrs| {
                    dataset
                        .annotation_columns
                        .iter()
                        .zip(attrs)
                        .filter(|(_, v)| !v.is_empty())
                        .map(|(name, value)| AnnotationField {
                            name: name.clone(),
                            value: value.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            let display = dataset
                .display_column
                .and_then(|c| g.annotation.as_ref()?.get(c))
                .filter(|s| !s.is_empty() && *s != &g.id)
                .map(|s| format!("{} ({})", g.id, s))
                .unwrap_or_else(|| g.id.clone());
            GeneLabel {
                id: g.id.clone(),
                display,
                color: cfg.palette.series_color(i).to_string(),
                annotation,
            }
        })
        .collect()
}

fn build_line(derived: &DerivedSeries, cfg: &ChartConfig) -> LineModel {
    let y_axis = axis::bounds(
        derived.line.rows.iter().flatten().flatten().copied(),
        cfg.margin,
        false,
    );
    LineModel {
        categories: derived.conditions.clone(),
        series: derived
            .line
            .rows
            .iter()
            .enumerate()
            .map(|(gene, values)| LineSeriesModel {
                gene,
                values: values.clone(),
            })
            .collect(),
        scale: derived.line.scale,
        x_label: "Condition".to_string(),
        y_label: derived.line.scale.axis_label().to_string(),
        y_axis,
    }
}

fn build_bar(derived: &DerivedSeries, cfg: &ChartConfig) -> BarModel {
    let bar = &derived.bar;
    let y_axis = axis::bounds(
        bar.values.iter().filter(|v| !v.missing).map(|v| v.value),
        cfg.margin,
        true,
    );
    BarModel {
        genes: derived.genes.clone(),
        values: bar.values.iter().map(|v| v.value).collect(),
        missing: bar.values.iter().map(|v| v.missing).collect(),
        rank: bar.rank.clone(),
        stat: bar.stat.clone(),
        y_label: bar.stat.label(),
        y_axis,
    }
}

/// Colour domain is symmetric around 0: `[-b, b]` with `b` the largest
/// computed |z|, never below 1.
fn build_heatmap(derived: &DerivedSeries, cfg: &ChartConfig) -> HeatmapModel {
    let palette = &cfg.palette;
    let bound = derived.heatmap.max_abs_z().unwrap_or(1.0).max(1.0);
    let cells = derived
        .heatmap
        .rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|c| HeatmapCellModel {
                    z: c.z,
                    raw: c.raw,
                    neutral: c.neutral,
                    color: if c.raw.is_none() {
                        palette.missing.clone()
                    } else {
                        palette.diverging(c.z / bound)
                    },
                })
                .collect()
        })
        .collect();
    HeatmapModel {
        genes: derived.genes.clone(),
        columns: derived.conditions.clone(),
        cells,
        zero_variance: derived
            .heatmap
            .rows
            .iter()
            .map(|r| r.zero_variance)
            .collect(),
        color_scale: ColorScale {
            min: -bound,
            mid: 0.0,
            max: bound,
            low_color: palette.low_hex(),
            mid_color: palette.mid_hex(),
            high_color: palette.high_hex(),
            missing_color: palette.missing.clone(),
        },
    }
}

fn build_replicates(derived: &DerivedSeries, cfg: &ChartConfig) -> ReplicateModel {
    let genes = derived
        .replicates
        .iter()
        .enumerate()
        .map(|(gene, tracks)| {
            let y_axis = axis::bounds(
                tracks.iter().flat_map(|t| t.points.iter().map(|p| p.value)),
                cfg.margin,
                false,
            );
            ReplicateGeneModel {
                gene,
                tracks: tracks
                    .iter()
                    .enumerate()
                    .map(|(r, t)| ReplicateTrackModel {
                        name: t.name.clone(),
                        color: cfg.palette.series_color(r).to_string(),
                        points: t.points.iter().map(|p| (p.condition, p.value)).collect(),
                    })
                    .collect(),
                y_axis,
            }
        })
        .collect();
    ReplicateModel {
        conditions: derived.conditions.clone(),
        genes,
    }
}

fn build_table(dataset: &AlignedDataset) -> TableModel {
    let layout = &dataset.layout;
    let mut value_columns = vec![String::new(); layout.samples().len()];
    for g in layout.groups() {
        for (r, &col) in g.columns.iter().enumerate() {
            value_columns[col] = if g.columns.len() > 1 {
                format!("{} ({})", g.name, r + 1)
            } else {
                g.name.clone()
            };
        }
    }
    let width = dataset.annotation_columns.len();
    TableModel {
        id_column: dataset.id_column.clone(),
        value_columns,
        annotation_columns: dataset.annotation_columns.clone(),
        rows: dataset
            .genes
            .iter()
            .enumerate()
            .map(|(gene, g)| TableRowModel {
                gene,
                values: g.values.clone(),
                annotation: g
                    .annotation
                    .clone()
                    .unwrap_or_else(|| vec![String::new(); width]),
            })
            .collect(),
    }
}

use crate::core::align::{AlignedDataset, SampleLayout};
use crate::core::error::{AtlasError, Result};
use crate::core::model::{BarStat, DEFAULT_LOG_EPSILON, LineScale, mean};

mod bar;
mod heatmap;
mod line;
mod replicates;

pub use bar::{BarSeries, BarValue};
pub use heatmap::{HeatCell, HeatmapRow, HeatmapSeries};
pub use line::LineSeries;
pub use replicates::{ReplicatePoint, ReplicateTrack};

#[derive(Clone, Debug)]
pub struct StatsConfig {
    pub line_scale: LineScale,
    pub log_epsilon: f64,
    pub bar_stat: BarStat,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            line_scale: LineScale::Raw,
            log_epsilon: DEFAULT_LOG_EPSILON,
            bar_stat: BarStat::Mean,
        }
    }
}

/// Everything the chart builder needs, computed from one aligned dataset.
#[derive(Clone, Debug)]
pub struct DerivedSeries {
    pub genes: Vec<String>,
    pub conditions: Vec<String>,
    /// Gene × condition mean of the present replicate values.
    pub condition_means: Vec<Vec<Option<f64>>>,
    pub line: LineSeries,
    pub bar: BarSeries,
    pub heatmap: HeatmapSeries,
    /// Per gene, one track per replicate index.
    pub replicates: Vec<Vec<ReplicateTrack>>,
}

pub fn derive(dataset: &AlignedDataset, cfg: &StatsConfig) -> Result<DerivedSeries> {
    if let Some(g) = dataset
        .genes
        .iter()
        .find(|g| g.values.iter().all(Option::is_none))
    {
        return Err(AtlasError::DegenerateInput { gene: g.id.clone() });
    }
    let reference = match &cfg.bar_stat {
        BarStat::Reference(name) => Some(dataset.layout.require_group(name)?),
        _ => None,
    };

    let layout = &dataset.layout;
    let rows = dataset
        .genes
        .iter()
        .map(|g| g.values.clone())
        .collect::<Vec<_>>();
    let condition_means = rows
        .iter()
        .map(|row| condition_means(row, layout))
        .collect::<Vec<_>>();

    Ok(DerivedSeries {
        genes: dataset.genes.iter().map(|g| g.id.clone()).collect(),
        conditions: layout.group_names(),
        line: line::build(&condition_means, cfg.line_scale, cfg.log_epsilon),
        bar: bar::build(&rows, &condition_means, &cfg.bar_stat, reference),
        heatmap: heatmap::build(&condition_means),
        replicates: rows.iter().map(|r| replicates::build(r, layout)).collect(),
        condition_means,
    })
}

fn condition_means(row: &[Option<f64>], layout: &SampleLayout) -> Vec<Option<f64>> {
    layout
        .groups()
        .iter()
        .map(|g| {
            let present = g
                .columns
                .iter()
                .filter_map(|&c| row.get(c).copied().flatten())
                .collect::<Vec<_>>();
            mean(&present)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::align::align;
    use crate::core::genes::GeneSelection;
    use crate::core::matrix::{self, LoadOptions};

    fn dataset(text: &str, genes: &[&str]) -> AlignedDataset {
        let m = matrix::parse(text.as_bytes(), &LoadOptions::default()).unwrap();
        align(&m, &GeneSelection::from_ids(genes), None)
            .unwrap()
            .dataset
    }

    #[test]
    fn replicates_are_averaged_per_condition() {
        let ds = dataset(
            "gene\tA\tA\tB\nG1\t1\t3\t10\nG2\tNA\t4\tNA\n",
            &["G1", "G2"],
        );
        let d = derive(&ds, &StatsConfig::default()).unwrap();
        assert_eq!(d.conditions, vec!["A", "B"]);
        assert_eq!(d.condition_means[0], vec![Some(2.0), Some(10.0)]);
        assert_eq!(d.condition_means[1], vec![Some(4.0), None]);
        assert_eq!(d.line.rows[1], vec![Some(4.0), None]);
        assert!(d.heatmap.rows[1].zero_variance);
        assert_eq!(d.replicates[0].len(), 2);
    }

    #[test]
    fn all_missing_row_is_degenerate() {
        let ds = dataset("gene\tS1\tS2\nG1\t1\t2\nG2\tNA\tNA\n", &["G1", "G2"]);
        let err = derive(&ds, &StatsConfig::default()).unwrap_err();
        assert!(matches!(err, AtlasError::DegenerateInput { gene } if gene == "G2"));
    }

    #[test]
    fn unknown_reference_condition() {
        let ds = dataset("gene\tS1\tS2\nG1\t1\t2\n", &["G1"]);
        let cfg = StatsConfig {
            bar_stat: BarStat::Reference("S3".to_string()),
            ..StatsConfig::default()
        };
        assert!(matches!(
            derive(&ds, &cfg).unwrap_err(),
            AtlasError::UnknownSample { .. }
        ));
    }

    #[test]
    fn derivation_does_not_touch_the_dataset() {
        let ds = dataset("gene\tS1\tS2\nG1\t1\t1\n", &["G1"]);
        let before = ds.genes[0].values.clone();
        let d = derive(&ds, &StatsConfig::default()).unwrap();
        assert_eq!(ds.genes[0].values, before);
        assert_eq!(d.heatmap.rows[0].cells[0].z, crate::core::model::NEUTRAL_Z);
    }
}

use crate::core::model::{NEUTRAL_Z, ZERO_VARIANCE_SD, mean, sample_sd};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeatCell {
    /// Z-score, or `NEUTRAL_Z` when undefined.
    pub z: f64,
    /// Condition mean the z-score was computed from.
    pub raw: Option<f64>,
    /// `z` is a substituted neutral value rather than a computed score.
    pub neutral: bool,
}

#[derive(Clone, Debug)]
pub struct HeatmapRow {
    pub cells: Vec<HeatCell>,
    pub zero_variance: bool,
}

#[derive(Clone, Debug)]
pub struct HeatmapSeries {
    pub rows: Vec<HeatmapRow>,
}

impl HeatmapSeries {
    pub fn zero_variance_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.zero_variance).count()
    }

    /// Largest |z| among computed cells.
    pub fn max_abs_z(&self) -> Option<f64> {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter(|c| !c.neutral)
            .map(|c| c.z.abs())
            .reduce(f64::max)
    }
}

pub fn build(condition_means: &[Vec<Option<f64>>]) -> HeatmapSeries {
    HeatmapSeries {
        rows: condition_means.iter().map(|row| zscore_row(row)).collect(),
    }
}

/// Row-wise z-score over present values. Rows whose spread is zero (or that
/// have fewer than two present values) become all-neutral.
fn zscore_row(row: &[Option<f64>]) -> HeatmapRow {
    let present = row.iter().flatten().copied().collect::<Vec<_>>();
    let stats = match (mean(&present), sample_sd(&present)) {
        (Some(m), Some(sd)) if sd > ZERO_VARIANCE_SD => Some((m, sd)),
        _ => None,
    };
    let cells = row
        .iter()
        .map(|&raw| match (raw, stats) {
            (Some(v), Some((m, sd))) => HeatCell {
                z: (v - m) / sd,
                raw,
                neutral: false,
            },
            _ => HeatCell {
                z: NEUTRAL_Z,
                raw,
                neutral: true,
            },
        })
        .collect();
    HeatmapRow {
        cells,
        zero_variance: stats.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zscores_center_and_scale_rows() {
        let s = build(&[vec![Some(1.0), Some(2.0), Some(3.0)]]);
        let z = s.rows[0].cells.iter().map(|c| c.z).collect::<Vec<_>>();
        assert_eq!(z, vec![-1.0, 0.0, 1.0]);
        assert!(!s.rows[0].zero_variance);
        assert_eq!(s.max_abs_z(), Some(1.0));
    }

    #[test]
    fn zero_variance_rows_are_neutral_not_nan() {
        let s = build(&[vec![Some(5.0), Some(5.0)], vec![Some(0.0), None]]);
        for row in &s.rows {
            assert!(row.zero_variance);
            for c in &row.cells {
                assert_eq!(c.z, NEUTRAL_Z);
                assert!(c.neutral);
                assert!(!c.z.is_nan());
            }
        }
        assert_eq!(s.zero_variance_rows(), 2);
        assert_eq!(s.max_abs_z(), None);
    }

    #[test]
    fn missing_cells_are_neutral_within_scored_rows() {
        let s = build(&[vec![Some(1.0), None, Some(3.0)]]);
        let cells = &s.rows[0].cells;
        assert!(!s.rows[0].zero_variance);
        assert!(cells[1].neutral);
        assert_eq!(cells[1].raw, None);
        assert!((cells[0].z + std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }
}

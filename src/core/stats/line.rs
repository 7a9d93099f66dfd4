use crate::core::model::LineScale;

/// Per-gene values across conditions, ready for a line plot.
#[derive(Clone, Debug)]
pub struct LineSeries {
    pub scale: LineScale,
    pub epsilon: f64,
    pub rows: Vec<Vec<Option<f64>>>,
}

pub fn build(condition_means: &[Vec<Option<f64>>], scale: LineScale, epsilon: f64) -> LineSeries {
    let rows = condition_means
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| v.map(|x| transform(x, scale, epsilon)))
                .collect()
        })
        .collect();
    LineSeries {
        scale,
        epsilon,
        rows,
    }
}

fn transform(x: f64, scale: LineScale, epsilon: f64) -> f64 {
    match scale {
        LineScale::Raw => x,
        LineScale::Log10 => (x + epsilon).log10(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_scale_handles_zero_and_keeps_gaps() {
        let means = vec![vec![Some(0.0), None, Some(99.99)]];
        let s = build(&means, LineScale::Log10, 0.01);
        assert!((s.rows[0][0].unwrap() + 2.0).abs() < 1e-12);
        assert_eq!(s.rows[0][1], None);
        assert!((s.rows[0][2].unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn raw_scale_is_identity() {
        let means = vec![vec![Some(3.5), Some(0.0)]];
        let s = build(&means, LineScale::Raw, 0.01);
        assert_eq!(s.rows, means);
    }
}

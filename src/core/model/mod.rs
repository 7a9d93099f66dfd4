use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

impl Status {
    pub fn as_str_lower(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
        }
    }

    pub fn as_str_upper(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineScale {
    Raw,
    Log10,
}

impl LineScale {
    pub fn axis_label(self) -> &'static str {
        match self {
            LineScale::Raw => "Expression",
            LineScale::Log10 => "log10(expression + ε)",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "sample")]
pub enum BarStat {
    Mean,
    Median,
    /// Condition mean of one named condition.
    Reference(String),
}

impl BarStat {
    pub fn label(&self) -> String {
        match self {
            BarStat::Mean => "Mean expression".to_string(),
            BarStat::Median => "Median expression".to_string(),
            BarStat::Reference(name) => format!("Expression in {}", name),
        }
    }
}

/// Z-score placeholder for heatmap cells without a defined statistic.
pub const NEUTRAL_Z: f64 = 0.0;

pub const DEFAULT_LOG_EPSILON: f64 = 0.01;

/// Standard deviations below this are treated as zero variance.
pub const ZERO_VARIANCE_SD: f64 = 1e-12;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some((v[mid - 1] + v[mid]) / 2.0)
    } else {
        Some(v[mid])
    }
}

/// Sample standard deviation (n - 1). `None` for fewer than two values.
pub fn sample_sd(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_statistics() {
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        let sd = sample_sd(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138089935299395).abs() < 1e-12);
        assert_eq!(sample_sd(&[3.0]), None);
    }

    #[test]
    fn bar_stat_labels() {
        assert_eq!(BarStat::Mean.label(), "Mean expression");
        assert_eq!(
            BarStat::Reference("liver".to_string()).label(),
            "Expression in liver"
        );
    }
}

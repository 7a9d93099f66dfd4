use serde::Serialize;

/// Fraction of the data span added on each side of a numeric axis.
pub const AXIS_MARGIN: f64 = 0.05;

/// Smallest pad used when every value is identical.
const FLAT_PAD: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Observed min/max expanded by `margin` of the span. With `zero_baseline`
/// the domain always contains 0 and is not padded past it.
pub fn bounds<I>(values: I, margin: f64, zero_baseline: bool) -> AxisBounds
where
    I: IntoIterator<Item = f64>,
{
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for v in values.into_iter().filter(|v| v.is_finite()) {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if !min_v.is_finite() || !max_v.is_finite() {
        return AxisBounds { min: 0.0, max: 1.0 };
    }
    if zero_baseline {
        min_v = min_v.min(0.0);
        max_v = max_v.max(0.0);
    }
    let span = max_v - min_v;
    let pad = if span > 0.0 {
        span * margin
    } else {
        (max_v.abs() * margin).max(FLAT_PAD)
    };
    let mut lo = min_v - pad;
    let mut hi = max_v + pad;
    if zero_baseline {
        if min_v == 0.0 {
            lo = 0.0;
        }
        if max_v == 0.0 && min_v < 0.0 {
            hi = 0.0;
        }
    }
    AxisBounds { min: lo, max: hi }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_observed_range() {
        let b = bounds([2.0, 12.0], AXIS_MARGIN, false);
        assert_eq!(b, AxisBounds { min: 1.5, max: 12.5 });
    }

    #[test]
    fn flat_data_gets_minimum_pad() {
        let b = bounds([3.0, 3.0], AXIS_MARGIN, false);
        assert_eq!(b, AxisBounds { min: 2.5, max: 3.5 });
    }

    #[test]
    fn zero_baseline_for_bars() {
        let b = bounds([4.0, 10.0], AXIS_MARGIN, true);
        assert_eq!(b.min, 0.0);
        assert_eq!(b.max, 10.5);
        let b = bounds([0.0], AXIS_MARGIN, true);
        assert_eq!(b, AxisBounds { min: 0.0, max: 0.5 });
    }

    #[test]
    fn no_values_gives_unit_range() {
        let b = bounds(std::iter::empty(), AXIS_MARGIN, false);
        assert_eq!(b, AxisBounds { min: 0.0, max: 1.0 });
        let b = bounds([f64::NAN], AXIS_MARGIN, false);
        assert_eq!(b, AxisBounds { min: 0.0, max: 1.0 });
    }
}

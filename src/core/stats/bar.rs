use crate::core::model::{BarStat, mean, median};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarValue {
    pub value: f64,
    /// No value was available; `value` holds 0.0.
    pub missing: bool,
}

/// One aggregate per gene, in gene order, plus the descending-value ranking.
#[derive(Clone, Debug)]
pub struct BarSeries {
    pub stat: BarStat,
    pub values: Vec<BarValue>,
    /// Gene indices ordered by descending value; ties keep gene order and
    /// missing bars come last.
    pub rank: Vec<usize>,
}

/// `reference` is the condition index when `stat` is `BarStat::Reference`.
pub fn build(
    rows: &[Vec<Option<f64>>],
    condition_means: &[Vec<Option<f64>>],
    stat: &BarStat,
    reference: Option<usize>,
) -> BarSeries {
    let values = rows
        .iter()
        .zip(condition_means)
        .map(|(row, means)| {
            let present = row.iter().flatten().copied().collect::<Vec<_>>();
            let v = match stat {
                BarStat::Mean => mean(&present),
                BarStat::Median => median(&present),
                BarStat::Reference(_) => reference.and_then(|i| means.get(i).copied().flatten()),
            };
            match v {
                Some(value) => BarValue {
                    value,
                    missing: false,
                },
                None => BarValue {
                    value: 0.0,
                    missing: true,
                },
            }
        })
        .collect::<Vec<_>>();
    let rank = rank_desc(&values);
    BarSeries {
        stat: stat.clone(),
        values,
        rank,
    }
}

fn rank_desc(values: &[BarValue]) -> Vec<usize> {
    let mut idx = (0..values.len()).collect::<Vec<_>>();
    // sort_by is stable, so equal values keep gene order.
    idx.sort_by(|&a, &b| {
        let (va, vb) = (&values[a], &values[b]);
        va.missing
            .cmp(&vb.missing)
            .then_with(|| vb.value.total_cmp(&va.value))
    });
    idx
}

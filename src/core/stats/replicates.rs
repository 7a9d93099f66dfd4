use crate::core::align::SampleLayout;

#[derive(Clone, Debug, PartialEq)]
pub struct ReplicatePoint {
    pub condition: usize,
    pub column: usize,
    pub value: f64,
}

/// The r-th replicate of every condition that has one, for one gene.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicateTrack {
    pub name: String,
    pub points: Vec<ReplicatePoint>,
}

pub fn build(values: &[Option<f64>], layout: &SampleLayout) -> Vec<ReplicateTrack> {
    (0..layout.max_replicates())
        .filter_map(|r| {
            let points = layout
                .groups()
                .iter()
                .enumerate()
                .filter_map(|(ci, g)| {
                    let col = *g.columns.get(r)?;
                    let value = values.get(col).copied().flatten()?;
                    Some(ReplicatePoint {
                        condition: ci,
                        column: col,
                        value,
                    })
                })
                .collect::<Vec<_>>();
            if points.is_empty() {
                None
            } else {
                Some(ReplicateTrack {
                    name: format!("Rep {}", r + 1),
                    points,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_follow_replicate_index() {
        let names = ["A", "A", "B", "C", "C"].map(String::from);
        let layout = SampleLayout::from_samples(&names);
        let values = vec![Some(1.0), Some(2.0), Some(3.0), None, Some(5.0)];
        let tracks = build(&values, &layout);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name, "Rep 1");
        let rep1 = tracks[0]
            .points
            .iter()
            .map(|p| (p.condition, p.value))
            .collect::<Vec<_>>();
        assert_eq!(rep1, vec![(0, 1.0), (1, 3.0)]);
        let rep2 = tracks[1]
            .points
            .iter()
            .map(|p| (p.condition, p.column))
            .collect::<Vec<_>>();
        assert_eq!(rep2, vec![(0, 1), (2, 4)]);
    }
}

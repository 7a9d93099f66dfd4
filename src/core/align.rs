use crate::core::annotation::AnnotationTable;
use crate::core::error::{AtlasError, Result};
use crate::core::genes::GeneSelection;
use crate::core::matrix::ExpressionMatrix;

/// Replicate columns sharing one header name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleGroup {
    pub name: String,
    pub columns: Vec<usize>,
}

/// Sample columns in matrix order plus their grouping into conditions, in
/// first-appearance order.
#[derive(Clone, Debug)]
pub struct SampleLayout {
    samples: Vec<String>,
    groups: Vec<SampleGroup>,
}

impl SampleLayout {
    pub fn from_samples(samples: &[String]) -> Self {
        let mut groups: Vec<SampleGroup> = Vec::new();
        for (i, s) in samples.iter().enumerate() {
            match groups.iter_mut().find(|g| &g.name == s) {
                Some(g) => g.columns.push(i),
                None => groups.push(SampleGroup {
                    name: s.clone(),
                    columns: vec![i],
                }),
            }
        }
        Self {
            samples: samples.to_vec(),
            groups,
        }
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn groups(&self) -> &[SampleGroup] {
        &self.groups
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    pub fn require_group(&self, name: &str) -> Result<usize> {
        self.group_index(name).ok_or_else(|| AtlasError::UnknownSample {
            name: name.to_string(),
        })
    }

    pub fn max_replicates(&self) -> usize {
        self.groups.iter().map(|g| g.columns.len()).max().unwrap_or(0)
    }

    pub fn has_replicates(&self) -> bool {
        self.max_replicates() > 1
    }
}

#[derive(Clone, Debug)]
pub struct AlignedGene {
    pub id: String,
    /// One cell per matrix sample column, matrix order.
    pub values: Vec<Option<f64>>,
    /// Attribute values in `AlignedDataset::annotation_columns` order.
    pub annotation: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct AlignedDataset {
    pub id_column: String,
    pub layout: SampleLayout,
    pub genes: Vec<AlignedGene>,
    pub annotation_columns: Vec<String>,
    pub display_column: Option<usize>,
}

impl AlignedDataset {
    pub fn gene_ids(&self) -> Vec<&str> {
        self.genes.iter().map(|g| g.id.as_str()).collect()
    }

    pub fn annotated_genes(&self) -> usize {
        self.genes.iter().filter(|g| g.annotation.is_some()).count()
    }
}

#[derive(Clone, Debug)]
pub struct Alignment {
    pub dataset: AlignedDataset,
    /// Requested ids absent from the matrix, in request order.
    pub unmatched: Vec<String>,
}

pub fn align(
    matrix: &ExpressionMatrix,
    selection: &GeneSelection,
    annotation: Option<&AnnotationTable>,
) -> Result<Alignment> {
    let mut genes = Vec::with_capacity(selection.len());
    let mut unmatched = Vec::new();
    for id in selection.ids() {
        match matrix.gene_index(id) {
            Some(idx) => genes.push(AlignedGene {
                id: id.clone(),
                values: matrix.row(idx).to_vec(),
                annotation: annotation.and_then(|a| a.get(id)).map(<[String]>::to_vec),
            }),
            None => unmatched.push(id.clone()),
        }
    }
    if genes.is_empty() {
        return Err(AtlasError::NoGenesMatched {
            requested: selection.len(),
        });
    }
    let dataset = AlignedDataset {
        id_column: matrix.id_column_name().to_string(),
        layout: SampleLayout::from_samples(matrix.samples()),
        genes,
        annotation_columns: annotation
            .map(|a| a.columns().to_vec())
            .unwrap_or_default(),
        display_column: annotation.and_then(AnnotationTable::display_column),
    };
    Ok(Alignment { dataset, unmatched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{annotation, matrix};

    fn matrix() -> ExpressionMatrix {
        matrix::parse(
            b"gene\tS1\tS2\nG1\t1\t2\nG2\t3\t4\nG3\t5\t6\n",
            &matrix::LoadOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn rows_follow_selection_order() {
        let sel = GeneSelection::from_ids(["G3", "G1"]);
        let a = align(&matrix(), &sel, None).unwrap();
        assert_eq!(a.dataset.gene_ids(), vec!["G3", "G1"]);
        assert!(a.unmatched.is_empty());
        assert_eq!(a.dataset.genes[0].values, vec![Some(5.0), Some(6.0)]);
        assert_eq!(a.dataset.layout.samples(), &["S1", "S2"]);
    }

    #[test]
    fn unmatched_genes_are_reported() {
        let sel = GeneSelection::from_ids(["G1", "G9"]);
        let a = align(&matrix(), &sel, None).unwrap();
        assert_eq!(a.dataset.gene_ids(), vec!["G1"]);
        assert_eq!(a.unmatched, vec!["G9".to_string()]);
    }

    #[test]
    fn no_match_is_an_error() {
        let sel = GeneSelection::from_ids(["G9"]);
        let err = align(&matrix(), &sel, None).unwrap_err();
        assert!(matches!(err, AtlasError::NoGenesMatched { requested: 1 }));
    }

    #[test]
    fn partial_annotation_never_drops_genes() {
        let ann = annotation::parse(b"gene_id\tsymbol\nG2\tBRCA1\n", None).unwrap();
        let sel = GeneSelection::from_ids(["G1", "G2", "G3"]);
        let a = align(&matrix(), &sel, Some(&ann)).unwrap();
        assert_eq!(a.dataset.gene_ids(), vec!["G1", "G2", "G3"]);
        assert_eq!(a.dataset.genes[0].annotation, None);
        assert_eq!(
            a.dataset.genes[1].annotation,
            Some(vec!["BRCA1".to_string()])
        );
        assert_eq!(a.dataset.annotated_genes(), 1);
        assert_eq!(a.dataset.display_column, Some(0));
    }

    #[test]
    fn replicate_columns_group_by_name() {
        let names = ["liver", "brain", "liver", "heart"].map(String::from);
        let layout = SampleLayout::from_samples(&names);
        assert_eq!(layout.group_names(), vec!["liver", "brain", "heart"]);
        assert_eq!(layout.groups()[0].columns, vec![0, 2]);
        assert_eq!(layout.max_replicates(), 2);
        assert!(layout.has_replicates());
        assert_eq!(layout.require_group("brain").unwrap(), 1);
        assert!(matches!(
            layout.require_group("lung").unwrap_err(),
            AtlasError::UnknownSample { .. }
        ));
    }
}

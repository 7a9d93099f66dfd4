use crate::core::align::AlignedDataset;
use crate::core::error::{AtlasError, Result};
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Tab-separated export of the aligned raw values in selection order.
///
/// Values use the shortest representation that parses back to the same
/// `f64`, so without annotation columns the file loads back as an identical
/// matrix. Annotation columns, when present, follow the sample columns.
pub fn render(dataset: &AlignedDataset, missing_token: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", clean(&dataset.id_column))?;
    for s in dataset.layout.samples() {
        write!(out, "\t{}", clean(s))?;
    }
    for a in &dataset.annotation_columns {
        write!(out, "\t{}", clean(a))?;
    }
    writeln!(out)?;

    let width = dataset.annotation_columns.len();
    for g in &dataset.genes {
        write!(out, "{}", clean(&g.id))?;
        for v in &g.values {
            match v {
                Some(v) => write!(out, "\t{}", v)?,
                None => write!(out, "\t{}", missing_token)?,
            }
        }
        match &g.annotation {
            Some(attrs) => {
                for a in attrs {
                    write!(out, "\t{}", clean(a))?;
                }
            }
            None => {
                for _ in 0..width {
                    out.push('\t');
                }
            }
        }
        writeln!(out)?;
    }
    Ok(out)
}

pub fn write(path: &Path, dataset: &AlignedDataset, missing_token: &str) -> Result<()> {
    let text = render(dataset, missing_token)?;
    let file = File::create(path).map_err(|e| AtlasError::io(path, e))?;
    let mut w = BufWriter::new(file);
    w.write_all(text.as_bytes())
        .and_then(|_| w.flush())
        .map_err(|e| AtlasError::io(path, e))
}

fn clean(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::align::align;
    use crate::core::annotation;
    use crate::core::genes::GeneSelection;
    use crate::core::matrix::{self, LoadOptions};

    const MATRIX: &str = "gene\tA\tA\tB\nG1\t0.1\t3\tNA\nG2\t1e-7\t123456.789\t0\nG3\t2\t2\t2\n";

    #[test]
    fn export_loads_back_to_the_same_values() {
        let opts = LoadOptions::default();
        let m = matrix::parse(MATRIX.as_bytes(), &opts).unwrap();
        let a = align(&m, &GeneSelection::from_ids(["G2", "G1"]), None).unwrap();
        let text = render(&a.dataset, &opts.missing_token).unwrap();

        let back = matrix::parse(text.as_bytes(), &opts).unwrap();
        assert_eq!(back.samples(), m.samples());
        assert_eq!(back.gene_ids(), &["G2", "G1"]);
        for id in ["G1", "G2"] {
            let orig = m.row(m.gene_index(id).unwrap());
            let again = back.row(back.gene_index(id).unwrap());
            assert_eq!(orig, again);
        }
    }

    #[test]
    fn annotation_columns_follow_samples() {
        let m = matrix::parse(MATRIX.as_bytes(), &LoadOptions::default()).unwrap();
        let ann = annotation::parse(b"gene_id\tsymbol\nG1\tTP53\n", None).unwrap();
        let a = align(&m, &GeneSelection::from_ids(["G1", "G3"]), Some(&ann)).unwrap();
        let text = render(&a.dataset, "NA").unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "gene\tA\tA\tB\tsymbol");
        assert_eq!(lines[1], "G1\t0.1\t3\tNA\tTP53");
        assert_eq!(lines[2], "G3\t2\t2\t2\t");
    }

    #[test]
    fn writes_to_disk() {
        let m = matrix::parse(MATRIX.as_bytes(), &LoadOptions::default()).unwrap();
        let a = align(&m, &GeneSelection::from_ids(["G3"]), None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        write(&path, &a.dataset, "NA").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "gene\tA\tA\tB\nG3\t2\t2\t2\n"
        );
    }
}

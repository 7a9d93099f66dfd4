use crate::core::error::{AtlasError, Result};
use crate::core::io::{InputKind, InputSource};
use crate::core::table::{ColumnRole, Delimiter, Record, Records, TableSchema, header_line};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_MISSING_TOKEN: &str = "NA";

#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// `None` detects the delimiter from the header line.
    pub delimiter: Option<Delimiter>,
    pub missing_token: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            missing_token: DEFAULT_MISSING_TOKEN.to_string(),
        }
    }
}

impl LoadOptions {
    pub fn is_missing(&self, field: &str) -> bool {
        field.is_empty() || field == self.missing_token
    }
}

/// Genes × samples, row-major. Missing cells are `None`.
#[derive(Clone, Debug)]
pub struct ExpressionMatrix {
    schema: TableSchema,
    samples: Vec<String>,
    gene_ids: Vec<String>,
    values: Vec<Option<f64>>,
    index: HashMap<String, usize>,
}

impl ExpressionMatrix {
    pub fn n_genes(&self) -> usize {
        self.gene_ids.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    #[cfg(test)]
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn id_column_name(&self) -> &str {
        self.schema.id_name()
    }

    pub fn delimiter(&self) -> Delimiter {
        self.schema.delimiter
    }

    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.index.get(gene_id).copied()
    }

    pub fn row(&self, gene_idx: usize) -> &[Option<f64>] {
        let n = self.samples.len();
        &self.values[gene_idx * n..(gene_idx + 1) * n]
    }
}

pub fn load(path: &Path, opts: &LoadOptions) -> Result<(ExpressionMatrix, InputKind)> {
    let (source, kind) = InputSource::open(path)?;
    let matrix = parse(source.bytes(), opts)?;
    Ok((matrix, kind))
}

pub fn parse(bytes: &[u8], opts: &LoadOptions) -> Result<ExpressionMatrix> {
    let header = header_line(bytes).ok_or(AtlasError::EmptyInput {
        what: "expression matrix",
    })?;
    let delimiter = opts.delimiter.unwrap_or_else(|| Delimiter::detect(header));
    let mut records = Records::new(bytes, delimiter)
        .map(|r| r.map_err(|e| AtlasError::malformed_matrix(e.line, e.reason)));
    let Record {
        line: header_no,
        fields: mut names,
    } = records.next().transpose()?.ok_or(AtlasError::EmptyInput {
        what: "expression matrix",
    })?;

    let first = records.next().transpose()?.ok_or(AtlasError::EmptyInput {
        what: "expression matrix",
    })?;
    // R's write.table omits the row-name column from the header.
    if first.fields.len() == names.len() + 1 {
        names.insert(0, "gene_id".to_string());
    }

    if names.len() < 2 {
        return Err(AtlasError::malformed_matrix(
            header_no,
            "header needs a gene id column and at least one sample column",
        ));
    }
    if let Some(pos) = names.iter().skip(1).position(|n| n.is_empty()) {
        return Err(AtlasError::malformed_matrix(
            header_no,
            format!("sample column {} has an empty name", pos + 2),
        ));
    }
    let name_refs = names.iter().map(String::as_str).collect::<Vec<_>>();
    let schema = TableSchema::new(delimiter, &name_refs, 0, ColumnRole::Sample);
    let samples = schema
        .columns_with_role(ColumnRole::Sample)
        .map(|(_, n)| n.to_string())
        .collect::<Vec<_>>();

    let mut builder = MatrixBuilder::new(schema, samples);
    builder.push_row(first.line, &first.fields, opts)?;
    for record in records {
        let record = record?;
        builder.push_row(record.line, &record.fields, opts)?;
    }
    Ok(builder.finish())
}

struct MatrixBuilder {
    schema: TableSchema,
    samples: Vec<String>,
    gene_ids: Vec<String>,
    values: Vec<Option<f64>>,
    index: HashMap<String, usize>,
}

impl MatrixBuilder {
    fn new(schema: TableSchema, samples: Vec<String>) -> Self {
        Self {
            schema,
            samples,
            gene_ids: Vec::new(),
            values: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn push_row(&mut self, line_no: usize, fields: &[String], opts: &LoadOptions) -> Result<()> {
        if fields.len() != self.schema.width() {
            return Err(AtlasError::malformed_matrix(
                line_no,
                format!(
                    "expected {} fields, found {}",
                    self.schema.width(),
                    fields.len()
                ),
            ));
        }
        let gene = fields[self.schema.id_column].as_str();
        if gene.is_empty() {
            return Err(AtlasError::malformed_matrix(line_no, "empty gene id"));
        }
        if self.index.contains_key(gene) {
            return Err(AtlasError::malformed_matrix(
                line_no,
                format!("duplicate gene id '{}'", gene),
            ));
        }
        for (col, name) in self.schema.columns_with_role(ColumnRole::Sample) {
            let cell = parse_cell(&fields[col], opts).map_err(|reason| {
                AtlasError::malformed_matrix(line_no, format!("column '{}': {}", name, reason))
            })?;
            self.values.push(cell);
        }
        self.index.insert(gene.to_string(), self.gene_ids.len());
        self.gene_ids.push(gene.to_string());
        Ok(())
    }

    fn finish(self) -> ExpressionMatrix {
        ExpressionMatrix {
            schema: self.schema,
            samples: self.samples,
            gene_ids: self.gene_ids,
            values: self.values,
            index: self.index,
        }
    }
}

fn parse_cell(field: &str, opts: &LoadOptions) -> std::result::Result<Option<f64>, String> {
    if opts.is_missing(field) {
        return Ok(None);
    }
    let v: f64 = field
        .parse()
        .map_err(|_| format!("'{}' is not a number", field))?;
    if !v.is_finite() {
        return Err(format!("'{}' is not a finite value", field));
    }
    if v < 0.0 {
        return Err(format!("negative expression value {}", field));
    }
    Ok(Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(s: &str) -> Result<ExpressionMatrix> {
        parse(s.as_bytes(), &LoadOptions::default())
    }

    #[test]
    fn parses_tab_matrix_with_missing_cells() {
        let m = parse_str("gene\tS1\tS2\nG1\t1.5\tNA\nG2\t0\t\n").unwrap();
        assert_eq!(m.samples(), &["S1".to_string(), "S2".to_string()]);
        assert_eq!(m.n_genes(), 2);
        assert_eq!(m.row(0), &[Some(1.5), None]);
        assert_eq!(m.row(1), &[Some(0.0), None]);
        assert_eq!(m.gene_index("G2"), Some(1));
        assert_eq!(m.delimiter(), Delimiter::Tab);
    }

    #[test]
    fn custom_missing_token() {
        let opts = LoadOptions {
            delimiter: None,
            missing_token: "-".to_string(),
        };
        let m = parse(b"gene,S1\nG1,-\n", &opts).unwrap();
        assert_eq!(m.row(0), &[None]);
        assert!(parse_str("gene,S1\nG1,-\n").is_err());
    }

    #[test]
    fn header_without_row_name_column() {
        let m = parse_str("S1\tS2\nG1\t1\t2\n").unwrap();
        assert_eq!(m.id_column_name(), "gene_id");
        assert_eq!(m.samples().len(), 2);
        assert_eq!(m.row(0), &[Some(1.0), Some(2.0)]);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = parse_str("gene\tS1\tS2\nG1\t1\t2\nG2\t1\n").unwrap_err();
        match err {
            AtlasError::MalformedMatrix { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("expected 3 fields, found 2"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_and_negative_cells() {
        let err = parse_str("gene\tS1\nG1\tabc\n").unwrap_err();
        assert!(matches!(err, AtlasError::MalformedMatrix { line: 2, .. }));
        assert!(err.to_string().contains("column 'S1'"));
        let err = parse_str("gene\tS1\nG1\t-1\n").unwrap_err();
        assert!(err.to_string().contains("negative"));
        let err = parse_str("gene\tS1\nG1\tinf\n").unwrap_err();
        assert!(err.to_string().contains("finite"));
    }

    #[test]
    fn rejects_duplicate_gene_ids() {
        let err = parse_str("gene\tS1\nG1\t1\nG1\t2\n").unwrap_err();
        assert!(err.to_string().contains("duplicate gene id 'G1'"));
    }

    #[test]
    fn header_only_or_empty_is_empty_input() {
        assert!(matches!(
            parse_str("gene\tS1\tS2\n\n").unwrap_err(),
            AtlasError::EmptyInput { .. }
        ));
        assert!(matches!(
            parse_str("").unwrap_err(),
            AtlasError::EmptyInput { .. }
        ));
    }

    #[test]
    fn single_column_header_is_malformed() {
        let err = parse_str("gene\nG1\n").unwrap_err();
        assert!(matches!(err, AtlasError::MalformedMatrix { line: 1, .. }));
    }

    #[test]
    fn quoted_sample_names_may_contain_the_delimiter() {
        let m = parse_str("gene,\"liver, rep1\",brain\n\"G1\",1,2\n").unwrap();
        assert_eq!(m.delimiter(), Delimiter::Comma);
        assert_eq!(m.samples(), &["liver, rep1".to_string(), "brain".to_string()]);
        assert_eq!(m.row(m.gene_index("G1").unwrap()), &[Some(1.0), Some(2.0)]);
    }

    #[test]
    fn blank_rows_are_skipped() {
        let m = parse_str("gene\tS1\n\nG1\t1\n  \nG2\t2\n").unwrap();
        assert_eq!(m.n_genes(), 2);
    }

    #[test]
    fn duplicate_sample_names_are_kept_as_columns() {
        let m = parse_str("gene\tliver\tliver\tbrain\nG1\t1\t2\t3\n").unwrap();
        assert_eq!(m.n_samples(), 3);
        assert_eq!(m.samples()[1], "liver");
    }
}

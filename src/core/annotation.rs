use crate::core::error::{AtlasError, Result};
use crate::core::io::InputSource;
use crate::core::table::{ColumnRole, Delimiter, Record, Records, TableSchema, header_line};
use std::collections::HashMap;
use std::path::Path;

/// Column names that make a better display label than the bare gene id.
const DISPLAY_COLUMNS: [&str; 5] = ["symbol", "gene_symbol", "gene_name", "name", "genename"];

/// Gene metadata keyed by gene id. Attribute values follow `columns` order.
#[derive(Clone, Debug)]
pub struct AnnotationTable {
    schema: TableSchema,
    columns: Vec<String>,
    records: HashMap<String, Vec<String>>,
    duplicates: usize,
}

impl AnnotationTable {
    pub fn id_column_name(&self) -> &str {
        self.schema.id_name()
    }

    /// Attribute column names, the gene-id column excluded.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, gene_id: &str) -> Option<&[String]> {
        self.records.get(gene_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records dropped because an earlier row already annotated the same gene.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Index of the attribute column best suited as a human-readable label.
    pub fn display_column(&self) -> Option<usize> {
        DISPLAY_COLUMNS.iter().find_map(|want| {
            self.columns
                .iter()
                .position(|c| c.to_ascii_lowercase().replace([' ', '.'], "_") == *want)
        })
    }
}

pub fn load(path: &Path, delimiter: Option<Delimiter>) -> Result<AnnotationTable> {
    let (source, _) = InputSource::open(path)?;
    parse(source.bytes(), delimiter)
}

pub fn parse(bytes: &[u8], delimiter: Option<Delimiter>) -> Result<AnnotationTable> {
    let header = header_line(bytes)
        .ok_or_else(|| AtlasError::malformed_annotation(1, "annotation table is empty"))?;
    let delimiter = delimiter.unwrap_or_else(|| Delimiter::detect(header));
    let mut rows = Records::new(bytes, delimiter)
        .map(|r| r.map_err(|e| AtlasError::malformed_annotation(e.line, e.reason)));
    let names = rows
        .next()
        .transpose()?
        .ok_or_else(|| AtlasError::malformed_annotation(1, "annotation table is empty"))?
        .fields;
    let name_refs = names.iter().map(String::as_str).collect::<Vec<_>>();
    let id_column = detect_id_column(&name_refs);
    let schema = TableSchema::new(delimiter, &name_refs, id_column, ColumnRole::Attribute);
    let attr_cols = schema
        .columns_with_role(ColumnRole::Attribute)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    let columns = attr_cols
        .iter()
        .map(|&i| schema.columns[i].name.clone())
        .collect::<Vec<_>>();

    let mut records = HashMap::new();
    let mut duplicates = 0usize;
    for row in rows {
        let Record { line, fields } = row?;
        if fields.len() > schema.width() {
            return Err(AtlasError::malformed_annotation(
                line,
                format!(
                    "expected at most {} fields, found {}",
                    schema.width(),
                    fields.len()
                ),
            ));
        }
        let gene = fields.get(id_column).map(String::as_str).unwrap_or_default();
        if gene.is_empty() {
            return Err(AtlasError::malformed_annotation(
                line,
                format!("missing gene id in column '{}'", schema.id_name()),
            ));
        }
        if records.contains_key(gene) {
            duplicates += 1;
            continue;
        }
        let attrs = attr_cols
            .iter()
            .map(|&i| fields.get(i).cloned().unwrap_or_default())
            .collect::<Vec<_>>();
        records.insert(gene.to_string(), attrs);
    }

    Ok(AnnotationTable {
        schema,
        columns,
        records,
        duplicates,
    })
}

/// First header mentioning both "gene" and "id", otherwise the first column.
fn detect_id_column(names: &[&str]) -> usize {
    names
        .iter()
        .position(|n| {
            let lower = n.to_ascii_lowercase();
            lower.contains("gene") && lower.contains("id")
        })
        .unwrap_or(0)
}

use crate::chart::ReportModel;
use crate::core::error::{AtlasError, Result};
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn render(model: &ReportModel) -> Result<String> {
    let st = &model.meta.statuses;
    let file = &model.meta.matrix_file;
    let mut out = String::new();

    for (status, name) in [
        (st.genes, "Gene matching"),
        (st.annotation, "Annotation"),
        (st.line, "Expression profile"),
        (st.bar, "Expression summary"),
        (st.heatmap, "Z-score heatmap"),
        (st.replicates, "Replicates"),
        (st.table, "Expression table"),
    ] {
        writeln!(out, "{}\t{}\t{}", status.as_str_upper(), name, file)?;
    }

    writeln!(out, ">>Gene counts")?;
    writeln!(out, "Requested\t{}", model.meta.requested)?;
    writeln!(out, "Matched\t{}", model.meta.matched)?;
    writeln!(out, "Unmatched\t{}", model.unmatched.len())?;
    writeln!(out, ">>END_MODULE")?;
    if !model.unmatched.is_empty() {
        writeln!(out, ">>Unmatched genes")?;
        for id in &model.unmatched {
            writeln!(out, "{}", id)?;
        }
        writeln!(out, ">>END_MODULE")?;
    }
    Ok(out)
}

pub fn write(path: &Path, model: &ReportModel) -> Result<()> {
    let text = render(model)?;
    let file = File::create(path).map_err(|e| AtlasError::io(path, e))?;
    let mut w = BufWriter::new(file);
    w.write_all(text.as_bytes())
        .and_then(|_| w.flush())
        .map_err(|e| AtlasError::io(path, e))
}

use crate::core::error::{AtlasError, Result};
use crate::core::io::InputSource;
use crate::core::table::Lines;
use std::collections::HashSet;
use std::path::Path;

/// Requested genes in the order the user listed them, duplicates collapsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneSelection {
    ids: Vec<String>,
    duplicates: usize,
}

impl GeneSelection {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut duplicates = 0usize;
        for id in ids {
            let id = id.as_ref().trim();
            if id.is_empty() {
                continue;
            }
            if seen.insert(id.to_string()) {
                out.push(id.to_string());
            } else {
                duplicates += 1;
            }
        }
        Self {
            ids: out,
            duplicates,
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

pub fn load(path: &Path) -> Result<GeneSelection> {
    let (source, _) = InputSource::open(path)?;
    parse(source.bytes())
}

/// One id per line, or several per line. A line containing tab, comma or
/// semicolon is split on those only, so ids may keep inner spaces; any other
/// line is split on whitespace.
pub fn parse(bytes: &[u8]) -> Result<GeneSelection> {
    const SEPARATORS: [char; 3] = ['\t', ',', ';'];
    let mut tokens = Vec::new();
    for (_, line) in Lines::new(bytes) {
        let text = String::from_utf8_lossy(line);
        let clean = |t: &str| t.trim().trim_matches('"').to_string();
        if text.contains(SEPARATORS) {
            tokens.extend(text.split(SEPARATORS).map(clean));
        } else {
            tokens.extend(text.split_whitespace().map(clean));
        }
    }
    tokens.retain(|t| !t.is_empty());
    let selection = GeneSelection::from_ids(tokens);
    if selection.is_empty() {
        return Err(AtlasError::EmptyInput { what: "gene list" });
    }
    Ok(selection)
}

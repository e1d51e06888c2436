//! Dependency table loading
//!
//! Three input formats are accepted:
//!
//! - **Braced rows**, as written in C initializers. Every innermost `{...}`
//!   group is one row; everything outside the groups is ignored.
//!   ```text
//!   uint32_t deps[3][2] = {
//!       {0, 0},   // A
//!       {0, 0},   // B
//!       {1, 2},   // A + B
//!   };
//!   ```
//! - **Plain rows**: one row per non-empty line, entries separated by spaces
//!   or commas, `#` and `//` start comments. Inputs are written as `0`.
//! - **JSON**: `{"name": "fft4", "max_deps": 2, "deps": [[0, 0], [1, 2]]}`,
//!   where `name` and `max_deps` are optional.

use crate::dag::{DependencyTable, GraphError};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

lazy_static! {
    static ref BRACED_ROW: Regex = Regex::new(r"\{([^{}]*)\}").unwrap();
    static ref COMMENT: Regex = Regex::new(r"(//|#).*$").unwrap();
    static ref SEPARATOR: Regex = Regex::new(r"[\s,]+").unwrap();
}

/// Errors that can occur while reading a dependency table
#[derive(Error, Debug)]
pub enum ParseError {
    /// A row entry is not a non-negative integer
    #[error("line {line}: invalid entry '{token}'")]
    InvalidEntry { line: usize, token: String },

    /// The input holds no rows at all
    #[error("no dependency rows found")]
    NoRows,

    /// Malformed JSON table
    #[error("invalid JSON table: {0}")]
    Json(#[from] serde_json::Error),

    /// Rows do not fit the declared width
    #[error("invalid table: {0}")]
    Table(#[from] GraphError),

    /// No built-in graph with this name
    #[error("unknown graph '{0}' (known graphs: {1})")]
    UnknownGraph(String, String),

    /// I/O error when reading files
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
}

/// A dependency table together with a display name.
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub table: DependencyTable,
}

#[derive(Deserialize)]
struct TableFile {
    name: Option<String>,
    max_deps: Option<usize>,
    deps: Vec<Vec<u32>>,
}

/// Parse a table in braced or plain text form.
pub fn parse_table(text: &str) -> Result<DependencyTable, ParseError> {
    let mut rows = Vec::new();
    let mut braced = false;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = COMMENT.replace(raw, "");
        if content.contains('{') || content.contains('}') {
            braced = true;
        }
        rows.push((line, content.into_owned()));
    }

    let parsed = if braced {
        parse_braced(&rows)?
    } else {
        parse_plain(&rows)?
    };
    if parsed.is_empty() {
        return Err(ParseError::NoRows);
    }
    debug!(
        "parsed {} rows ({} format)",
        parsed.len(),
        if braced { "braced" } else { "plain" }
    );
    Ok(DependencyTable::from_rows(parsed))
}

fn parse_braced(lines: &[(usize, String)]) -> Result<Vec<Vec<u32>>, ParseError> {
    let mut rows = Vec::new();
    for (line, content) in lines {
        for group in BRACED_ROW.captures_iter(content) {
            rows.push(parse_entries(*line, &group[1])?);
        }
    }
    Ok(rows)
}

fn parse_plain(lines: &[(usize, String)]) -> Result<Vec<Vec<u32>>, ParseError> {
    lines
        .iter()
        .filter(|(_, content)| !content.trim().is_empty())
        .map(|(line, content)| parse_entries(*line, content))
        .collect()
}

fn parse_entries(line: usize, content: &str) -> Result<Vec<u32>, ParseError> {
    SEPARATOR
        .split(content.trim())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<u32>().map_err(|_| ParseError::InvalidEntry {
                line,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Parse a JSON table. Returns the declared name, if any.
pub fn parse_json(text: &str) -> Result<(Option<String>, DependencyTable), ParseError> {
    let file: TableFile = serde_json::from_str(text)?;
    if file.deps.is_empty() {
        return Err(ParseError::NoRows);
    }
    let table = match file.max_deps {
        Some(max_deps) => DependencyTable::new(max_deps, file.deps)?,
        None => DependencyTable::from_rows(file.deps),
    };
    Ok((file.name, table))
}

/// Load a table from disk, choosing the format from the file extension.
///
/// `.json` files are read as JSON, everything else as text. The table is
/// named after the JSON `name` field or, failing that, the file stem.
pub fn load_table(path: &Path) -> Result<NamedTable, ParseError> {
    let text = fs::read_to_string(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let (name, table) = parse_json(&text)?;
        Ok(NamedTable {
            name: name.unwrap_or(stem),
            table,
        })
    } else {
        Ok(NamedTable {
            name: stem,
            table: parse_table(&text)?,
        })
    }
}

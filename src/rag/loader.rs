//! Tabular document loading.
//!
//! Reads the first worksheet of a spreadsheet (or a delimited text file)
//! and turns it into a [`SourceDocument`]. The first row is the header;
//! every following row becomes a [`Row`] of `(column, value)` pairs.
//! Blank cells are dropped and rows without any value are skipped.

use crate::types::{AppError, Result, Row, SourceDocument};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// Supported input formats, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    /// xlsx, xlsm, xlsb, xls, ods
    Workbook,
    Csv,
    Tsv,
}

impl TabularFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(TabularFormat::Workbook),
            "csv" => Ok(TabularFormat::Csv),
            "tsv" => Ok(TabularFormat::Tsv),
            "" => Err(AppError::InvalidInput(format!(
                "Cannot determine file type of {} (no extension)",
                path.display()
            ))),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported file type '.{}'; expected a spreadsheet or CSV/TSV file",
                other
            ))),
        }
    }
}

/// Document id for a path: the file name without its extension.
pub fn source_id(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid file name: {}", path.display())))
}

/// Load a tabular file into a [`SourceDocument`].
///
/// # Errors
///
/// - [`AppError::NotFound`] if `path` is not an existing file.
/// - [`AppError::InvalidInput`] if the extension is unsupported or the
///   file cannot be parsed.
pub fn load_document(path: &Path) -> Result<SourceDocument> {
    if !path.is_file() {
        return Err(AppError::NotFound(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let id = source_id(path)?;
    let table = match TabularFormat::from_path(path)? {
        TabularFormat::Workbook => read_workbook(path)?,
        TabularFormat::Csv => read_delimited(path, b',')?,
        TabularFormat::Tsv => read_delimited(path, b'\t')?,
    };

    let rows = rows_from_table(table);
    tracing::debug!(source = %id, rows = rows.len(), "Loaded tabular document");

    Ok(SourceDocument { id, rows })
}

fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        AppError::InvalidInput(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::InvalidInput(format!("{} has no sheets", path.display())))?;

    let range = workbook.worksheet_range(&sheet).map_err(|e| {
        AppError::InvalidInput(format!("Failed to read sheet '{}': {}", sheet, e))
    })?;

    Ok(range
        .rows()
        .map(|cells| cells.iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AppError::InvalidInput(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut table = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            AppError::InvalidInput(format!("Malformed row in {}: {}", path.display(), e))
        })?;
        table.push(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

/// Pair the header row with every data row.
fn rows_from_table(table: Vec<Vec<String>>) -> Vec<Row> {
    let mut lines = table.into_iter();
    let header: Vec<String> = match lines.next() {
        Some(header) => header
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                if name.trim().is_empty() {
                    format!("column_{}", i + 1)
                } else {
                    name
                }
            })
            .collect(),
        None => return Vec::new(),
    };

    lines
        .map(|values| {
            let cells = values
                .into_iter()
                .enumerate()
                .filter(|(_, value)| !value.trim().is_empty())
                .map(|(i, value)| {
                    let column = header
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| format!("column_{}", i + 1));
                    (column, value)
                })
                .collect();
            Row { cells }
        })
        .filter(|row| !row.is_empty())
        .collect()
}

// src/spreadsheet.rs

use crate::error::{Error, Result};
use crate::tables::{Cell, Table};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const SHEET_NAME: &str = "Sheet1";

/// Write `table` as a single-sheet workbook.
///
/// The workbook goes to a temporary sibling first and is renamed over
/// `path`, so a failed write never leaves a half-written file behind.
/// Headers are written only when the table has any.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let write_err = |message: String| Error::SpreadsheetWrite {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_by_name_mut(SHEET_NAME)
        .ok_or_else(|| write_err(format!("new workbook has no {SHEET_NAME}")))?;

    let mut row_no: u32 = 1;
    if !table.headers.is_empty() {
        for (col, header) in table.headers.iter().enumerate() {
            sheet
                .get_cell_mut((col as u32 + 1, row_no))
                .set_value(header.as_str());
        }
        row_no += 1;
    }

    for row in &table.rows {
        for (col, cell) in row.iter().enumerate() {
            let target = sheet.get_cell_mut((col as u32 + 1, row_no));
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    target.set_value(s.as_str());
                }
                Cell::Int(n) => {
                    target.set_value_number(*n as f64);
                }
                Cell::Float(f) => {
                    target.set_value_number(*f);
                }
            }
        }
        row_no += 1;
    }

    let tmp = temp_path(path);
    let file = fs::File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    let written = umya_spreadsheet::writer::xlsx::write_writer(&book, &mut writer)
        .map_err(|e| write_err(e.to_string()))
        .and_then(|()| writer.flush().map_err(|e| Error::io(&tmp, e)));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;

    info!(path = %path.display(), rows = table.rows.len(), "Spreadsheet written");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

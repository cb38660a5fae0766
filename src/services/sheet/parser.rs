use std::io::Cursor;

use bytes::Bytes;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;

use crate::error::AppError;

/// Parsed spreadsheet: rows of stringified cells, row 0 = source header.
pub type Grid = Vec<Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
}

pub fn parse_grid(file_data: Bytes, kind: FileKind) -> Result<Grid, AppError> {
    match kind {
        FileKind::Csv => parse_csv(file_data),
        FileKind::Excel => parse_excel(file_data),
    }
}

fn parse_csv(file_data: Bytes) -> Result<Grid, AppError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(file_data));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(rows)
}

fn parse_excel(file_data: Bytes) -> Result<Grid, AppError> {
    let cursor = Cursor::new(file_data);
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| AppError::FileProcessingError(format!("Failed to open Excel file: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();
    // Only the first sheet is converted
    let sheet_name = sheet_names
        .first()
        .ok_or_else(|| AppError::FileProcessingError("No sheets found in workbook".to_string()))?;

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| AppError::FileProcessingError(format!("Failed to read worksheet: {}", e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(stringify_cell).collect())
        .collect())
}

fn stringify_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        _ => cell.to_string(),
    }
}

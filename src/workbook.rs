//! Output workbook: one worksheet per ticker, laid out like a transposed table
//! (periods across row 1, metric labels down column A).

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::error::WorkbookError;
use crate::models::MetricTable;

const MAX_SHEET_NAME_LEN: usize = 31;
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
pub const PLACEHOLDER_SHEET: &str = "Sheet1";

/// Fail early when an existing output file cannot be opened for writing
/// (typically because a spreadsheet application holds it open).
pub fn ensure_output_writable(path: &Path) -> Result<(), WorkbookError> {
    if !path.exists() {
        return Ok(());
    }
    OpenOptions::new()
        .write(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| WorkbookError::OutputLocked {
            path: path.to_path_buf(),
            source,
        })
}

/// Make a ticker usable as an Excel sheet name.
pub fn sanitize_sheet_name(name: &str) -> Result<String, WorkbookError> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim_matches('\'')
        .chars()
        .take(MAX_SHEET_NAME_LEN)
        .collect();

    // "History" is reserved by Excel
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("history") {
        return Err(WorkbookError::InvalidSheetName(name.to_string()));
    }
    Ok(cleaned)
}

pub struct ReportWorkbook {
    workbook: Workbook,
    sheet_names: Vec<String>,
    label_format: Format,
    number_format: Format,
}

impl Default for ReportWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportWorkbook {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            sheet_names: Vec::new(),
            label_format: Format::new().set_bold(),
            number_format: Format::new().set_num_format("#,##0.00"),
        }
    }

    /// Names of the sheets added so far, in order
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn is_empty(&self) -> bool {
        self.sheet_names.is_empty()
    }

    fn check_available(&self, name: &str) -> Result<(), WorkbookError> {
        if self.sheet_names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return Err(WorkbookError::DuplicateSheet(name.to_string()));
        }
        Ok(())
    }

    /// Append a sheet holding `table`. Returns the sheet name actually used.
    ///
    /// Name problems are reported before anything is added to the workbook.
    pub fn add_table_sheet(
        &mut self,
        name: &str,
        table: &MetricTable,
    ) -> Result<String, WorkbookError> {
        let sheet_name = sanitize_sheet_name(name)?;
        self.check_available(&sheet_name)?;

        let label_format = self.label_format.clone();
        let number_format = self.number_format.clone();

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet_name)?;
        write_table(worksheet, table, &label_format, &number_format)?;

        debug!(
            "Wrote sheet '{}' with {} rows x {} columns",
            sheet_name,
            table.rows.len(),
            table.columns.len()
        );
        self.sheet_names.push(sheet_name.clone());
        Ok(sheet_name)
    }

    /// A workbook needs at least one sheet; add an empty placeholder when nothing was written.
    /// Returns whether the placeholder was added.
    pub fn ensure_visible_sheet(&mut self) -> Result<bool, WorkbookError> {
        if !self.is_empty() {
            return Ok(false);
        }
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(PLACEHOLDER_SHEET)?;
        self.sheet_names.push(PLACEHOLDER_SHEET.to_string());
        info!("No ticker data written; added placeholder sheet '{}'", PLACEHOLDER_SHEET);
        Ok(true)
    }

    /// Write the workbook to `path`, replacing any previous file
    pub fn save(&mut self, path: &Path) -> Result<(), WorkbookError> {
        self.workbook.save(path)?;
        info!("Saved workbook with {} sheet(s) to {}", self.sheet_names.len(), path.display());
        Ok(())
    }
}

fn write_table(
    worksheet: &mut Worksheet,
    table: &MetricTable,
    label_format: &Format,
    number_format: &Format,
) -> Result<(), WorkbookError> {
    worksheet.set_column_width(0, 22)?;

    for (i, column) in table.columns.iter().enumerate() {
        let col = (i + 1) as u16;
        match column.parse::<i32>() {
            Ok(year) => worksheet.write_number_with_format(0, col, year, label_format)?,
            Err(_) => worksheet.write_string_with_format(0, col, column, label_format)?,
        };
        worksheet.set_column_width(col, 16)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let excel_row = (r + 1) as u32;
        worksheet.write_string_with_format(excel_row, 0, &row.label, label_format)?;
        for (c, value) in row.values.iter().enumerate() {
            if let Some(value) = value {
                worksheet.write_number_with_format(excel_row, (c + 1) as u16, *value, number_format)?;
            }
        }
    }
    Ok(())
}

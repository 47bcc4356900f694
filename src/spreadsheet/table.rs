use crate::error::RustyMergeError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use std::collections::HashMap;
use std::collections::HashSet;

/// Rows of named columns loaded from one worksheet.
///
/// Every row holds exactly one cell per column; cells missing from the sheet
/// are stored as empty cells at their position so errors can still name them.
#[derive(Clone, Debug, Default)]
pub struct SpreadsheetTable {
    columns: Vec<String>,
    indexes: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl SpreadsheetTable {
    /// Builds a table from column names and rows of cells.
    /// Rows shorter than the header are padded with empty cells.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let indexes = columns
            .iter()
            .enumerate()
            .map(|(index, column)| (column.to_owned(), index))
            .collect();
        let width = columns.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(row, mut cells)| {
                for col in cells.len()..width {
                    cells.push(empty_cell(row + 1, col));
                }
                cells.truncate(width);
                cells
            })
            .collect();
        SpreadsheetTable { columns, indexes, rows }
    }

    /// Builds a table from rows of plain text, mostly useful in tests and previews.
    pub fn from_text(columns: &[&str], rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(row, values)| {
                values
                    .iter()
                    .enumerate()
                    .map(|(col, value)| Cell::text(row + 1, col, *value))
                    .collect()
            })
            .collect();
        Self::new(columns.iter().map(|column| column.to_string()).collect(), rows)
    }

    /// Builds a table from a worksheet: the first row holds the column names.
    ///
    /// Missing header cells are named `Unnamed: <n>` and repeated names get a
    /// `.<k>` suffix, so every column name is unique.
    pub(crate) fn from_sheet(sheet: &Sheet, skip_empty_rows: bool) -> Result<Self, RustyMergeError> {
        let mut records = sheet.records().into_iter();
        let Some((_, header)) = records.next() else {
            return Err(SpreadsheetError::EmptySheet(sheet.name.to_owned()).into());
        };
        let col_lower = sheet.col_lower_bound.unwrap_or_default();

        let mut seen = HashSet::<String>::new();
        let mut columns = Vec::with_capacity(header.len());
        for (position, cell) in header.iter().enumerate() {
            let name = match cell {
                Some(cell) if !cell.is_empty() => cell.to_text()?,
                _ => format!("Unnamed: {position}"),
            };
            let name = unique_name(&seen, name);
            seen.insert(name.to_owned());
            columns.push(name);
        }

        let mut rows = Vec::new();
        for (row, record) in records {
            if skip_empty_rows && record.iter().all(|cell| cell.map(Cell::is_empty).unwrap_or(true)) {
                continue;
            }
            let cells = record
                .iter()
                .enumerate()
                .map(|(offset, cell)| match cell {
                    Some(cell) => (*cell).clone(),
                    None => empty_cell(row, col_lower + offset),
                })
                .collect();
            rows.push(cells);
        }

        let indexes = columns
            .iter()
            .enumerate()
            .map(|(index, column)| (column.to_owned(), index))
            .collect();
        Ok(SpreadsheetTable { columns, indexes, rows })
    }

    /// Column names in sheet order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the cell of a row (0-based) under a column name
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = *self.indexes.get(column)?;
        self.rows.get(row).and_then(|cells| cells.get(col))
    }

    /// Returns the text form of a cell, `None` when the row or column does not exist
    pub fn text(&self, row: usize, column: &str) -> Result<Option<String>, RustyMergeError> {
        self.cell(row, column).map(Cell::to_text).transpose()
    }
}

fn empty_cell(row: usize, col: usize) -> Cell {
    Cell {
        row,
        col,
        kind: CellType::Empty,
        value: String::new(),
    }
}

/// Appends `.1`, `.2`, ... to a name until it no longer collides.
fn unique_name(seen: &HashSet<String>, name: String) -> String {
    if !seen.contains(&name) {
        return name;
    }
    (1..)
        .map(|suffix| format!("{name}.{suffix}"))
        .find(|candidate| !seen.contains(candidate))
        .unwrap_or(name)
}

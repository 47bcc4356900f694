use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;

/// Represents a sheet from a spreadsheet file as a sparse list of cells in reading order.
#[derive(Debug)]
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells in the sheet, ordered by row then column
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    /// Creates a new, empty sheet.
    pub(crate) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell to the sheet, updating the data range.
    pub(crate) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    /// Updates the actual data range boundaries based on cell positions.
    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|row_lower_bound| row < row_lower_bound).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|row_upper_bound| row_upper_bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|col_lower_bound| col < col_lower_bound).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Replaces shared string indexes with the strings they reference.
    /// Indexes outside the table resolve to an empty cell.
    pub(crate) fn resolve_shared_strings(&mut self, shared_strings: &[String]) {
        for cell in self.cells.iter_mut().filter(|cell| cell.kind == CellType::SharedString) {
            match cell.value.parse::<usize>().ok().and_then(|index| shared_strings.get(index)) {
                Some(string) => {
                    cell.kind = CellType::InlineString;
                    cell.value = string.to_owned();
                }
                None => {
                    cell.kind = CellType::Empty;
                    cell.value.clear();
                }
            }
        }
    }

    /// Groups the cells into dense records spanning the column range, one per row
    /// between the lower and upper row bound. Missing cells are `None`.
    pub(crate) fn records(&self) -> Vec<(usize, Vec<Option<&Cell>>)> {
        let (Some(row_lower), Some(row_upper), Some(col_lower), Some(col_upper)) = (
            self.row_lower_bound,
            self.row_upper_bound,
            self.col_lower_bound,
            self.col_upper_bound,
        ) else {
            return Vec::new();
        };

        let width = col_upper - col_lower + 1;
        let mut records: Vec<(usize, Vec<Option<&Cell>>)> = (row_lower..=row_upper)
            .map(|row| (row, vec![None; width]))
            .collect();
        for cell in &self.cells {
            records[cell.row - row_lower].1[cell.col - col_lower] = Some(cell);
        }
        records
    }
}

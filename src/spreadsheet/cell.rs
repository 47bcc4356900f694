use crate::error::RustyMergeError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::Duration;
use chrono::NaiveDate;
use iso8601_duration::Duration as IsoDuration;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// ISO 8601 duration strings
    IsoDuration,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }
}

/// Represents a single cell in a spreadsheet with position, type, and value.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Cell data type
    pub kind: CellType,
    /// Raw cell value as stored in the file
    pub value: String,
}

impl Cell {
    /// Creates a text cell, mostly useful for building tables by hand.
    pub fn text(row: usize, col: usize, value: impl Into<String>) -> Self {
        Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.into(),
        }
    }

    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Returns true if the cell carries no value.
    pub fn is_empty(&self) -> bool {
        self.kind == CellType::Empty || self.value.is_empty()
    }

    /// Coerces the cell value to the text substituted into documents and filenames.
    ///
    /// Numbers without a fractional part are printed as integers, dates as
    /// `YYYY-MM-DD`, date-times as `YYYY-MM-DD HH:MM:SS` and times as `HH:MM:SS`.
    /// Error cells (`#DIV/0!`, `#N/A`, ...) cannot be coerced.
    pub fn to_text(&self) -> Result<String, RustyMergeError> {
        let text = match self.kind {
            CellType::Empty => Some(String::new()),
            CellType::Boolean => Some(if self.value == "1" || self.value.eq_ignore_ascii_case("true") { "true" } else { "false" }.to_owned()),
            CellType::Number => to_number_string(&self.value),
            CellType::NumberDateTime1900 => to_datetime_string(&self.value, false),
            CellType::NumberDate1900 => to_date_string(&self.value, false),
            CellType::NumberDateTime1904 => to_datetime_string(&self.value, true),
            CellType::NumberDate1904 => to_date_string(&self.value, true),
            CellType::NumberTime1900 | CellType::NumberTime1904 => to_time_string(&self.value),
            CellType::IsoDateTime => Some(self.value.replace('T', " ")),
            CellType::IsoDuration => to_duration_string(&self.value),
            CellType::InlineString | CellType::SharedString => Some(self.value.to_owned()),
            CellType::Error => None,
        };
        text.ok_or_else(|| self.value_error())
    }

    fn value_error(&self) -> RustyMergeError {
        SpreadsheetError::CellValueError(self.reference(), self.value.to_owned()).into()
    }
}

/// Parses a stored number, rejecting NaN and infinities.
fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|number| number.is_finite())
}

/// Day zero of the serial date numbers from 1900-03-01 on
fn date_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Prints a stored number the way a user typed it: integral values without a decimal point.
fn to_number_string(value: &str) -> Option<String> {
    let number = parse_number(value)?;
    if number.fract() == 0.0 && number.abs() < 1e15 {
        Some((number as i64).to_string())
    } else {
        Some(number.to_string())
    }
}

/// Converts Excel numeric date to ISO date string.
/// Handles Lotus 1-2-3 leap year bug for 1900 epoch.
/// Serial numbers beyond the calendar range yield `None`.
fn to_date_string(value: &str, is_1904: bool) -> Option<String> {
    let days = parse_number(value)?.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let duration = Duration::try_days(days.checked_add(offset)?)?;
    let date = date_epoch()?.checked_add_signed(duration)?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Converts Excel numeric time (fraction of a day) to ISO time string.
fn to_time_string(value: &str) -> Option<String> {
    let factor = parse_number(value)?.fract();
    let mut total = (factor * 86_400_000f64).round() as i64;
    let milliseconds = total % 1_000;
    total /= 1_000;
    let seconds = total % 60;
    total /= 60;
    let minutes = total % 60;
    let hours = total / 60;
    let timestamp = if milliseconds > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };
    Some(timestamp)
}

/// Converts Excel numeric datetime to ISO datetime string.
fn to_datetime_string(value: &str, is_1904: bool) -> Option<String> {
    let date = to_date_string(value, is_1904)?;
    let time = to_time_string(value)?;
    Some(format!("{date} {time}"))
}

/// Converts an ISO 8601 duration (ODS time values such as `PT10H30M00S`) to `HH:MM:SS`.
fn to_duration_string(value: &str) -> Option<String> {
    let duration = value.parse::<IsoDuration>().ok()?;
    let hours = duration.day as u64 * 24 + duration.hour as u64;
    let minutes = duration.minute as u64;
    let seconds = duration.second.round() as u64;
    Some(format!("{hours:02}:{minutes:02}:{seconds:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 1,
            col: 2,
            kind,
            value: value.to_owned(),
        }
    }

    #[test]
    fn numbers_to_text() {
        assert_eq!(cell(CellType::Number, "42").to_text().unwrap(), "42");
        assert_eq!(cell(CellType::Number, "42.0").to_text().unwrap(), "42");
        assert_eq!(cell(CellType::Number, "3.5").to_text().unwrap(), "3.5");
        assert_eq!(cell(CellType::Number, "1.5E-3").to_text().unwrap(), "0.0015");
        assert!(cell(CellType::Number, "abc").to_text().is_err());
    }

    #[test]
    fn dates_to_text() {
        assert_eq!(cell(CellType::NumberDate1900, "45292").to_text().unwrap(), "2024-01-01");
        assert_eq!(cell(CellType::NumberDate1904, "0").to_text().unwrap(), "1904-01-01");
        assert_eq!(cell(CellType::NumberDateTime1900, "45292.5").to_text().unwrap(), "2024-01-01 12:00:00");
        assert_eq!(cell(CellType::NumberTime1900, "0.75").to_text().unwrap(), "18:00:00");
        assert_eq!(cell(CellType::IsoDateTime, "2024-01-05T10:30:00").to_text().unwrap(), "2024-01-05 10:30:00");
        assert_eq!(cell(CellType::IsoDuration, "PT10H30M00S").to_text().unwrap(), "10:30:00");
    }

    #[test]
    fn booleans_and_strings() {
        assert_eq!(cell(CellType::Boolean, "1").to_text().unwrap(), "true");
        assert_eq!(cell(CellType::Boolean, "0").to_text().unwrap(), "false");
        assert_eq!(cell(CellType::InlineString, "Acme & Co").to_text().unwrap(), "Acme & Co");
        assert_eq!(cell(CellType::Empty, "").to_text().unwrap(), "");
    }

    #[test]
    fn error_cells_cannot_be_coerced() {
        let error = cell(CellType::Error, "#DIV/0!").to_text().unwrap_err();
        assert_eq!(error.to_string(), "Cell C2 holds '#DIV/0!' which cannot be converted to text");
    }

    #[test]
    fn dates_out_of_calendar_range() {
        for (kind, value) in [
            (CellType::NumberDate1900, "1e12"),
            (CellType::NumberDate1904, "-1e15"),
            (CellType::NumberDateTime1900, "1e300"),
            (CellType::NumberDate1900, "inf"),
            (CellType::NumberDate1900, "NaN"),
        ] {
            let error = cell(kind, value).to_text().unwrap_err();
            assert_eq!(error.to_string(), format!("Cell C2 holds '{value}' which cannot be converted to text"));
        }
        assert_eq!(cell(CellType::NumberDate1900, "2958465").to_text().unwrap(), "9999-12-31");
    }

    #[test]
    fn custom_number_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("hh:mm:ss", true), CellType::NumberTime1904);
        assert_eq!(CellType::parse_custom_number_format("dd/mm/yyyy hh:mm", false), CellType::NumberDateTime1900);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("0.00\" days\"", false), CellType::Number);
    }
}

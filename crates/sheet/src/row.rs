//! Positional submission row schema.
//!
//! Cells are bound by position, never by header text, so renaming a form
//! question does not change how a row is read.

/// Number of cells filled in by the submission form.
pub const FORM_COLUMNS: usize = 11;
/// 0-based index of the processed flag cell, directly after the form cells.
pub const FLAG_COLUMN: usize = FORM_COLUMNS;
/// Sheet row number of the first data row; row 1 is the header.
pub const FIRST_DATA_ROW: u32 = 2;

/// Form cell positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Timestamp = 0,
    Email = 1,
    LeaderFirst = 2,
    LeaderLast = 3,
    FollowerFirst = 4,
    FollowerLast = 5,
    Division = 6,
    RoutineName = 7,
    PersonalDescriptor = 8,
    SourceFileReference = 9,
    Acknowledge = 10,
}
impl Column {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Timestamp => "SubmissionTimestamp",
            Self::Email => "Email",
            Self::LeaderFirst => "LeaderFirst",
            Self::LeaderLast => "LeaderLast",
            Self::FollowerFirst => "FollowerFirst",
            Self::FollowerLast => "FollowerLast",
            Self::Division => "Division",
            Self::RoutineName => "RoutineName",
            Self::PersonalDescriptor => "PersonalDescriptor",
            Self::SourceFileReference => "SourceFileReference",
            Self::Acknowledge => "Acknowledge",
        }
    }
}

/// The only authoritative "this row is done" marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessedFlag {
    #[default]
    Unprocessed,
    Processed,
}
impl ProcessedFlag {
    /// A cell is processed iff its trimmed, upper-cased value is `X`.
    pub fn parse(cell: &str) -> Self {
        match cell.trim().eq_ignore_ascii_case("x") {
            true => Self::Processed,
            false => Self::Unprocessed,
        }
    }

    pub fn as_cell(self) -> &'static str {
        match self {
            Self::Processed => "X",
            Self::Unprocessed => "",
        }
    }
}

/// One data row of the submission sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRow {
    number: u32,
    cells: Vec<String>,
    flag: ProcessedFlag,
}
impl SubmissionRow {
    /// Build a row from its raw cells. Cells are trimmed, anything past the
    /// flag cell is ignored.
    pub fn new(number: u32, raw: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut cells: Vec<String> = raw.into_iter().map(|cell| cell.as_ref().trim().to_string()).collect();
        let flag = cells.get(FLAG_COLUMN).map(|cell| ProcessedFlag::parse(cell)).unwrap_or_default();
        cells.truncate(FORM_COLUMNS);
        Self { number, cells, flag }
    }

    /// 1-based sheet row number.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn is_processed(&self) -> bool {
        self.flag == ProcessedFlag::Processed
    }

    /// Whether every form cell is present (possibly empty).
    pub fn is_complete(&self) -> bool {
        self.cells.len() == FORM_COLUMNS
    }

    /// Number of form cells present.
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    pub fn is_blank(&self) -> bool {
        self.flag == ProcessedFlag::Unprocessed && self.cells.iter().all(String::is_empty)
    }

    /// Trimmed cell value, empty if the row is too short.
    pub fn get(&self, column: Column) -> &str {
        self.cells.get(column.index()).map(String::as_str).unwrap_or("")
    }

    pub fn timestamp(&self) -> &str {
        self.get(Column::Timestamp)
    }
    pub fn routine_name(&self) -> &str {
        self.get(Column::RoutineName)
    }
    pub fn personal_descriptor(&self) -> &str {
        self.get(Column::PersonalDescriptor)
    }
    pub fn source_reference(&self) -> &str {
        self.get(Column::SourceFileReference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("X", ProcessedFlag::Processed)]
    #[case(" x ", ProcessedFlag::Processed)]
    #[case("", ProcessedFlag::Unprocessed)]
    #[case("XX", ProcessedFlag::Unprocessed)]
    #[case("done", ProcessedFlag::Unprocessed)]
    fn test_flag_parse(#[case] cell: &str, #[case] expected: ProcessedFlag) {
        assert_eq!(ProcessedFlag::parse(cell), expected);
    }

    #[test]
    fn test_positional_accessors() {
        let row = SubmissionRow::new(
            2,
            [
                "11/15/2024 10:00:00",
                "a@example.com",
                " Kaiano ",
                "Levine",
                "Libby",
                "Wooton",
                "Novice Jack & Jill",
                "West Coast Swing",
                "",
                "https://drive.google.com/file/d/1AbCdEfGhIjKlMnOpQrStUvWxYz/view",
                "Yes",
                " x",
            ],
        );
        assert_eq!(row.number(), 2);
        assert!(row.is_complete());
        assert!(row.is_processed());
        assert_eq!(row.get(Column::LeaderFirst), "Kaiano");
        assert_eq!(row.get(Column::Division), "Novice Jack & Jill");
        assert_eq!(row.personal_descriptor(), "");
        assert_eq!(row.get(Column::Acknowledge), "Yes");
        assert_eq!(row.width(), FORM_COLUMNS);
    }

    #[test]
    fn test_short_row() {
        let row = SubmissionRow::new(7, ["11/15/2024 10:00:00", "a@example.com", "Kaiano"]);
        assert!(!row.is_complete());
        assert!(!row.is_processed());
        assert_eq!(row.get(Column::Division), "");
        assert!(!row.is_blank());
        assert!(SubmissionRow::new(8, ["", " ", ""]).is_blank());
    }
}

//! Parsing of voter rosters.
//!
//! A roster is a CSV file or an Excel (`.xlsx`) workbook whose header row
//! names (at least) the columns `ID`, `Name` and `DOB`. Every row is validated
//! before anything is returned, so a roster either parses completely or not
//! at all.

use std::collections::HashSet;
use std::io::{Cursor, Read};

use calamine::{open_workbook_from_rs, DataType, Reader, Xlsx, XlsxError};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use thiserror::Error;

use crate::model::voter::{parse_dob, NewVoter, VoterId, DOB_FORMAT};

pub const ID_COLUMN: &str = "ID";
pub const NAME_COLUMN: &str = "Name";
pub const DOB_COLUMN: &str = "DOB";

/// Why a roster was rejected. Row numbers count data rows from 1.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Roster is missing the `{0}` column.")]
    MissingColumn(&'static str),
    #[error("Roster row {row} is malformed: {reason}")]
    Malformed { row: usize, reason: String },
    #[error("Roster spreadsheet could not be read: {0}")]
    Spreadsheet(String),
    #[error("Roster row {row} has an invalid ID {value:?}.")]
    InvalidId { row: usize, value: String },
    #[error("Roster row {row} has an empty name.")]
    EmptyName { row: usize },
    #[error("Roster row {row} has an invalid DOB {value:?}; expected YYYY-MM-DD.")]
    InvalidDob { row: usize, value: String },
    #[error("Roster row {row} repeats voter ID {id}.")]
    DuplicateId { row: usize, id: VoterId },
}

/// The file formats a roster may arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFormat {
    Csv,
    Xlsx,
}

impl RosterFormat {
    /// Tell the formats apart by content. An `.xlsx` workbook is a zip archive.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"PK\x03\x04") {
            Self::Xlsx
        } else {
            Self::Csv
        }
    }
}

/// Column positions within a roster's records.
struct Columns {
    id: usize,
    name: usize,
    dob: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, RosterError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|header| header.trim_start_matches('\u{feff}') == column)
                .ok_or(RosterError::MissingColumn(column))
        };
        Ok(Self {
            id: find(ID_COLUMN)?,
            name: find(NAME_COLUMN)?,
            dob: find(DOB_COLUMN)?,
        })
    }
}

/// Parse and validate an uploaded roster in whichever format it is in.
pub fn read_roster(bytes: &[u8]) -> Result<Vec<NewVoter>, RosterError> {
    match RosterFormat::detect(bytes) {
        RosterFormat::Csv => parse_roster(bytes),
        RosterFormat::Xlsx => parse_roster_xlsx(bytes),
    }
}

/// Parse and validate an entire CSV roster.
pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<NewVoter>, RosterError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|err| RosterError::Malformed {
            row: 0,
            reason: err.to_string(),
        })?
        .clone();
    let records = reader
        .records()
        .map(|record| record.map_err(|err| err.to_string()));
    collect_voters(&headers, records)
}

/// Parse and validate an entire roster held in the first worksheet of an
/// `.xlsx` workbook. Blank rows are skipped.
pub fn parse_roster_xlsx(bytes: &[u8]) -> Result<Vec<NewVoter>, RosterError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|err: XlsxError| RosterError::Spreadsheet(err.to_string()))?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| RosterError::Spreadsheet("the workbook has no worksheets".to_string()))?
        .map_err(|err| RosterError::Spreadsheet(err.to_string()))?;

    let mut rows = sheet
        .rows()
        .map(record_from_cells)
        .filter(|record| record.iter().any(|field| !field.is_empty()));
    let headers = rows.next().unwrap_or_else(StringRecord::new);
    collect_voters(&headers, rows.map(Ok))
}

fn record_from_cells(cells: &[DataType]) -> StringRecord {
    let mut record: StringRecord = cells.iter().map(cell_text).collect();
    record.trim();
    record
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(text) => text.clone(),
        // Spreadsheets hold whole numbers as floats.
        DataType::Float(number) if number.fract() == 0.0 => format!("{number:.0}"),
        DataType::DateTime(_) => match cell.as_date() {
            Some(date) => date.format(DOB_FORMAT).to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

/// Validate every record against the header row, all or nothing.
fn collect_voters(
    headers: &StringRecord,
    records: impl Iterator<Item = Result<StringRecord, String>>,
) -> Result<Vec<NewVoter>, RosterError> {
    let columns = Columns::from_headers(headers)?;

    let mut seen = HashSet::new();
    let mut voters = Vec::new();
    for (index, record) in records.enumerate() {
        let row = index + 1;
        let record = record.map_err(|reason| RosterError::Malformed { row, reason })?;
        let voter = parse_row(row, &record, &columns)?;
        if !seen.insert(voter.id) {
            return Err(RosterError::DuplicateId { row, id: voter.id });
        }
        voters.push(voter);
    }

    Ok(voters)
}

fn parse_row(row: usize, record: &StringRecord, columns: &Columns) -> Result<NewVoter, RosterError> {
    // CSV records are checked against the header width by the reader;
    // worksheet rows all share the sheet's width.
    let field = |index: usize| record.get(index).unwrap_or_default();

    let id = field(columns.id);
    let id = id.parse::<VoterId>().map_err(|_| RosterError::InvalidId {
        row,
        value: id.to_string(),
    })?;

    let name = field(columns.name);
    if name.is_empty() {
        return Err(RosterError::EmptyName { row });
    }

    let dob = field(columns.dob);
    let dob = parse_dob(dob).map_err(|_| RosterError::InvalidDob {
        row,
        value: dob.to_string(),
    })?;

    Ok(NewVoter {
        id,
        name: name.to_string(),
        dob,
    })
}

/// Render voters back into CSV roster form.
pub fn write_roster(voters: &[NewVoter]) -> String {
    let bytes = render_roster(voters).expect("Writing to memory is infallible");
    String::from_utf8_lossy(&bytes).into_owned()
}

fn render_roster(voters: &[NewVoter]) -> csv::Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record([ID_COLUMN, NAME_COLUMN, DOB_COLUMN])?;
    for voter in voters {
        let id = voter.id.to_string();
        let dob = voter.dob.format(DOB_FORMAT).to_string();
        writer.write_record([id.as_str(), voter.name.as_str(), dob.as_str()])?;
    }
    writer.into_inner().map_err(|err| err.into_error().into())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn parse(text: &str) -> Result<Vec<NewVoter>, RosterError> {
        parse_roster(text.as_bytes())
    }

    #[test]
    fn parses_valid_roster() {
        let voters = parse("ID,Name,DOB\n1,Ada Lovelace,1815-12-10\n2,\"Hopper, Grace\",1906-12-09\n")
            .unwrap();
        assert_eq!(
            voters,
            vec![
                NewVoter {
                    id: VoterId::new(1),
                    name: "Ada Lovelace".to_string(),
                    dob: NaiveDate::from_ymd_opt(1815, 12, 10).unwrap(),
                },
                NewVoter {
                    id: VoterId::new(2),
                    name: "Hopper, Grace".to_string(),
                    dob: NaiveDate::from_ymd_opt(1906, 12, 9).unwrap(),
                },
            ]
        );
    }

    #[test]
    fn column_order_and_extras() {
        let voters = parse("DOB , Notes, ID ,Name\n2000-01-01, n/a ,5, Alan \n").unwrap();
        assert_eq!(voters.len(), 1);
        assert_eq!(voters[0].id, VoterId::new(5));
        assert_eq!(voters[0].name, "Alan");
    }

    #[test]
    fn header_only_is_empty() {
        assert_eq!(parse("ID,Name,DOB\n").unwrap(), vec![]);
    }

    #[test]
    fn missing_column() {
        assert_eq!(
            parse("ID,Name\n1,Ada\n"),
            Err(RosterError::MissingColumn(DOB_COLUMN))
        );
        assert_eq!(parse(""), Err(RosterError::MissingColumn(ID_COLUMN)));
    }

    #[test]
    fn bad_rows_reject_everything() {
        let text = "ID,Name,DOB\n1,Ada,2000-01-01\n2,Bob,01/02/2000\n3,Cy,2000-01-03\n";
        assert_eq!(
            parse(text),
            Err(RosterError::InvalidDob {
                row: 2,
                value: "01/02/2000".to_string()
            })
        );

        let text = "ID,Name,DOB\nx1,Ada,2000-01-01\n";
        assert_eq!(
            parse(text),
            Err(RosterError::InvalidId {
                row: 1,
                value: "x1".to_string()
            })
        );

        let text = "ID,Name,DOB\n1,,2000-01-01\n";
        assert_eq!(parse(text), Err(RosterError::EmptyName { row: 1 }));

        let text = "ID,Name,DOB\n1,Ada,2000-01-01,extra\n";
        assert!(matches!(parse(text), Err(RosterError::Malformed { row: 1, .. })));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let text = "ID,Name,DOB\n1,Ada,2000-01-01\n2,Bob,2000-01-02\n1,Cy,2000-01-03\n";
        assert_eq!(
            parse(text),
            Err(RosterError::DuplicateId {
                row: 3,
                id: VoterId::new(1)
            })
        );
    }

    #[test]
    fn written_rosters_parse_back() {
        let mut voters = NewVoter::examples();
        voters[0].name = "Hopper, \"Amazing\" Grace".to_string();
        assert_eq!(parse(&write_roster(&voters)).unwrap(), voters);
    }

    #[test]
    fn carriage_returns_are_quoted() {
        let voters = parse("ID,Name,DOB\n1,\"Ada\rLovelace\",2000-01-01\n").unwrap();
        assert_eq!(voters[0].name, "Ada\rLovelace");

        let written = write_roster(&voters);
        assert!(written.contains("\"Ada\rLovelace\""));
        assert_eq!(parse(&written).unwrap(), voters);
    }

    enum Cell {
        Text(&'static str),
        Number(f64),
        Date(f64),
    }

    fn workbook(rows: &[Vec<Cell>]) -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let date = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd");
        let worksheet = workbook.add_worksheet();
        for (row, cells) in rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let (row, col) = (row as u32, col as u16);
                let written = match cell {
                    Cell::Text(text) => worksheet.write_string(row, col, *text),
                    Cell::Number(number) => worksheet.write_number(row, col, *number),
                    Cell::Date(serial) => {
                        worksheet.write_number_with_format(row, col, *serial, &date)
                    }
                };
                written.unwrap();
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn format_detection() {
        assert_eq!(RosterFormat::detect(b"ID,Name,DOB\n"), RosterFormat::Csv);
        assert_eq!(RosterFormat::detect(b""), RosterFormat::Csv);
        let bytes = workbook(&[vec![Cell::Text("ID")]]);
        assert_eq!(RosterFormat::detect(&bytes), RosterFormat::Xlsx);
    }

    #[test]
    fn parses_xlsx_roster() {
        let bytes = workbook(&[
            vec![Cell::Text("Name"), Cell::Text(" ID "), Cell::Text("DOB")],
            vec![Cell::Text("Ada "), Cell::Number(1.0), Cell::Date(36526.0)],
            vec![],
            vec![Cell::Text("Bob"), Cell::Text("2"), Cell::Text("1990-05-17")],
        ]);
        let expected = vec![
            NewVoter {
                id: VoterId::new(1),
                name: "Ada".to_string(),
                dob: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            },
            NewVoter {
                id: VoterId::new(2),
                name: "Bob".to_string(),
                dob: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
            },
        ];
        assert_eq!(parse_roster_xlsx(&bytes).unwrap(), expected);
        assert_eq!(read_roster(&bytes).unwrap(), expected);
    }

    #[test]
    fn xlsx_rows_are_validated() {
        let bytes = workbook(&[
            vec![Cell::Text("ID"), Cell::Text("Name"), Cell::Text("DOB")],
            vec![Cell::Number(1.0), Cell::Text("Ada"), Cell::Date(33010.0)],
            vec![Cell::Number(1.5), Cell::Text("Bob"), Cell::Date(33010.0)],
        ]);
        assert_eq!(
            read_roster(&bytes),
            Err(RosterError::InvalidId {
                row: 2,
                value: "1.5".to_string()
            })
        );

        let bytes = workbook(&[
            vec![Cell::Text("ID"), Cell::Text("Name"), Cell::Text("DOB")],
            vec![Cell::Number(4.0), Cell::Text("Ada"), Cell::Date(33010.0)],
            vec![Cell::Number(4.0), Cell::Text("Bob"), Cell::Date(33010.0)],
        ]);
        assert_eq!(
            read_roster(&bytes),
            Err(RosterError::DuplicateId {
                row: 2,
                id: VoterId::new(4)
            })
        );

        let bytes = workbook(&[vec![Cell::Text("ID"), Cell::Text("Name")]]);
        assert_eq!(
            read_roster(&bytes),
            Err(RosterError::MissingColumn(DOB_COLUMN))
        );

        let bytes = workbook(&[]);
        assert_eq!(read_roster(&bytes), Err(RosterError::MissingColumn(ID_COLUMN)));
    }

    #[test]
    fn unreadable_xlsx_rejected() {
        let bytes = b"PK\x03\x04 this is not really a zip archive";
        assert!(matches!(
            read_roster(bytes),
            Err(RosterError::Spreadsheet(_))
        ));
    }
}

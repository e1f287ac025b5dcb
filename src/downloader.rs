#![cfg(not(tarpaulin_include))]

use crate::record::Record;
use chrono::SecondsFormat;

/// Column headers of the data table, in display order
pub const TABLE_COLUMNS: [&str; 5] = ["timestamp", "user", "waste_type", "quantity", "ethanol"];

/// Convert the data table to CSV
///
/// Rows keep the order they are given in (the store's newest-first order).
/// Fields containing commas, quotes or newlines are quoted.
///
/// # Arguments
/// * `records` - Rows of the data table
///
/// # Returns
/// * CSV text with a header line and one line per record
///
/// # Examples
/// ```
/// use ethanol_dashboard::downloader::to_csv;
///
/// let csv = to_csv(&[]);
/// assert_eq!(csv, "timestamp,user,waste_type,quantity,ethanol\n");
/// ```
pub fn to_csv(records: &[Record]) -> String {
    let mut csv_content = TABLE_COLUMNS.join(",");
    csv_content.push('\n');

    for record in records {
        let row = [
            record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            record.user.clone(),
            record.category.clone(),
            record.quantity.to_string(),
            record.ethanol.to_string(),
        ];
        let escaped: Vec<String> = row.iter().map(|field| csv_field(field)).collect();
        csv_content.push_str(&escaped.join(","));
        csv_content.push('\n');
    }

    csv_content
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert the data table to XLSX
///
/// Numbers are written as numeric cells so spreadsheet users can sum them.
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - Workbook bytes or the writer error
#[cfg(feature = "web")]
pub fn to_xlsx(records: &[Record]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (col, header) in TABLE_COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(
            row,
            0,
            &record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        worksheet.write_string(row, 1, &record.user)?;
        worksheet.write_string(row, 2, &record.category)?;
        worksheet.write_number(row, 3, record.quantity)?;
        worksheet.write_number(row, 4, record.ethanol)?;
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(user: &str) -> Record {
        Record::create(
            user,
            "Paper (Cardboard/Newspaper)",
            5.0,
            Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn csv_rows_follow_table_columns() {
        let csv = to_csv(&[record("Asha")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,user,waste_type,quantity,ethanol");
        assert_eq!(lines[1], "2025-02-03T04:05:06Z,Asha,Paper (Cardboard/Newspaper),5,1.1");
    }

    #[test]
    fn csv_escapes_awkward_names() {
        let csv = to_csv(&[record("Rao, \"Asha\"")]);
        assert!(csv.contains("\"Rao, \"\"Asha\"\"\""));
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = to_xlsx(&[record("Asha"), record("Ravi")]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}

//! Extraction of the metadata block at the top of each sheet.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{Result, StudyError};
use crate::observation::FileMetadata;
use crate::parser::RawRow;

/// Metadata labels expected at the top of every sheet, matched as lower-case prefixes.
pub const FILE_HEADERS: [&str; 6] = [
    "name",
    "date",
    "location",
    "direction",
    "weather",
    "speed limit",
];

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%d %B %Y", "%B %d, %Y"];

/// Finds every known header label in a row and pairs it with the cell after it.
///
/// `["", "Name[s]", "Tester"]` yields `[("name", "Tester")]`. A label in the
/// last column has no value and is ignored.
pub fn extract_file_header(row: &[String]) -> Vec<(&'static str, String)> {
    FILE_HEADERS
        .iter()
        .filter_map(|&header| {
            let idx = row
                .iter()
                .position(|cell| cell.to_lowercase().starts_with(header))?;
            row.get(idx + 1).map(|value| (header, value.clone()))
        })
        .collect()
}

/// Consumes rows until all of [`FILE_HEADERS`] have been seen.
///
/// Rows after the one completing the header are left in `rows`.
///
/// # Errors
///
/// [`StudyError::HeaderIncomplete`] if the rows run out first, or an invalid
/// date / speed limit error if the values cannot be understood.
pub fn read_file_header<'a, I>(filename: &str, rows: &mut I) -> Result<FileMetadata>
where
    I: Iterator<Item = &'a RawRow>,
{
    let mut fields: HashMap<&'static str, String> = HashMap::new();

    for row in rows.by_ref() {
        fields.extend(extract_file_header(&row.cells));
        if fields.len() == FILE_HEADERS.len() {
            return build_metadata(filename, fields);
        }
    }

    Err(StudyError::HeaderIncomplete {
        file: filename.to_string(),
    })
}

fn build_metadata(
    filename: &str,
    mut fields: HashMap<&'static str, String>,
) -> Result<FileMetadata> {
    let mut take = |key: &str| fields.remove(key).unwrap_or_default();

    let date_text = take("date");
    let date = parse_date(&date_text).ok_or_else(|| StudyError::InvalidDate {
        file: filename.to_string(),
        value: date_text.clone(),
    })?;

    let limit_text = take("speed limit");
    let speed_limit =
        parse_speed_limit(&limit_text).ok_or_else(|| StudyError::InvalidSpeedLimit {
            file: filename.to_string(),
            value: limit_text.clone(),
        })?;

    Ok(FileMetadata {
        filename: filename.to_string(),
        name: take("name"),
        date,
        location: take("location"),
        direction: take("direction"),
        weather: take("weather"),
        speed_limit,
    })
}

/// Parses the dates people actually type into the sheet, `8/10/2015` being the usual one.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    // two-digit years are always 20xx; %Y would read "15" as the year 15
    if let Some((month_day, year)) = text.rsplit_once('/') {
        if year.len() == 2 {
            return parse_short_year_date(month_day, year);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

fn parse_short_year_date(month_day: &str, year: &str) -> Option<NaiveDate> {
    let (month, day) = month_day.split_once('/')?;
    let year: i32 = year.parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + year, month.parse().ok()?, day.parse().ok()?)
}

/// Parses `25`, `25.5` or `25 mph`.
pub fn parse_speed_limit(text: &str) -> Option<f64> {
    let number = text
        .trim()
        .trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace());
    number
        .parse::<f64>()
        .ok()
        .filter(|limit| limit.is_finite() && *limit > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn header_rows(include_speed_limit: bool) -> Vec<RawRow> {
        let blank = ["", "", "", "", "", ""];
        let mut rows = vec![
            RawRow::new(1, &blank),
            RawRow::new(2, &["", "Name[s]", "Daniel K & Julie T", "", "", ""]),
            RawRow::new(3, &["", "Date", "8/10/2015", "", "", ""]),
            RawRow::new(4, &["", "Location", "Rogers Ave & Midwood St", "", "", ""]),
            RawRow::new(5, &["", "Direction", "North", "", "", ""]),
            RawRow::new(6, &["", "Weather", "Sunny", "", "", ""]),
        ];
        if include_speed_limit {
            rows.push(RawRow::new(7, &["", "Speed Limit", "25", "", "", ""]));
        }
        rows.push(RawRow::new(8, &blank));
        rows
    }

    #[test]
    fn test_extract_file_header_with_data() {
        let row = cells(&["", "", "name[s]", "tester", "", ""]);
        assert_eq!(extract_file_header(&row), vec![("name", "tester".to_string())]);
    }

    #[test]
    fn test_extract_file_header_without_data() {
        let row = cells(&["", "", "blerg", "blergistan", "", ""]);
        assert!(extract_file_header(&row).is_empty());
    }

    #[test]
    fn test_extract_file_header_is_case_insensitive() {
        let row = cells(&["SPEED LIMIT (mph)", "30"]);
        assert_eq!(extract_file_header(&row), vec![("speed limit", "30".to_string())]);
    }

    #[test]
    fn test_extract_file_header_label_in_last_column_ignored() {
        let row = cells(&["", "Weather"]);
        assert!(extract_file_header(&row).is_empty());
    }

    #[test]
    fn test_read_file_header_complete() {
        let rows = header_rows(true);
        let mut iter = rows.iter();
        let meta = read_file_header("fakefile", &mut iter).unwrap();

        assert_eq!(meta.direction, "North");
        assert_eq!(meta.filename, "fakefile");
        assert_eq!(meta.name, "Daniel K & Julie T");
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2015, 8, 10).unwrap());
        assert_eq!(meta.speed_limit, 25.0);

        // the trailing blank row is left for the vehicle extractor
        assert_eq!(iter.next().map(|r| r.line), Some(8));
    }

    #[test]
    fn test_read_file_header_incomplete() {
        let rows = header_rows(false);
        let result = read_file_header("fakefile", &mut rows.iter());
        match result {
            Err(StudyError::HeaderIncomplete { file }) => assert_eq!(file, "fakefile"),
            other => panic!("expected HeaderIncomplete, got {:?}", other),
        }
    }

    #[test]
    fn test_read_file_header_later_value_overwrites() {
        let mut rows = header_rows(true);
        rows.insert(0, RawRow::new(0, &["Weather", "Rain"]));
        let meta = read_file_header("fakefile", &mut rows.iter()).unwrap();
        assert_eq!(meta.weather, "Sunny");
    }

    #[test]
    fn test_read_file_header_bad_date() {
        let mut rows = header_rows(true);
        rows[2] = RawRow::new(3, &["", "Date", "sometime in August"]);
        let result = read_file_header("fakefile", &mut rows.iter());
        assert!(matches!(result, Err(StudyError::InvalidDate { .. })));
    }

    #[test]
    fn test_read_file_header_bad_speed_limit() {
        let mut rows = header_rows(true);
        rows[6] = RawRow::new(7, &["", "Speed Limit", "fast"]);
        let result = read_file_header("fakefile", &mut rows.iter());
        assert!(matches!(result, Err(StudyError::InvalidSpeedLimit { .. })));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2015, 8, 10);
        assert_eq!(parse_date("8/10/2015"), expected);
        assert_eq!(parse_date("08/10/15"), expected);
        assert_eq!(parse_date("2015-08-10"), expected);
        assert_eq!(parse_date("10 August 2015"), expected);
        assert_eq!(parse_date("blerg"), None);
    }

    #[test]
    fn test_parse_date_two_digit_year_is_this_century() {
        assert_eq!(parse_date("1/2/99"), NaiveDate::from_ymd_opt(2099, 1, 2));
        assert_eq!(parse_date("12/31/70"), NaiveDate::from_ymd_opt(2070, 12, 31));
        assert_eq!(parse_date("13/1/15"), None);
        assert_eq!(parse_date("a/1/15"), None);
    }

    #[test]
    fn test_parse_speed_limit() {
        assert_eq!(parse_speed_limit("25"), Some(25.0));
        assert_eq!(parse_speed_limit(" 30 mph"), Some(30.0));
        assert_eq!(parse_speed_limit(""), None);
        assert_eq!(parse_speed_limit("0"), None);
    }
}

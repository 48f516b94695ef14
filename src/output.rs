//! CSV output for report tables and extracted observations.

use anyhow::{Result, bail};
use csv::WriterBuilder;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use tracing::debug;

use crate::observation::{Observation, ObservationRecord};

/// Writes one CSV row per entry of `rows`, keyed by a leading `when` column.
///
/// Each value is serialized to a record; the header is the union of all
/// record keys, sorted. Keys starting with `_` are private and never written.
/// Rows lacking a key get a blank cell. Nothing at all is written for an
/// empty table.
///
/// ```text
/// when,key1,key2,key3
/// when 1,value1,value2,
/// when 2,value1,,value3
/// ```
pub fn write_table<W: Write, T: Serialize>(out: W, rows: &BTreeMap<String, T>) -> Result<()> {
    if rows.is_empty() {
        debug!("No rows to write");
        return Ok(());
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut columns = BTreeSet::new();
    for (when, row) in rows {
        let Value::Object(fields) = serde_json::to_value(row)? else {
            bail!("row {when} does not serialize to a record");
        };
        let fields: BTreeMap<String, Value> = fields
            .into_iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .collect();
        columns.extend(fields.keys().cloned());
        records.push((when, fields));
    }

    let mut writer = WriterBuilder::new().from_writer(out);
    writer.write_record(std::iter::once("when").chain(columns.iter().map(String::as_str)))?;

    for (when, fields) in &records {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(when.to_string());
        record.extend(
            columns
                .iter()
                .map(|column| fields.get(column).map(cell_text).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    debug!(rows = records.len(), columns = columns.len(), "Table written");
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Writes every observation as a CSV row, with a header.
pub fn write_observations<W: Write>(out: W, observations: &[Observation]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(out);
    for obs in observations {
        writer.serialize(ObservationRecord::from(obs))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::tests::observation;
    use crate::stats::BucketStatistics;

    fn render<T: Serialize>(rows: &BTreeMap<String, T>) -> String {
        let mut out = Vec::new();
        write_table(&mut out, rows).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_table_empty_writes_nothing() {
        let rows: BTreeMap<String, BucketStatistics> = BTreeMap::new();
        assert_eq!(render(&rows), "");
    }

    #[test]
    fn test_write_table_outputs_data() {
        let rows = BTreeMap::from([
            ("01:00:00".to_string(), BTreeMap::from([("s", 121212)])),
            ("01:01:00".to_string(), BTreeMap::from([("s", 232323)])),
        ]);
        let content = render(&rows);

        assert!(content.contains("121212"));
        assert!(content.contains("232323"));
        assert_eq!(content.lines().next(), Some("when,s"));
    }

    #[test]
    fn test_write_table_union_of_columns() {
        let rows = BTreeMap::from([
            (
                "when 1".to_string(),
                BTreeMap::from([("key1", "value1"), ("key2", "value2")]),
            ),
            (
                "when 2".to_string(),
                BTreeMap::from([("key1", "value1"), ("key3", "value3")]),
            ),
        ]);

        let expected = "when,key1,key2,key3\nwhen 1,value1,value2,\nwhen 2,value1,,value3\n";
        assert_eq!(render(&rows), expected);
    }

    #[test]
    fn test_write_table_statistics_hides_private_fields() {
        let rows = BTreeMap::from([(
            "05:00:00".to_string(),
            BucketStatistics::from_speeds(vec![20.0, 30.0], 25.0).unwrap(),
        )]);
        let content = render(&rows);
        let mut lines = content.lines();

        assert_eq!(
            lines.next(),
            Some("when,%legal,50%,85%,99%,count,count_legal,diff,limit,max,mean,min")
        );
        assert_eq!(
            lines.next(),
            Some("05:00:00,50.0,20.0,20.0,20.0,2,1,10.0,25.0,30.0,25.0,20.0")
        );
        assert!(!content.contains("_speeds"));
    }

    #[test]
    fn test_write_table_rejects_non_records() {
        let rows = BTreeMap::from([("05:00:00".to_string(), 42)]);
        assert!(write_table(Vec::new(), &rows).is_err());
    }

    #[test]
    fn test_write_observations() {
        let observations = vec![observation(31, "2015-08-10", "06:56:00")];
        let mut out = Vec::new();
        write_observations(&mut out, &observations).unwrap();
        let content = String::from_utf8(out).unwrap();
        let mut lines = content.lines();

        assert_eq!(
            lines.next(),
            Some("filename,date,time,vehicle,speed,speed_limit,location,direction,weather,name")
        );
        assert_eq!(
            lines.next(),
            Some("fakefile,2015-08-10,06:56:00,1,31,25.0,Rogers Ave & Midwood St,North,Sunny,Tester")
        );
    }
}

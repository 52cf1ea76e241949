//! Parser for upstream CSV counter snapshots
//!
//! Expected layout: a header row containing `switch_id` and `timestamp`
//! plus one column per metric, then one row per device.
//!
//! Failures are isolated as narrowly as possible:
//! - header problems reject the whole snapshot
//! - a bad `switch_id` or `timestamp` rejects only that row
//! - a missing or non-numeric metric cell rejects only that cell

use chrono::{DateTime, Utc};
use netpulse_common::{parse_timestamp, SWITCH_ID_COLUMN, TIMESTAMP_COLUMN};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot body is empty")]
    Empty,

    #[error("Snapshot header is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Snapshot header is malformed: {0}")]
    MalformedHeader(String),
}

/// One accepted device row
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub switch_id: String,
    pub timestamp: DateTime<Utc>,
    /// (metric, value) in header column order
    pub values: Vec<(String, f64)>,
}

/// Parsed snapshot plus rejection counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub rows: Vec<SnapshotRow>,
    pub rejected_rows: usize,
    pub rejected_cells: usize,
}

impl Snapshot {
    /// Number of samples this snapshot will append
    pub fn sample_count(&self) -> usize {
        self.rows.iter().map(|row| row.values.len()).sum()
    }
}

struct Header {
    switch_id: usize,
    timestamp: usize,
    metrics: Vec<(usize, String)>,
}

impl Header {
    fn parse(line: &str) -> Result<Self, SnapshotError> {
        let columns = split_record(line)
            .ok_or_else(|| SnapshotError::MalformedHeader("unterminated quote".to_string()))?;

        let position = |name: &'static str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or(SnapshotError::MissingColumn(name))
        };
        let switch_id = position(SWITCH_ID_COLUMN)?;
        let timestamp = position(TIMESTAMP_COLUMN)?;

        let metrics = columns
            .iter()
            .enumerate()
            .filter(|(idx, name)| *idx != switch_id && *idx != timestamp && !name.is_empty())
            .map(|(idx, name)| (idx, name.clone()))
            .collect();

        Ok(Self {
            switch_id,
            timestamp,
            metrics,
        })
    }
}

/// Parse a full snapshot body
pub fn parse(body: &str) -> Result<Snapshot, SnapshotError> {
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    let mut lines = body
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines.next().ok_or(SnapshotError::Empty)?;
    let header = Header::parse(header_line)?;

    let mut snapshot = Snapshot::default();

    for (idx, line) in lines {
        let line_num = idx + 1;

        let fields = match split_record(line) {
            Some(f) => f,
            None => {
                debug!("Snapshot: rejecting line {}: unterminated quote", line_num);
                snapshot.rejected_rows += 1;
                continue;
            }
        };

        let switch_id = match fields.get(header.switch_id).filter(|s| !s.is_empty()) {
            Some(id) => id.clone(),
            None => {
                debug!("Snapshot: rejecting line {}: missing switch_id", line_num);
                snapshot.rejected_rows += 1;
                continue;
            }
        };

        let timestamp = match fields
            .get(header.timestamp)
            .and_then(|raw| parse_timestamp(raw))
        {
            Some(ts) => ts,
            None => {
                debug!(
                    "Snapshot: rejecting line {} ({}): bad timestamp {:?}",
                    line_num,
                    switch_id,
                    fields.get(header.timestamp)
                );
                snapshot.rejected_rows += 1;
                continue;
            }
        };

        let mut values = Vec::with_capacity(header.metrics.len());
        for (col, metric) in &header.metrics {
            match fields.get(*col).and_then(|raw| parse_value(raw)) {
                Some(value) => values.push((metric.clone(), value)),
                None => {
                    debug!(
                        "Snapshot: rejecting cell {}/{} on line {}: {:?}",
                        switch_id,
                        metric,
                        line_num,
                        fields.get(*col)
                    );
                    snapshot.rejected_cells += 1;
                }
            }
        }

        snapshot.rows.push(SnapshotRow {
            switch_id,
            timestamp,
            values,
        });
    }

    Ok(snapshot)
}

/// Finite floats only; NaN and infinities have no JSON representation
fn parse_value(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Split one CSV record into trimmed fields.
///
/// Supports double-quoted fields with `""` escapes. Returns None on an
/// unterminated quote.
fn split_record(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return None;
    }
    fields.push(current.trim().to_string());
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2025-06-01T12:00:00.000000+00:00";

    fn snapshot_body(rows: &[&str]) -> String {
        let mut body = String::from("switch_id,bandwidth,latency,errors,timestamp\n");
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        body
    }

    #[test]
    fn test_parse_generator_output() {
        let body = snapshot_body(&[
            &format!("switch1,55.5,0.42,3,{}", TS),
            &format!("switch2,12.0,0.9,0,{}", TS),
        ]);
        let snapshot = parse(&body).unwrap();

        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rejected_rows, 0);
        assert_eq!(snapshot.rejected_cells, 0);
        assert_eq!(snapshot.sample_count(), 6);

        let row = &snapshot.rows[0];
        assert_eq!(row.switch_id, "switch1");
        assert_eq!(row.timestamp, parse_timestamp(TS).unwrap());
        assert_eq!(
            row.values,
            vec![
                ("bandwidth".to_string(), 55.5),
                ("latency".to_string(), 0.42),
                ("errors".to_string(), 3.0),
            ]
        );
    }

    #[test]
    fn test_column_order_is_free() {
        let body = format!("timestamp,errors,switch_id\r\n{},7,sw9\r\n", TS);
        let snapshot = parse(&body).unwrap();
        assert_eq!(snapshot.rows[0].switch_id, "sw9");
        assert_eq!(snapshot.rows[0].values, vec![("errors".to_string(), 7.0)]);
    }

    #[test]
    fn test_missing_required_columns() {
        assert_eq!(
            parse("bandwidth,timestamp\n1.0,x\n"),
            Err(SnapshotError::MissingColumn("switch_id"))
        );
        assert_eq!(
            parse("switch_id,bandwidth\nsw1,1.0\n"),
            Err(SnapshotError::MissingColumn("timestamp"))
        );
        assert_eq!(parse(""), Err(SnapshotError::Empty));
        assert_eq!(parse("\n\n  \n"), Err(SnapshotError::Empty));
    }

    #[test]
    fn test_non_numeric_cell_only_drops_that_cell() {
        let body = snapshot_body(&[&format!("switch1,fast,0.5,2,{}", TS)]);
        let snapshot = parse(&body).unwrap();

        assert_eq!(snapshot.rejected_cells, 1);
        assert_eq!(
            snapshot.rows[0].values,
            vec![("latency".to_string(), 0.5), ("errors".to_string(), 2.0)]
        );
    }

    #[test]
    fn test_empty_and_non_finite_cells_rejected() {
        let body = snapshot_body(&[&format!("switch1,,NaN,inf,{}", TS)]);
        let snapshot = parse(&body).unwrap();
        assert_eq!(snapshot.rejected_cells, 3);
        assert!(snapshot.rows[0].values.is_empty());
    }

    #[test]
    fn test_bad_rows_do_not_affect_good_rows() {
        let body = snapshot_body(&[
            "switch1,1.0,0.1,0,not-a-time",
            &format!(",1.0,0.1,0,{}", TS),
            "switch3,1.0,0.1,0,2025-06-01T12:00:00",
            &format!("switch4,4.0,0.4,4,{}", TS),
        ]);
        let snapshot = parse(&body).unwrap();

        assert_eq!(snapshot.rejected_rows, 3);
        assert_eq!(snapshot.rows.len(), 1);
        assert_eq!(snapshot.rows[0].switch_id, "switch4");
    }

    #[test]
    fn test_short_row_rejected_when_timestamp_missing() {
        // timestamp is the last column, so a truncated row loses it
        let body = snapshot_body(&["switch1,1.0,0.1"]);
        let snapshot = parse(&body).unwrap();
        assert_eq!(snapshot.rejected_rows, 1);
        assert!(snapshot.rows.is_empty());
    }

    #[test]
    fn test_quoted_fields() {
        assert_eq!(
            split_record(r#""core, rack 1", 2.5 ,"say ""hi""""#).unwrap(),
            vec!["core, rack 1", "2.5", r#"say "hi""#]
        );
        assert!(split_record(r#""open,1"#).is_none());
    }

    #[test]
    fn test_bom_is_ignored() {
        let body = format!("\u{feff}switch_id,timestamp,errors\nsw1,{},1\n", TS);
        let snapshot = parse(&body).unwrap();
        assert_eq!(snapshot.rows.len(), 1);
    }
}

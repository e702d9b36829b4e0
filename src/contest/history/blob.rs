//! Classification of the persisted status history blob.
//!
//! The blob accumulated three encodings over the product's lifetime: a
//! modern array of structured records, a keyed object whose keys are
//! datetime strings or resubmission markers, and plain status-name keys
//! with an embedded timestamp. Every fragment is classified into one of a
//! closed set of shapes before normalization; fragments that fit none of
//! them are counted and skipped, never fatal.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::contest::domain::StatusHistoryRecord;

/// Keys carrying this prefix mark a resubmission event.
pub const RESUBMITTED_KEY_PREFIX: &str = "resubmitted";

/// Value object fields that may carry the event timestamp.
const TIMESTAMP_FIELDS: [&str; 3] = ["date", "at", "changed_at"];

/// One raw fragment, classified but not yet normalized.
#[derive(Debug, Clone, PartialEq)]
pub enum RawHistoryEvent {
    /// Modern array entry.
    Structured(StatusHistoryRecord),
    /// Datetime-pattern key with old/new status details in the value.
    DatedChange {
        at: DateTime<Utc>,
        old_status: Option<String>,
        new_status: Option<String>,
        actor: Option<String>,
        week: Option<String>,
    },
    /// Resubmission-prefixed key.
    Resubmission {
        at: DateTime<Utc>,
        actor: Option<String>,
    },
    /// Plain status-name key with an embedded timestamp.
    NamedStatus {
        status: String,
        at: DateTime<Utc>,
        actor: Option<String>,
        week: Option<String>,
    },
}

#[derive(Debug, Default)]
pub struct ClassifiedBlob {
    pub events: Vec<RawHistoryEvent>,
    pub anomalies: usize,
}

pub fn classify(blob: &Value) -> ClassifiedBlob {
    let mut classified = ClassifiedBlob::default();

    match blob {
        Value::Null => {}
        Value::Array(entries) => {
            for entry in entries {
                match serde_json::from_value::<StatusHistoryRecord>(entry.clone()) {
                    Ok(record) => classified.events.push(RawHistoryEvent::Structured(record)),
                    Err(err) => {
                        warn!(%err, "skipping malformed status history entry");
                        classified.anomalies += 1;
                    }
                }
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                match classify_keyed(key, value) {
                    Some(event) => classified.events.push(event),
                    None => {
                        warn!(%key, "skipping unclassifiable status history fragment");
                        classified.anomalies += 1;
                    }
                }
            }
        }
        _ => {
            warn!("status history blob has an unexpected shape");
            classified.anomalies += 1;
        }
    }

    classified
}

fn classify_keyed(key: &str, value: &Value) -> Option<RawHistoryEvent> {
    if let Some(at) = parse_timestamp(key) {
        let details = value.as_object()?;
        return Some(RawHistoryEvent::DatedChange {
            at,
            old_status: string_field(details, "old_status"),
            new_status: string_field(details, "new_status"),
            actor: string_field(details, "changed_by"),
            week: string_field(details, "week"),
        });
    }

    if key.starts_with(RESUBMITTED_KEY_PREFIX) {
        let key_suffix = key[RESUBMITTED_KEY_PREFIX.len()..]
            .trim_matches(|c: char| c == '_' || c == ' ' || c == ':');
        let at = embedded_timestamp(value).or_else(|| parse_timestamp(key_suffix))?;
        let actor = value
            .as_object()
            .and_then(|details| string_field(details, "changed_by"));
        return Some(RawHistoryEvent::Resubmission { at, actor });
    }

    let at = embedded_timestamp(value)?;
    let details = value.as_object();
    Some(RawHistoryEvent::NamedStatus {
        status: key.to_string(),
        at,
        actor: details.and_then(|d| string_field(d, "changed_by")),
        week: details.and_then(|d| string_field(d, "week")),
    })
}

fn string_field(details: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    details
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|value| !value.trim().is_empty())
}

/// Timestamp carried inside the value: either the value itself is a
/// timestamp string, or an object with one of the known fields.
fn embedded_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(raw) = value.as_str() {
        return parse_timestamp(raw);
    }
    let details = value.as_object()?;
    TIMESTAMP_FIELDS
        .iter()
        .find_map(|field| details.get(*field).and_then(Value::as_str).and_then(parse_timestamp))
}

/// Tolerant timestamp parsing across the formats observed in stored
/// blobs. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

/// Append a record in whatever encoding the blob already uses, so legacy
/// objects keep round-tripping through the classifier.
pub fn append_record(blob: &mut Value, record: &StatusHistoryRecord, previous_status: Option<&str>) {
    match blob {
        Value::Array(entries) => {
            entries.push(record_value(record));
        }
        Value::Object(map) => {
            let key = record.at.format("%Y-%m-%d %H:%M:%S").to_string();
            let mut details = serde_json::Map::new();
            if let Some(previous) = previous_status {
                details.insert("old_status".to_string(), Value::String(previous.to_string()));
            }
            details.insert("new_status".to_string(), Value::String(record.status.clone()));
            details.insert("changed_by".to_string(), Value::String(record.actor.clone()));
            if let Some(week) = &record.week {
                details.insert("week".to_string(), Value::String(week.clone()));
            }
            if let Some(reason) = &record.reason {
                details.insert("reason".to_string(), Value::String(reason.clone()));
            }
            map.insert(key, Value::Object(details));
        }
        other => {
            *other = Value::Array(vec![record_value(record)]);
        }
    }
}

fn record_value(record: &StatusHistoryRecord) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().expect("valid timestamp")
    }

    #[test]
    fn parses_every_observed_timestamp_format() {
        let expected = utc(2021, 3, 4, 12, 33, 21);
        assert_eq!(parse_timestamp("2021-03-04T12:33:21Z"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-04 12:33:21"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-04T12:33:21"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-04"), Some(utc(2021, 3, 4, 0, 0, 0)));
        assert_eq!(parse_timestamp("last tuesday"), None);
    }

    #[test]
    fn classifies_the_three_keyed_shapes() {
        let blob = json!({
            "2021-03-04 12:33:21": { "old_status": "pending", "new_status": "next week", "changed_by": "17" },
            "resubmitted_2021-04-02 10:11:12": {},
            "rejected": { "date": "2021-02-01 09:00:00", "changed_by": "user" },
        });

        let classified = classify(&blob);
        assert_eq!(classified.anomalies, 0);
        assert_eq!(classified.events.len(), 3);
        assert!(classified.events.iter().any(|event| matches!(
            event,
            RawHistoryEvent::DatedChange { new_status: Some(status), .. } if status == "next week"
        )));
        assert!(classified
            .events
            .iter()
            .any(|event| matches!(event, RawHistoryEvent::Resubmission { .. })));
        assert!(classified.events.iter().any(|event| matches!(
            event,
            RawHistoryEvent::NamedStatus { status, .. } if status == "rejected"
        )));
    }

    #[test]
    fn resubmission_timestamp_prefers_the_value_field() {
        let blob = json!({
            "resubmitted": { "date": "2021-04-02 10:11:12" },
        });
        let classified = classify(&blob);
        assert_eq!(
            classified.events,
            vec![RawHistoryEvent::Resubmission {
                at: utc(2021, 4, 2, 10, 11, 12),
                actor: None,
            }]
        );
    }

    #[test]
    fn one_bad_fragment_does_not_blank_the_trail() {
        let blob = json!({
            "2021-03-04 12:33:21": { "new_status": "this week" },
            "garbage": 42,
        });
        let classified = classify(&blob);
        assert_eq!(classified.events.len(), 1);
        assert_eq!(classified.anomalies, 1);
    }

    #[test]
    fn malformed_array_entries_are_skipped_individually() {
        let blob = json!([
            { "status": "pending", "at": "2021-01-01T00:00:00Z", "actor": "system" },
            { "status": 7 },
        ]);
        let classified = classify(&blob);
        assert_eq!(classified.events.len(), 1);
        assert_eq!(classified.anomalies, 1);
    }

    #[test]
    fn append_follows_the_existing_encoding() {
        let record = StatusHistoryRecord {
            status: "this week".to_string(),
            at: utc(2021, 5, 1, 8, 0, 0),
            actor: "17".to_string(),
            week: Some("2021-W17".to_string()),
            reason: None,
        };

        let mut array_blob = json!([]);
        append_record(&mut array_blob, &record, Some("next week"));
        assert_eq!(array_blob.as_array().map(Vec::len), Some(1));

        let mut keyed_blob = json!({ "2021-03-04 12:33:21": { "new_status": "next week" } });
        append_record(&mut keyed_blob, &record, Some("next week"));
        let inserted = &keyed_blob["2021-05-01 08:00:00"];
        assert_eq!(inserted["new_status"], json!("this week"));
        assert_eq!(inserted["old_status"], json!("next week"));

        let mut fresh = Value::Null;
        append_record(&mut fresh, &record, None);
        assert!(fresh.is_array());
    }

    #[test]
    fn appended_keyed_records_reclassify_cleanly() {
        let record = StatusHistoryRecord {
            status: "rejected".to_string(),
            at: utc(2021, 6, 2, 9, 30, 0),
            actor: "user".to_string(),
            week: None,
            reason: Some("Photo quality".to_string()),
        };
        let mut blob = json!({ "2021-03-04 12:33:21": { "new_status": "pending" } });
        append_record(&mut blob, &record, Some("pending"));

        let classified = classify(&blob);
        assert_eq!(classified.anomalies, 0);
        assert_eq!(classified.events.len(), 2);
    }
}

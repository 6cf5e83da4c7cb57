//! Record formatting for the historical log.
//!
//! File names follow `<entity_id>-<entity_type>-<attr_name>-<attr_type>.txt`
//! and lines follow
//! `<iso_ts>|<ts_ms>|<entity_id>|<entity_type>|<attr_name>|<attr_type>|<value>`.
//! Identifiers are sanitized first so they cannot collide with the `-`
//! name separator or with `:` in paths. Values are written verbatim.

use chrono::{DateTime, Utc};
use cosmos_types::{AttributeUpdate, StorageRecord};

/// Separator between fields of a line.
pub const FIELD_SEPARATOR: &str = "|";

/// Suffix of every target file.
pub const FILE_EXTENSION: &str = ".txt";

/// Replaces every `:` and `-` with `_`.
pub fn sanitize(identifier: &str) -> String {
    identifier.replace([':', '-'], "_")
}

/// Target file name for one entity attribute.
pub fn file_name(entity_id: &str, entity_type: &str, attr_name: &str, attr_type: &str) -> String {
    format!(
        "{}-{}-{}-{}{FILE_EXTENSION}",
        sanitize(entity_id),
        sanitize(entity_type),
        sanitize(attr_name),
        sanitize(attr_type)
    )
}

/// Human-readable UTC timestamp with millisecond precision, e.g.
/// `2014-02-12T10:23:45.123`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

/// Builds the storage record for one attribute update observed at `at`.
///
/// Pure: identical inputs always produce an identical record.
pub fn format_record(
    entity_id: &str,
    entity_type: &str,
    attr: &AttributeUpdate,
    at: DateTime<Utc>,
) -> StorageRecord {
    let line = [
        iso_timestamp(at),
        at.timestamp_millis().to_string(),
        sanitize(entity_id),
        sanitize(entity_type),
        sanitize(&attr.name),
        sanitize(&attr.attr_type),
        attr.value.clone(),
    ]
    .join(FIELD_SEPARATOR);

    StorageRecord {
        key: file_name(entity_id, entity_type, &attr.name, &attr.attr_type),
        line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_392_200_625_123).unwrap()
    }

    #[test]
    fn sanitize_replaces_colons_and_dashes() {
        assert_eq!(sanitize("urn:x-room:1"), "urn_x_room_1");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn record_has_exact_layout() {
        let attr = AttributeUpdate::new("temperature", "float", "24.4");
        let record = format_record("Room1", "Room", &attr, at());

        assert_eq!(record.key, "Room1-Room-temperature-float.txt");
        assert_eq!(
            record.line,
            "2014-02-12T10:23:45.123|1392200625123|Room1|Room|temperature|float|24.4"
        );
    }

    #[test]
    fn identifiers_are_sanitized_in_key_and_line() {
        let attr = AttributeUpdate::new("temp-in:c", "x:float", "-3:5");
        let record = format_record("room1:floor-2", "type:1", &attr, at());

        assert_eq!(record.key, "room1_floor_2-type_1-temp_in_c-x_float.txt");

        let fields: Vec<&str> = record.line.split(FIELD_SEPARATOR).collect();
        assert_eq!(fields.len(), 7);
        for field in &fields[2..6] {
            assert!(
                !field.contains(':') && !field.contains('-'),
                "field {field:?} was not sanitized"
            );
        }
        // Values are opaque and keep their characters.
        assert_eq!(fields[6], "-3:5");
    }

    #[test]
    fn key_matches_file_name() {
        let attr = AttributeUpdate::new("a:b", "c-d", "v");
        let record = format_record("e:f", "g-h", &attr, at());
        assert_eq!(record.key, file_name("e:f", "g-h", "a:b", "c-d"));
    }

    #[test]
    fn formatting_is_deterministic() {
        let attr = AttributeUpdate::new("pressure", "integer", "720");
        assert_eq!(
            format_record("Room1", "Room", &attr, at()),
            format_record("Room1", "Room", &attr, at())
        );
    }
}

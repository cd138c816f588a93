//! Audit log codec.
//!
//! Wire shape, one object per line:
//! - `{"target_id":6,"action":"create","id":6,"cell_id":2,"centroid":[3.0,4.0],...}`
//! - `{"target_id":1,"action":"update","field":"centroid","value":[1.0,10.0]}`
//! - `{"target_id":6,"action":"delete"}`
//!
//! # Invariants
//! - Writers emit entries of applied commands only, in execution order.
//! - Replay bypasses command history and applies entries to records directly.
//! - An unrecognized `action` or `field` is a fatal format error.

use crate::codec::{write_json_line, CodecError, CodecResult};
use crate::model::entry::{AuditAction, AuditEntry};
use crate::model::tensor::{FieldValue, Point, Tensor, TensorField, TensorId};
use crate::store::tensor_store::TensorStore;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{BufRead, Write};

#[derive(Serialize)]
struct AuditLineOut<'a> {
    target_id: TensorId,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(flatten)]
    record: Option<&'a Tensor>,
}

#[derive(Deserialize)]
struct AuditLineIn {
    target_id: TensorId,
    action: String,
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

/// Writes the entries of every applied command in `store`.
///
/// Commands undone beyond the cursor are excluded. Returns the number of
/// entries written.
pub fn write_audit_log<W: Write>(store: &TensorStore, writer: W) -> CodecResult<usize> {
    write_entries(store.applied_entries(), writer)
}

/// Writes `entries` in iteration order, one JSON object per line.
pub fn write_entries<'a, I, W>(entries: I, mut writer: W) -> CodecResult<usize>
where
    I: IntoIterator<Item = &'a AuditEntry>,
    W: Write,
{
    let mut written = 0;
    for entry in entries {
        write_json_line(&mut writer, &to_wire(entry))?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Parses an audit log without applying it.
pub fn read_audit_log<R: BufRead>(reader: R) -> CodecResult<Vec<AuditEntry>> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(parse_entry(index + 1, &line)?);
    }
    Ok(entries)
}

/// Replays an audit log against `store` in order.
///
/// `create` entries insert a record, `update` entries set one field, `delete`
/// entries remove a record. History and cursor are left untouched. Returns
/// the number of entries applied.
///
/// # Errors
/// - `Format` when a line is not a valid entry.
/// - `Store` when an entry references a missing id or reuses a taken one.
pub fn apply_audit_log<R: BufRead>(store: &mut TensorStore, reader: R) -> CodecResult<usize> {
    let mut applied = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let entry = parse_entry(line_no, &line).inspect_err(|err| {
            error!("event=audit_replay module=codec status=error error_code=format error={err}");
        })?;
        store.apply_entry(&entry).map_err(|source| {
            error!(
                "event=audit_replay module=codec status=error error_code=apply line={line_no} error={source}"
            );
            CodecError::Store {
                line: line_no,
                source,
            }
        })?;
        applied += 1;
    }
    debug!("event=audit_replay module=codec status=ok entries={applied}");
    Ok(applied)
}

fn to_wire(entry: &AuditEntry) -> AuditLineOut<'_> {
    let (field, value, record) = match entry {
        AuditEntry::Create(tensor) => (None, None, Some(tensor)),
        AuditEntry::Update { value, .. } => (
            Some(value.field().as_str()),
            Some(value_to_json(value)),
            None,
        ),
        AuditEntry::Delete { .. } => (None, None, None),
    };
    AuditLineOut {
        target_id: entry.target_id(),
        action: entry.action().as_str(),
        field,
        value,
        record,
    }
}

fn value_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::CellId(cell_id) => json!(cell_id),
        FieldValue::Centroid(point) | FieldValue::Marker(point) => json!([point.row, point.col]),
        FieldValue::Active(active) => json!(active),
    }
}

fn parse_entry(line: usize, text: &str) -> CodecResult<AuditEntry> {
    let raw: Value = serde_json::from_str(text)
        .map_err(|err| CodecError::format(line, format!("invalid json: {err}")))?;
    let head = AuditLineIn::deserialize(&raw)
        .map_err(|err| CodecError::format(line, format!("invalid audit entry: {err}")))?;
    let action = AuditAction::parse(&head.action).ok_or_else(|| {
        CodecError::format(line, format!("unrecognized action `{}`", head.action))
    })?;

    match action {
        AuditAction::Create => {
            let tensor = Tensor::deserialize(&raw)
                .map_err(|err| CodecError::format(line, format!("invalid create entry: {err}")))?;
            if tensor.id() != head.target_id {
                return Err(CodecError::format(
                    line,
                    format!(
                        "create entry target_id {} does not match id {}",
                        head.target_id,
                        tensor.id()
                    ),
                ));
            }
            Ok(AuditEntry::Create(tensor))
        }
        AuditAction::Update => {
            let name = head
                .field
                .ok_or_else(|| CodecError::format(line, "update entry is missing `field`"))?;
            let field = TensorField::parse(&name)
                .ok_or_else(|| CodecError::format(line, format!("unrecognized field `{name}`")))?;
            let value = head
                .value
                .ok_or_else(|| CodecError::format(line, "update entry is missing `value`"))?;
            Ok(AuditEntry::Update {
                target_id: head.target_id,
                value: value_from_json(line, field, value)?,
            })
        }
        AuditAction::Delete => Ok(AuditEntry::Delete {
            target_id: head.target_id,
        }),
    }
}

fn value_from_json(line: usize, field: TensorField, value: Value) -> CodecResult<FieldValue> {
    let decoded = match field {
        TensorField::CellId => serde_json::from_value(value).map(FieldValue::CellId),
        TensorField::Centroid => serde_json::from_value::<Point>(value).map(FieldValue::Centroid),
        TensorField::Marker => serde_json::from_value::<Point>(value).map(FieldValue::Marker),
        TensorField::Active => serde_json::from_value(value).map(FieldValue::Active),
    };
    decoded.map_err(|err| {
        CodecError::format(line, format!("invalid `{}` value: {err}", field.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_entry, read_audit_log, to_wire};
    use crate::codec::CodecError;
    use crate::model::entry::AuditEntry;
    use crate::model::tensor::{CreationType, FieldValue, Point, Tensor};

    #[test]
    fn update_entry_wire_shape() {
        let entry = AuditEntry::Update {
            target_id: 1,
            value: FieldValue::Centroid(Point::new(1.0, 10.0)),
        };
        let json = serde_json::to_value(to_wire(&entry)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "target_id": 1,
                "action": "update",
                "field": "centroid",
                "value": [1.0, 10.0],
            })
        );
    }

    #[test]
    fn create_entry_carries_full_record() {
        let tensor = Tensor::new(
            6,
            2,
            Point::new(3.0, 4.0),
            Point::new(5.0, 6.0),
            CreationType::Manual,
        );
        let json = serde_json::to_value(to_wire(&AuditEntry::Create(tensor))).unwrap();
        assert_eq!(json["target_id"], 6);
        assert_eq!(json["action"], "create");
        assert_eq!(json["id"], 6);
        assert_eq!(json["cell_id"], 2);
        assert_eq!(json["creation_type"], "manual");
        assert_eq!(json["active"], true);
        assert!(json.get("field").is_none());
    }

    #[test]
    fn parses_deactivation_entry() {
        let entry =
            parse_entry(1, r#"{"target_id":3,"action":"update","field":"active","value":false}"#)
                .unwrap();
        assert_eq!(
            entry,
            AuditEntry::Update {
                target_id: 3,
                value: FieldValue::Active(false),
            }
        );
    }

    #[test]
    fn unknown_action_is_format_error() {
        let err = parse_entry(4, r#"{"target_id":3,"action":"rename"}"#).unwrap_err();
        assert!(matches!(err, CodecError::Format { line: 4, .. }));
        assert!(err.to_string().contains("rename"));
    }

    #[test]
    fn immutable_field_update_is_rejected() {
        let err = parse_entry(
            1,
            r#"{"target_id":3,"action":"update","field":"creation_type","value":"manual"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unrecognized field"));
    }

    #[test]
    fn mistyped_value_is_rejected() {
        let err = parse_entry(
            1,
            r#"{"target_id":3,"action":"update","field":"marker","value":true}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::Format { line: 1, .. }));
    }

    #[test]
    fn mismatched_create_target_is_rejected() {
        let err = parse_entry(
            2,
            r#"{"target_id":7,"action":"create","id":6,"cell_id":1,"centroid":[0,0],"marker":[1,1],"creation_type":"manual","active":true}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::Format { line: 2, .. }));
    }

    #[test]
    fn read_skips_blank_lines_and_reports_real_line_numbers() {
        let log = "\n{\"target_id\":1,\"action\":\"delete\"}\n\nnot json\n";
        let err = read_audit_log(log.as_bytes()).unwrap_err();
        assert_eq!(err.line(), Some(4));
    }
}

//! Baseline snapshot of automated tensors (`raw_tensors.txt`).
//!
//! Manual tensors never appear here; they live only in the audit log.

use crate::codec::{write_json_line, CodecError, CodecResult};
use crate::model::entry::AuditEntry;
use crate::model::tensor::{CreationType, Tensor};
use crate::store::tensor_store::TensorStore;
use log::debug;
use std::io::{BufRead, Write};

/// Writes every automated tensor of `store` in id order.
///
/// Returns the number of tensors written.
pub fn write_raw_tensors<W: Write>(store: &TensorStore, mut writer: W) -> CodecResult<usize> {
    let mut written = 0;
    for tensor in store
        .tensors()
        .filter(|tensor| tensor.creation_type() == CreationType::Automated)
    {
        write_json_line(&mut writer, tensor)?;
        written += 1;
    }
    writer.flush()?;
    debug!("event=snapshot_write module=codec status=ok tensors={written}");
    Ok(written)
}

/// Builds a store from a baseline snapshot.
///
/// The returned store has an empty history.
///
/// # Errors
/// - `Format` for malformed lines or manual tensors.
/// - `Store` wrapping `DuplicateId` when an id repeats.
pub fn read_raw_tensors<R: BufRead>(reader: R) -> CodecResult<TensorStore> {
    let mut store = TensorStore::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let tensor = serde_json::from_str::<Tensor>(&line)
            .map_err(|err| CodecError::format(line_no, format!("invalid tensor: {err}")))?;
        if tensor.creation_type() != CreationType::Automated {
            return Err(CodecError::format(
                line_no,
                format!("tensor {} is not automated", tensor.id()),
            ));
        }
        store
            .apply_entry(&AuditEntry::Create(tensor))
            .map_err(|source| CodecError::Store {
                line: line_no,
                source,
            })?;
    }
    debug!(
        "event=snapshot_read module=codec status=ok tensors={}",
        store.len()
    );
    Ok(store)
}

//! Line-delimited JSON codecs for the baseline snapshot and the audit log.
//!
//! # Responsibility
//! - Persist automated tensors as a baseline independent of edits.
//! - Persist applied edits as ordered audit entries and replay them.
//!
//! # Invariants
//! - One JSON object per line; blank lines are ignored on read.
//! - Read paths reject malformed or unknown entries instead of skipping them,
//!   so replay never silently diverges from the live store.

use crate::store::StoreError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;

pub mod audit;
pub mod snapshot;

pub type CodecResult<T> = Result<T, CodecError>;

/// Failure while reading or writing a snapshot or audit log.
#[derive(Debug)]
pub enum CodecError {
    Io(std::io::Error),
    /// Line could not be decoded into a tensor or audit entry.
    Format { line: usize, message: String },
    /// Line decoded but could not be applied to the store.
    Store { line: usize, source: StoreError },
}

impl CodecError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }

    /// 1-based line number of the offending entry, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Io(_) => None,
            Self::Format { line, .. } | Self::Store { line, .. } => Some(*line),
        }
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Format { line, message } => write!(f, "line {line}: {message}"),
            Self::Store { line, source } => write!(f, "line {line}: {source}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Format { .. } => None,
            Self::Store { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Writes `value` as one JSON line for the write paths.
///
/// Serializer failures surface as `Io`; read paths report `Format` with a line
/// number instead.
pub(crate) fn write_json_line<W, T>(writer: &mut W, value: &T) -> CodecResult<()>
where
    W: Write,
    T: Serialize + ?Sized,
{
    serde_json::to_writer(&mut *writer, value).map_err(|err| CodecError::Io(err.into()))?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{write_json_line, CodecError};
    use std::collections::BTreeMap;

    #[test]
    fn write_json_line_appends_newline() {
        let mut out: Vec<u8> = Vec::new();
        write_json_line(&mut out, &[1, 2]).unwrap();
        assert_eq!(out, b"[1,2]\n");
    }

    #[test]
    fn serializer_failure_on_write_is_io() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "tuple keys are not valid json object keys");
        let err = write_json_line(&mut Vec::<u8>::new(), &map).unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
        assert_eq!(err.line(), None);
    }
}

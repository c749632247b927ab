//! Per-source analysis outcome.
//!
//! Each telemetry source resolves to one of four distinct cases, and
//! callers branch on the variant, never on sentinel field values. A
//! summary of all-zero readings is [`SourceOutcome::Present`]; a header-only
//! file is [`SourceOutcome::Empty`]; a missing file is
//! [`SourceOutcome::Unavailable`].

use serde::Serialize;

/// What a summarizer produced for one input source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SourceOutcome<T> {
    /// Enough valid data to compute a summary.
    Present(T),
    /// The input existed but held no usable readings. Distinct from a
    /// measured all-good result; callers must treat it as insufficient
    /// data.
    Empty,
    /// The input's structure did not match expectations (e.g. a required
    /// CSV column missing from the header).
    Incompatible(String),
    /// The input could not be opened or read.
    Unavailable(String),
}

impl<T> SourceOutcome<T> {
    /// The summary, if one was computed.
    pub fn summary(&self) -> Option<&T> {
        match self {
            Self::Present(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_accessor() {
        let present: SourceOutcome<u32> = SourceOutcome::Present(7);
        assert_eq!(present.summary(), Some(&7));
        assert!(present.is_present());

        let empty: SourceOutcome<u32> = SourceOutcome::Empty;
        assert_eq!(empty.summary(), None);
        assert!(!empty.is_present());
    }

    #[test]
    fn test_variants_serialize_with_status_tag() {
        let unavailable: SourceOutcome<u32> =
            SourceOutcome::Unavailable("no such file".to_string());
        let json = serde_json::to_value(&unavailable).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["detail"], "no such file");

        let empty: SourceOutcome<u32> = SourceOutcome::Empty;
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["status"], "empty");
    }
}

use chrono::{DateTime, Utc};

use crate::model::{NormalizedWeatherRecord, RawWeatherResponse};

/// How a run was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Manual,
    Scheduled,
}

/// Identifier of one run, e.g. `scheduled__2026-01-14T00:00:00+00:00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunId {
    pub kind: RunKind,
    pub logical_date: DateTime<Utc>,
}

impl RunId {
    pub fn manual(at: DateTime<Utc>) -> Self {
        Self {
            kind: RunKind::Manual,
            logical_date: at,
        }
    }

    pub fn scheduled(at: DateTime<Utc>) -> Self {
        Self {
            kind: RunKind::Scheduled,
            logical_date: at,
        }
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.kind {
            RunKind::Manual => "manual",
            RunKind::Scheduled => "scheduled",
        };
        write!(f, "{prefix}__{}", self.logical_date.to_rfc3339())
    }
}

/// Per-run results of each task, read by the task that follows it.
///
/// Lives for exactly one run; nothing is shared between runs.
#[derive(Debug)]
pub struct RunContext {
    run_id: RunId,
    fetched: Option<RawWeatherResponse>,
    transformed: Option<NormalizedWeatherRecord>,
}

impl RunContext {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            fetched: None,
            transformed: None,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn push_fetch(&mut self, raw: RawWeatherResponse) {
        self.fetched = Some(raw);
    }

    pub fn push_transform(&mut self, record: NormalizedWeatherRecord) {
        self.transformed = Some(record);
    }

    pub fn fetched(&self) -> Option<&RawWeatherResponse> {
        self.fetched.as_ref()
    }

    pub fn transformed(&self) -> Option<&NormalizedWeatherRecord> {
        self.transformed.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn run_id_formats_with_kind_prefix() {
        let at = Utc.with_ymd_and_hms(2026, 1, 14, 0, 0, 0).unwrap();
        assert_eq!(
            RunId::scheduled(at).to_string(),
            "scheduled__2026-01-14T00:00:00+00:00"
        );
        assert!(RunId::manual(at).to_string().starts_with("manual__"));
    }

    #[test]
    fn slots_start_empty_and_hold_pushed_values() {
        let at = Utc.with_ymd_and_hms(2026, 1, 14, 0, 0, 0).unwrap();
        let mut ctx = RunContext::new(RunId::manual(at));

        assert!(ctx.fetched().is_none());
        assert!(ctx.transformed().is_none());

        ctx.push_fetch(RawWeatherResponse::new(json!({ "current": {} })));

        assert_eq!(
            ctx.fetched().map(RawWeatherResponse::as_json),
            Some(&json!({ "current": {} }))
        );
        assert!(ctx.transformed().is_none());
    }
}

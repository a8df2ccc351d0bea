//! # Error Monitor
//!
//! Keeps a bounded, time-limited window of recent CLI failures and logs an
//! alert when failures pile up or the same kind of failure repeats.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

pub const DEFAULT_WINDOW_SIZE: usize = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(300);
pub const ERROR_RATE_THRESHOLD: usize = 10;
pub const CONSECUTIVE_THRESHOLD: u32 = 5;

#[derive(Debug, Clone)]
struct ErrorEvent {
    kind: &'static str,
    at: Instant,
}

#[derive(Debug, Default)]
struct MonitorState {
    window: VecDeque<ErrorEvent>,
    totals: BTreeMap<&'static str, u64>,
    total: u64,
    last_kind: Option<&'static str>,
    consecutive: u32,
    last_error_at: Option<DateTime<Utc>>,
}

/// Snapshot of the monitor, served from `/info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorSummary {
    /// Failures recorded since start
    pub total: u64,
    /// Failures still inside the window
    pub recent: usize,
    pub by_kind: BTreeMap<String, u64>,
    /// Per-kind counts of the failures still inside the window
    pub recent_by_kind: BTreeMap<String, u64>,
    pub consecutive: u32,
    pub last_kind: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

/// Process-wide record of CLI failures.
#[derive(Debug)]
pub struct ErrorMonitor {
    window_size: usize,
    window: Duration,
    state: Mutex<MonitorState>,
}

impl Default for ErrorMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_WINDOW)
    }
}

impl ErrorMonitor {
    pub fn new(window_size: usize, window: Duration) -> Self {
        Self { window_size: window_size.max(1), window, state: Mutex::new(MonitorState::default()) }
    }

    /// Record one failure of `kind` (see [`crate::errors::CliError::kind`]).
    pub fn record(&self, kind: &'static str, command: &str) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        self.prune(&mut state, now);
        state.window.push_back(ErrorEvent { kind, at: now });
        while state.window.len() > self.window_size {
            state.window.pop_front();
        }

        *state.totals.entry(kind).or_default() += 1;
        state.total += 1;
        state.last_error_at = Some(Utc::now());
        if state.last_kind == Some(kind) {
            state.consecutive += 1;
        } else {
            state.last_kind = Some(kind);
            state.consecutive = 1;
        }

        if state.window.len() >= ERROR_RATE_THRESHOLD {
            warn!(
                recent_errors = state.window.len(),
                window_secs = self.window.as_secs(),
                "High CLI error rate"
            );
        }
        if state.consecutive >= CONSECUTIVE_THRESHOLD {
            warn!(
                kind,
                consecutive = state.consecutive,
                command = %command,
                "Repeated CLI failures of the same kind"
            );
        }
    }

    /// Reset the consecutive-failure streak after a success.
    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.consecutive = 0;
        state.last_kind = None;
    }

    pub fn summary(&self) -> ErrorSummary {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.prune(&mut state, Instant::now());

        let mut recent_by_kind = BTreeMap::new();
        for event in &state.window {
            *recent_by_kind.entry(event.kind.to_string()).or_default() += 1;
        }

        ErrorSummary {
            total: state.total,
            recent: state.window.len(),
            by_kind: state.totals.iter().map(|(kind, count)| (kind.to_string(), *count)).collect(),
            recent_by_kind,
            consecutive: state.consecutive,
            last_kind: state.last_kind.map(str::to_string),
            last_error_at: state.last_error_at,
        }
    }

    fn prune(&self, state: &mut MonitorState, now: Instant) {
        while let Some(oldest) = state.window.front() {
            if now.duration_since(oldest.at) > self.window {
                state.window.pop_front();
            } else {
                break;
            }
        }
    }
}

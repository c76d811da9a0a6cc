use crate::metrics::SessionMetrics;
use crate::session::Phase;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Ordered notifications emitted by the session controller. Observational
/// only; nothing here feeds back into the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    SessionStarted {
        session_id: String,
        rounds_planned: u32,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
        round: u32,
    },
    BreathStarted {
        round: u32,
    },
    BreathEnded {
        round: u32,
    },
    HoldStarted {
        round: u32,
    },
    HoldEnded {
        round: u32,
        duration_secs: u64,
    },
    SessionEnded {
        metrics: SessionMetrics,
    },
}

pub trait EventSink {
    fn record(&mut self, event: SessionEvent);
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub event: SessionEvent,
}

/// In-memory event log capped to the most recent entries. Doubles as the
/// default sink so a controller always has somewhere to send events.
#[derive(Debug)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    max_entries: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

const DEFAULT_MAX_ENTRIES: usize = 1000;

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries belonging to one session, from its start event to its end.
    pub fn session_entries(&self, session_id: &str) -> Vec<&LogEntry> {
        let mut in_session = false;
        let mut out = Vec::new();
        for entry in &self.entries {
            match &entry.event {
                SessionEvent::SessionStarted { session_id: id, .. } => {
                    in_session = id == session_id;
                    if in_session {
                        out.push(entry);
                    }
                }
                SessionEvent::SessionEnded { .. } => {
                    if in_session {
                        out.push(entry);
                        in_session = false;
                    }
                }
                _ => {
                    if in_session {
                        out.push(entry);
                    }
                }
            }
        }
        out
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}

impl EventSink for EventLog {
    fn record(&mut self, event: SessionEvent) {
        self.entries.push(LogEntry {
            timestamp: Local::now(),
            event,
        });
        if self.entries.len() > self.max_entries {
            let overflow = self.entries.len() - self.max_entries;
            self.entries.drain(..overflow);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Bare-bones recording sink for tests that only care about event order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SessionEvent>,
}

impl EventSink for RecordingSink {
    fn record(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breath(round: u32) -> SessionEvent {
        SessionEvent::BreathStarted { round }
    }

    #[test]
    fn log_records_in_order() {
        let mut log = EventLog::new();
        log.record(breath(1));
        log.record(SessionEvent::BreathEnded { round: 1 });

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, breath(1));
        assert_eq!(entries[1].event, SessionEvent::BreathEnded { round: 1 });
        assert!(entries[1].timestamp >= entries[0].timestamp);
    }

    #[test]
    fn log_drops_oldest_entries_beyond_cap() {
        let mut log = EventLog::with_capacity(3);
        for round in 1..=5 {
            log.record(breath(round));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].event, breath(3));
        assert_eq!(entries[2].event, breath(5));
    }

    #[test]
    fn session_entries_are_scoped_by_id() {
        let mut log = EventLog::new();
        log.record(SessionEvent::SessionStarted {
            session_id: "a".into(),
            rounds_planned: 1,
        });
        log.record(breath(1));
        log.record(SessionEvent::SessionEnded {
            metrics: SessionMetrics::default(),
        });
        log.record(SessionEvent::SessionStarted {
            session_id: "b".into(),
            rounds_planned: 2,
        });
        log.record(breath(1));

        assert_eq!(log.session_entries("a").len(), 3);
        assert_eq!(log.session_entries("b").len(), 2);
        assert!(log.session_entries("missing").is_empty());
    }

    #[test]
    fn export_json_round_trips() {
        let mut log = EventLog::new();
        log.record(SessionEvent::HoldEnded {
            round: 2,
            duration_secs: 45,
        });

        let json = log.export_json().unwrap();
        let parsed: Vec<LogEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, log.entries());
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = EventLog::new();
        log.record(breath(1));
        log.clear();
        assert!(log.entries().is_empty());
    }
}

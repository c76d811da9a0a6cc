use crate::session::RoundRecord;
use crate::util::{mean, std_dev};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Aggregate numbers for one session, computed from its round records.
/// Shown on the summary screen and attached to the session-ended event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub completed_rounds: u32,
    pub total_breaths: u32,
    pub total_hold_secs: u64,
    pub avg_hold_secs: f64,
    pub hold_std_dev: f64,
    pub session_duration_secs: i64,
}

impl SessionMetrics {
    pub fn from_rounds(rounds: &[RoundRecord], started_at: DateTime<Local>) -> Self {
        let holds: Vec<f64> = rounds
            .iter()
            .map(|r| r.hold_duration_secs as f64)
            .collect();

        let ended_at = rounds.last().map(|r| r.ended_at).unwrap_or(started_at);

        Self {
            completed_rounds: rounds.len() as u32,
            total_breaths: rounds.iter().map(|r| r.breaths_completed).sum(),
            total_hold_secs: rounds.iter().map(|r| r.hold_duration_secs).sum(),
            avg_hold_secs: mean(&holds).unwrap_or(0.0),
            hold_std_dev: std_dev(&holds).unwrap_or(0.0),
            session_duration_secs: (ended_at - started_at).num_seconds().max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(round: u32, breaths: u32, hold: u64, offset_secs: i64) -> RoundRecord {
        let base = Local::now();
        RoundRecord {
            round_number: round,
            breaths_completed: breaths,
            hold_duration_secs: hold,
            started_at: base + Duration::seconds(offset_secs),
            ended_at: base + Duration::seconds(offset_secs + hold as i64),
        }
    }

    #[test]
    fn empty_rounds_produce_zeroed_metrics() {
        let metrics = SessionMetrics::from_rounds(&[], Local::now());
        assert_eq!(metrics, SessionMetrics::default());
    }

    #[test]
    fn aggregates_sum_across_rounds() {
        let started = Local::now();
        let rounds = vec![
            record(1, 40, 60, 0),
            record(2, 40, 90, 200),
            record(3, 40, 120, 400),
        ];
        let metrics = SessionMetrics::from_rounds(&rounds, started);

        assert_eq!(metrics.completed_rounds, 3);
        assert_eq!(metrics.total_breaths, 120);
        assert_eq!(metrics.total_hold_secs, 270);
        assert_eq!(metrics.avg_hold_secs, 90.0);
        assert!(metrics.hold_std_dev > 0.0);
        // 400s offset + 120s hold; allow a little slack for clock reads.
        assert!((520..=522).contains(&metrics.session_duration_secs));
    }

    #[test]
    fn identical_holds_have_zero_spread() {
        let rounds = vec![record(1, 10, 30, 0), record(2, 10, 30, 100)];
        let metrics = SessionMetrics::from_rounds(&rounds, Local::now());
        assert_eq!(metrics.avg_hold_secs, 30.0);
        assert_eq!(metrics.hold_std_dev, 0.0);
    }
}

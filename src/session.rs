use crate::analytics::{EventSink, SessionEvent};
use crate::cues::CueSink;
use crate::history::HistoryDb;
use crate::metrics::SessionMetrics;
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Phases of one breathing session. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Breathing,
    Hold,
    Recovery,
    Complete,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("breaths per round must be positive")]
    BreathsPerRound,
    #[error("breath interval must be positive")]
    BreathInterval,
    #[error("recovery duration must be positive")]
    Recovery,
    #[error("planned rounds must be at least 1")]
    RoundsPlanned,
}

/// Immutable per-session timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub breaths_per_round: u32,
    /// Duration of one inhale or exhale sub-phase.
    pub breath_interval_ms: u64,
    pub recovery_ms: u64,
    pub rounds_planned: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            breaths_per_round: 40,
            breath_interval_ms: 3000,
            recovery_ms: 30000,
            rounds_planned: 4,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.breaths_per_round == 0 {
            return Err(ConfigError::BreathsPerRound);
        }
        if self.breath_interval_ms == 0 {
            return Err(ConfigError::BreathInterval);
        }
        if self.recovery_ms == 0 {
            return Err(ConfigError::Recovery);
        }
        if self.rounds_planned == 0 {
            return Err(ConfigError::RoundsPlanned);
        }
        Ok(())
    }
}

/// One completed breathing + hold cycle, recorded when the hold ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_number: u32,
    pub breaths_completed: u32,
    pub hold_duration_secs: u64,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
}

/// Write-once record of a finished (or abandoned) session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Local>,
    pub rounds: Vec<RoundRecord>,
}

impl SessionSummary {
    pub fn metrics(&self) -> SessionMetrics {
        SessionMetrics::from_rounds(&self.rounds, self.created_at)
    }
}

/// The session controller: a timed state machine driving one breathing
/// exercise through its planned rounds.
///
/// All mutation happens through `start`, `end_hold`, `advance` and `abandon`,
/// which the event loop calls one at a time. Time is fed in as measured
/// elapsed durations; each phase keeps its own accumulator, zeroed on phase
/// entry, so a tick can never land in a phase it wasn't scheduled for.
pub struct Session {
    pub config: SessionConfig,
    pub phase: Phase,
    pub current_round: u32,
    pub breath_count: u32,
    pub is_inhaling: bool,
    breath_acc_ms: u64,
    hold_acc_ms: u64,
    recovery_acc_ms: u64,
    round_started_at: Option<DateTime<Local>>,
    rounds: Vec<RoundRecord>,
    session_id: Option<String>,
    session_started_at: Option<DateTime<Local>>,
    last_summary: Option<SessionSummary>,
    pub cues: Box<dyn CueSink>,
    pub events: Box<dyn EventSink>,
    pub history: Option<HistoryDb>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("current_round", &self.current_round)
            .field("breath_count", &self.breath_count)
            .field("is_inhaling", &self.is_inhaling)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Builds a controller in `Idle`. The config is the only thing that can
    /// fail here; collaborators are installed by the caller afterwards.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            phase: Phase::Idle,
            current_round: 1,
            breath_count: 0,
            is_inhaling: true,
            breath_acc_ms: 0,
            hold_acc_ms: 0,
            recovery_acc_ms: 0,
            round_started_at: None,
            rounds: Vec::new(),
            session_id: None,
            session_started_at: None,
            last_summary: None,
            cues: Box::new(crate::cues::NullCues),
            events: Box::new(crate::analytics::EventLog::new()),
            history: None,
        })
    }

    pub fn hold_elapsed_secs(&self) -> u64 {
        self.hold_acc_ms / 1000
    }

    pub fn recovery_remaining_ms(&self) -> u64 {
        self.config.recovery_ms.saturating_sub(self.recovery_acc_ms)
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// A session is active once started and until it completes or is torn down.
    pub fn is_active(&self) -> bool {
        self.session_id.is_some() && self.phase != Phase::Complete
    }

    /// Begin breathing. Accepted in `Idle` (between rounds or fresh) and in
    /// `Complete`, where it is equivalent to re-initializing to round 1.
    /// A no-op everywhere else, so stray double-presses are harmless.
    pub fn start(&mut self) {
        match self.phase {
            Phase::Complete => {
                self.reset_session_state();
                self.begin_breathing();
            }
            Phase::Idle => self.begin_breathing(),
            _ => {}
        }
    }

    fn begin_breathing(&mut self) {
        if self.session_id.is_none() {
            let id = Uuid::new_v4().to_string();
            self.session_started_at = Some(Local::now());
            self.events.record(SessionEvent::SessionStarted {
                session_id: id.clone(),
                rounds_planned: self.config.rounds_planned,
            });
            self.session_id = Some(id);
        }

        let from = self.phase;
        self.phase = Phase::Breathing;
        self.breath_count = 0;
        self.is_inhaling = true;
        self.breath_acc_ms = 0;
        self.round_started_at = Some(Local::now());

        self.emit_phase_change(from, Phase::Breathing);
        let _ = self.cues.keep_awake(true);
        let _ = self.cues.ambient_start();
        let _ = self.cues.inhale_cue();
        self.events.record(SessionEvent::BreathStarted {
            round: self.current_round,
        });
    }

    /// End the breath hold. Only valid in `Hold`; a no-op otherwise.
    pub fn end_hold(&mut self) {
        if self.phase != Phase::Hold {
            return;
        }

        let now = Local::now();
        let record = RoundRecord {
            round_number: self.current_round,
            breaths_completed: self.breath_count,
            hold_duration_secs: self.hold_elapsed_secs(),
            started_at: self.round_started_at.unwrap_or(now),
            ended_at: now,
        };
        self.events.record(SessionEvent::HoldEnded {
            round: self.current_round,
            duration_secs: record.hold_duration_secs,
        });
        self.rounds.push(record);

        self.phase = Phase::Recovery;
        self.recovery_acc_ms = 0;
        self.emit_phase_change(Phase::Hold, Phase::Recovery);
    }

    /// Feed measured wall-clock time into the active phase. Fires as many
    /// whole breath ticks / hold seconds / the recovery one-shot as the
    /// accumulated time covers. Idle and Complete ignore time entirely.
    pub fn advance(&mut self, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        match self.phase {
            Phase::Breathing => self.advance_breathing(ms),
            Phase::Hold => self.hold_acc_ms += ms,
            Phase::Recovery => self.advance_recovery(ms),
            Phase::Idle | Phase::Complete => {}
        }
    }

    fn advance_breathing(&mut self, ms: u64) {
        self.breath_acc_ms += ms;

        while self.breath_acc_ms >= self.config.breath_interval_ms {
            self.breath_acc_ms -= self.config.breath_interval_ms;
            self.breath_count += 1;
            self.is_inhaling = !self.is_inhaling;
            self.events.record(SessionEvent::BreathEnded {
                round: self.current_round,
            });

            if self.breath_count >= self.config.breaths_per_round {
                // The tick that reaches the limit is the last one; leftover
                // accumulated time must not leak into the hold.
                self.breath_acc_ms = 0;
                self.enter_hold();
                return;
            }

            self.events.record(SessionEvent::BreathStarted {
                round: self.current_round,
            });
            if self.is_inhaling {
                let _ = self.cues.inhale_cue();
            } else {
                let _ = self.cues.exhale_cue();
            }
        }
    }

    fn enter_hold(&mut self) {
        self.phase = Phase::Hold;
        self.hold_acc_ms = 0;
        self.emit_phase_change(Phase::Breathing, Phase::Hold);
        self.events.record(SessionEvent::HoldStarted {
            round: self.current_round,
        });
    }

    fn advance_recovery(&mut self, ms: u64) {
        self.recovery_acc_ms += ms;
        if self.recovery_acc_ms < self.config.recovery_ms {
            return;
        }

        if self.current_round < self.config.rounds_planned {
            let finished = self.current_round;
            self.current_round += 1;
            self.breath_count = 0;
            self.hold_acc_ms = 0;
            self.recovery_acc_ms = 0;
            self.phase = Phase::Idle;
            self.events.record(SessionEvent::PhaseChanged {
                from: Phase::Recovery,
                to: Phase::Idle,
                round: finished,
            });
        } else {
            self.finish_session();
        }
    }

    fn finish_session(&mut self) {
        let summary = SessionSummary {
            session_id: self.session_id.take().unwrap_or_default(),
            created_at: self.session_started_at.take().unwrap_or_else(Local::now),
            rounds: std::mem::take(&mut self.rounds),
        };

        self.emit_phase_change(Phase::Recovery, Phase::Complete);
        self.phase = Phase::Complete;
        self.current_round = 1;
        self.breath_count = 0;
        self.hold_acc_ms = 0;
        self.recovery_acc_ms = 0;

        self.events.record(SessionEvent::SessionEnded {
            metrics: summary.metrics(),
        });
        let _ = self.cues.ambient_stop();
        let _ = self.cues.keep_awake(false);
        if let Some(ref mut db) = self.history {
            // A failed write loses this session's history, nothing else.
            let _ = db.save_session(&summary);
        }
        self.last_summary = Some(summary);
    }

    /// Tear down an in-flight session (explicit reset or screen disposal).
    /// Completed rounds are still summarized and persisted; pending phase
    /// accumulators are cleared so nothing stale can fire afterwards.
    pub fn abandon(&mut self) {
        if self.session_id.is_some() {
            let summary = SessionSummary {
                session_id: self.session_id.take().unwrap_or_default(),
                created_at: self.session_started_at.take().unwrap_or_else(Local::now),
                rounds: std::mem::take(&mut self.rounds),
            };
            self.events.record(SessionEvent::SessionEnded {
                metrics: summary.metrics(),
            });
            if !summary.rounds.is_empty() {
                if let Some(ref mut db) = self.history {
                    let _ = db.save_session(&summary);
                }
                self.last_summary = Some(summary);
            }
        }
        let _ = self.cues.ambient_stop();
        let _ = self.cues.keep_awake(false);
        self.reset_session_state();
    }

    fn reset_session_state(&mut self) {
        self.phase = Phase::Idle;
        self.current_round = 1;
        self.breath_count = 0;
        self.is_inhaling = true;
        self.breath_acc_ms = 0;
        self.hold_acc_ms = 0;
        self.recovery_acc_ms = 0;
        self.round_started_at = None;
        self.rounds.clear();
        self.session_id = None;
        self.session_started_at = None;
    }

    fn emit_phase_change(&mut self, from: Phase, to: Phase) {
        self.events.record(SessionEvent::PhaseChanged {
            from,
            to,
            round: self.current_round,
        });
    }
}

//! Match timer.
//!
//! Phase machine `Running -> Ended -> Running`. The clock is polled on a
//! fixed interval; each poll reports what the room should broadcast.

use std::time::{Duration, Instant};

/// Match phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Match in progress.
    Running { started_at: Instant },
    /// Results shown, waiting for the reset.
    Ended { ended_at: Instant },
}

/// What a poll of the clock produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Still running; this much time is left.
    TimeLeft(Duration),
    /// The match just ended.
    MatchEnded,
    /// The reset delay elapsed; the clock is running again.
    ResetDue,
    /// Ended, still waiting for the reset.
    Waiting,
}

/// Per-room match timer.
#[derive(Debug, Clone)]
pub struct MatchClock {
    phase: MatchPhase,
    duration: Duration,
    reset_delay: Duration,
}

impl MatchClock {
    pub fn new(duration: Duration, reset_delay: Duration, now: Instant) -> Self {
        Self {
            phase: MatchPhase::Running { started_at: now },
            duration,
            reset_delay,
        }
    }

    #[inline]
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[inline]
    pub fn is_ended(&self) -> bool {
        matches!(self.phase, MatchPhase::Ended { .. })
    }

    /// Remaining match time (zero once ended).
    pub fn time_left(&self, now: Instant) -> Duration {
        match self.phase {
            MatchPhase::Running { started_at } => {
                self.duration.saturating_sub(now.saturating_duration_since(started_at))
            }
            MatchPhase::Ended { .. } => Duration::ZERO,
        }
    }

    /// Advance the phase machine to `now`.
    pub fn poll(&mut self, now: Instant) -> ClockEvent {
        match self.phase {
            MatchPhase::Running { started_at } => {
                let elapsed = now.saturating_duration_since(started_at);
                if elapsed >= self.duration {
                    self.phase = MatchPhase::Ended { ended_at: now };
                    ClockEvent::MatchEnded
                } else {
                    ClockEvent::TimeLeft(self.duration - elapsed)
                }
            }
            MatchPhase::Ended { ended_at } => {
                if now.saturating_duration_since(ended_at) >= self.reset_delay {
                    self.restart(now);
                    ClockEvent::ResetDue
                } else {
                    ClockEvent::Waiting
                }
            }
        }
    }

    /// Start a fresh match at `now`.
    pub fn restart(&mut self, now: Instant) {
        self.phase = MatchPhase::Running { started_at: now };
    }
}

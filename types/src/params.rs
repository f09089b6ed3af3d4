//! Avalanche parameters: the round-time breakpoints and yes-percentage
//! thresholds that govern how a node updates its position on a disputed
//! transaction.
//!
//! These values are part of the consensus contract: every node on a network
//! must run with the same breakpoints and thresholds, or their positions
//! will drift apart instead of converging. The defaults are the values the
//! live network uses; override them only for a private network or in tests.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ParamsError;

/// One of the four time windows of a consensus round.
///
/// Each phase carries its own threshold; later phases demand a larger share
/// of yes votes, so stalled disputes resolve toward excluding the transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Before the mid breakpoint.
    Initial,
    /// Between the mid and late breakpoints.
    Mid,
    /// Between the late and stuck breakpoints.
    Late,
    /// At or past the stuck breakpoint.
    Stuck,
}

/// Process-wide avalanche tuning.
///
/// Breakpoints are expressed as a percentage of the expected round duration
/// (values above 100 are normal: a round that runs long keeps escalating).
/// Thresholds are the yes-percentage a proposing node's weight must strictly
/// exceed to take the "yes" position during that phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvalancheParams {
    // ── Round-time breakpoints (percent of round) ───────────────────────
    /// Percent of round time at which the `Mid` phase begins.
    pub mid_consensus_time: u32,

    /// Percent of round time at which the `Late` phase begins.
    pub late_consensus_time: u32,

    /// Percent of round time at which the `Stuck` phase begins.
    pub stuck_consensus_time: u32,

    // ── Yes-percentage thresholds ────────────────────────────────────────
    /// Threshold during the `Initial` phase.
    pub init_consensus_pct: u32,

    /// Threshold during the `Mid` phase.
    pub mid_consensus_pct: u32,

    /// Threshold during the `Late` phase.
    pub late_consensus_pct: u32,

    /// Threshold during the `Stuck` phase.
    pub stuck_consensus_pct: u32,

    // ── Round timing ─────────────────────────────────────────────────────
    /// Lower bound (milliseconds) on the previous round's duration when
    /// converting elapsed time into a round percentage.
    pub min_consensus_ms: u64,
}

impl AvalancheParams {
    pub const MID_CONSENSUS_TIME: u32 = 50;
    pub const LATE_CONSENSUS_TIME: u32 = 85;
    pub const STUCK_CONSENSUS_TIME: u32 = 200;

    pub const INIT_CONSENSUS_PCT: u32 = 50;
    pub const MID_CONSENSUS_PCT: u32 = 65;
    pub const LATE_CONSENSUS_PCT: u32 = 70;
    pub const STUCK_CONSENSUS_PCT: u32 = 95;

    pub const MIN_CONSENSUS_MS: u64 = 5000;

    /// The values deployed on the live network.
    pub const fn network_defaults() -> Self {
        Self {
            mid_consensus_time: Self::MID_CONSENSUS_TIME,
            late_consensus_time: Self::LATE_CONSENSUS_TIME,
            stuck_consensus_time: Self::STUCK_CONSENSUS_TIME,
            init_consensus_pct: Self::INIT_CONSENSUS_PCT,
            mid_consensus_pct: Self::MID_CONSENSUS_PCT,
            late_consensus_pct: Self::LATE_CONSENSUS_PCT,
            stuck_consensus_pct: Self::STUCK_CONSENSUS_PCT,
            min_consensus_ms: Self::MIN_CONSENSUS_MS,
        }
    }

    /// Which phase of the round `percent_time` falls in.
    pub fn phase_for(&self, percent_time: u32) -> RoundPhase {
        if percent_time < self.mid_consensus_time {
            RoundPhase::Initial
        } else if percent_time < self.late_consensus_time {
            RoundPhase::Mid
        } else if percent_time < self.stuck_consensus_time {
            RoundPhase::Late
        } else {
            RoundPhase::Stuck
        }
    }

    /// The yes-percentage threshold for a phase.
    pub fn threshold(&self, phase: RoundPhase) -> u32 {
        match phase {
            RoundPhase::Initial => self.init_consensus_pct,
            RoundPhase::Mid => self.mid_consensus_pct,
            RoundPhase::Late => self.late_consensus_pct,
            RoundPhase::Stuck => self.stuck_consensus_pct,
        }
    }

    /// The yes-percentage threshold in force at `percent_time`.
    pub fn threshold_for(&self, percent_time: u32) -> u32 {
        self.threshold(self.phase_for(percent_time))
    }

    /// Convert time spent in the current round into a percentage of the
    /// previous round's duration.
    ///
    /// The previous round is never taken to be shorter than
    /// `min_consensus_ms`, so a very fast previous round does not rush the
    /// current one through its phases.
    pub fn percent_time_elapsed(&self, elapsed: Duration, previous_round: Duration) -> u32 {
        let base = previous_round
            .as_millis()
            .max(u128::from(self.min_consensus_ms))
            .max(1);
        let percent = elapsed.as_millis().saturating_mul(100) / base;
        u32::try_from(percent).unwrap_or(u32::MAX)
    }

    /// Check that the parameters describe a usable schedule.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.mid_consensus_time == 0 {
            return Err(ParamsError::ZeroBreakpoint("mid_consensus_time"));
        }
        if self.mid_consensus_time >= self.late_consensus_time
            || self.late_consensus_time >= self.stuck_consensus_time
        {
            return Err(ParamsError::NonIncreasingBreakpoints {
                mid: self.mid_consensus_time,
                late: self.late_consensus_time,
                stuck: self.stuck_consensus_time,
            });
        }

        for (name, value) in [
            ("init_consensus_pct", self.init_consensus_pct),
            ("mid_consensus_pct", self.mid_consensus_pct),
            ("late_consensus_pct", self.late_consensus_pct),
            ("stuck_consensus_pct", self.stuck_consensus_pct),
        ] {
            if value > 100 {
                return Err(ParamsError::ThresholdOutOfRange { name, value });
            }
        }

        if self.min_consensus_ms == 0 {
            return Err(ParamsError::ZeroMinConsensus);
        }
        Ok(())
    }

    /// Load parameters from a TOML file. Missing keys take network defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse parameters from a TOML string. Missing keys take network defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ParamsError> {
        let params: Self = toml::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    /// Serialize the parameters to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("AvalancheParams is always serializable to TOML")
    }
}

/// Default is the live network configuration.
impl Default for AvalancheParams {
    fn default() -> Self {
        Self::network_defaults()
    }
}

use serde::{Deserialize, Serialize};

/// Rest period length used when nothing else is configured.
pub const DEFAULT_REST_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPhase {
    Match,
    Rest,
}

/// The two fixed match-period lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationPreset {
    /// Three-minute competition period.
    Preset180,
    /// Five-minute training period.
    Preset300,
}

impl DurationPreset {
    pub fn secs(self) -> u32 {
        match self {
            DurationPreset::Preset180 => 180,
            DurationPreset::Preset300 => 300,
        }
    }

    pub fn minutes(self) -> u32 {
        self.secs() / 60
    }

    /// The other preset.
    pub fn toggled(self) -> Self {
        match self {
            DurationPreset::Preset180 => DurationPreset::Preset300,
            DurationPreset::Preset300 => DurationPreset::Preset180,
        }
    }
}

impl Default for DurationPreset {
    fn default() -> Self {
        DurationPreset::Preset180
    }
}

/// Observable state of the match clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    pub remaining_secs: u32,
    pub running: bool,
    pub phase: MatchPhase,
    pub duration: DurationPreset,
    /// Match time saved when leaving Match for Rest.
    pub breakpoint_secs: u32,
}

impl ClockState {
    pub fn readout(&self) -> ClockReadout {
        ClockReadout::from_secs(self.remaining_secs)
    }
}

/// Minutes/seconds split of a remaining-seconds value, as shown on the
/// clock digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReadout {
    pub minutes: u32,
    pub seconds: u32,
}

impl ClockReadout {
    pub fn from_secs(secs: u32) -> Self {
        Self {
            minutes: secs / 60,
            seconds: secs % 60,
        }
    }
}

impl std::fmt::Display for ClockReadout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

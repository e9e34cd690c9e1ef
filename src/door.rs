// MIT License - Copyright (c) 2026 Peter Wright
// Door position model

use std::fmt;

use crate::constants::SENSOR_TRIGGER_THRESHOLD;

/// Position of the garage door as derived from the two rail sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DoorState {
    /// No classification yet on the current connection. Never reported.
    #[default]
    Unknown,
    /// Neither sensor triggered: the door is travelling.
    Moving,
    /// Only the bottom sensor triggered.
    Closed,
    /// Only the top sensor triggered.
    Opened,
    /// Both sensors triggered, which the door cannot physically do.
    Invalid,
}

impl DoorState {
    /// Classify a pair of sensor readings.
    ///
    /// Bit 1 is "top sensor triggered", bit 0 is "bottom sensor triggered":
    /// 0 = Moving, 1 = Closed, 2 = Opened, 3 = Invalid.
    pub fn classify(top: u32, bottom: u32) -> Self {
        let top_bit = if top < SENSOR_TRIGGER_THRESHOLD { 2 } else { 0 };
        let bottom_bit = if bottom < SENSOR_TRIGGER_THRESHOLD { 1 } else { 0 };
        Self::from_bits(top_bit | bottom_bit)
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Moving,
            1 => Self::Closed,
            2 => Self::Opened,
            _ => Self::Invalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Moving => "moving",
            Self::Closed => "closed",
            Self::Opened => "opened",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remembers the last reported state so that only transitions are reported.
#[derive(Debug, Default)]
pub struct DoorStateTracker {
    last: DoorState,
}

impl DoorStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> DoorState {
        self.last
    }

    /// Record a classification. Returns the state if it must be reported.
    pub fn update(&mut self, state: DoorState) -> Option<DoorState> {
        if state == self.last {
            return None;
        }
        self.last = state;
        Some(state)
    }

    /// Forget the last report, e.g. after the connection dropped.
    pub fn reset(&mut self) {
        self.last = DoorState::Unknown;
    }
}

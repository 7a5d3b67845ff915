//! Hardware event kinds and pin roles.

use std::fmt;
use std::str::FromStr;

use crate::error::HardwareError;

/// Discrete hardware transitions the monitor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ButtonPress,
    ButtonRelease,
    MotionDetected,
    MotionCleared,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        Self::ButtonPress,
        Self::ButtonRelease,
        Self::MotionDetected,
        Self::MotionCleared,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ButtonPress => "button_press",
            Self::ButtonRelease => "button_release",
            Self::MotionDetected => "motion_detected",
            Self::MotionCleared => "motion_cleared",
        }
    }

    /// Value mirrored into the world model for the component.
    pub fn state_label(&self) -> &'static str {
        match self {
            Self::ButtonPress => "pressed",
            Self::ButtonRelease => "released",
            Self::MotionDetected => "active",
            Self::MotionCleared => "inactive",
        }
    }

    /// Text appended to the world model's hardware events.
    pub fn description(&self) -> String {
        format!("Hardware event: {}", self.as_str())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| HardwareError::UnknownEvent(s.to_string()))
    }
}

/// What a monitored input pin is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    /// Push button with pull-up: LOW means pressed.
    Button,
    /// PIR sensor: HIGH means motion.
    MotionSensor,
}

impl PinRole {
    /// World model component name.
    pub fn component(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::MotionSensor => "motion_sensor",
        }
    }

    /// Event produced when the pin changes to `level`.
    pub fn classify(&self, level: bool) -> EventKind {
        match (self, level) {
            (Self::Button, false) => EventKind::ButtonPress,
            (Self::Button, true) => EventKind::ButtonRelease,
            (Self::MotionSensor, true) => EventKind::MotionDetected,
            (Self::MotionSensor, false) => EventKind::MotionCleared,
        }
    }
}

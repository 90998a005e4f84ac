//! Domain values shared by the reconciler, the publisher and their ports.

use core::fmt;
use serde::Serialize;

// ───────────────────────────────────────────────────────────────
// Location
// ───────────────────────────────────────────────────────────────

/// One location reading.  `(0.0, 0.0)` is the "no fix" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationSample {
    /// Sentinel the sensor returns when it has no fix.
    pub const NO_FIX: Self = Self {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// `false` only for the exact-zero sentinel.  A single zero coordinate
    /// is a real (if unusual) position and is published.
    pub fn has_fix(&self) -> bool {
        !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Command fields
// ───────────────────────────────────────────────────────────────

/// A remote boolean flag mirrored onto a local output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandField {
    Light,
    Alarm,
    Position,
}

impl CommandField {
    /// Evaluation order within one reconciler cycle.
    pub const ALL: [Self; 3] = [Self::Light, Self::Alarm, Self::Position];

    pub const fn index(self) -> usize {
        match self {
            Self::Light => 0,
            Self::Alarm => 1,
            Self::Position => 2,
        }
    }
}

impl fmt::Display for CommandField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Alarm => write!(f, "alarm"),
            Self::Position => write!(f, "position"),
        }
    }
}

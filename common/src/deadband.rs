use serde::{Deserialize, Serialize};

/// Engage/disengage margins for one direction.
///
/// `deadband` is how far past the setpoint the temperature must drift before
/// the action engages; `overrun` is how far it must be driven past the
/// setpoint in the other direction before the action stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub deadband: f32,
    pub overrun: f32,
}

impl Band {
    pub fn symmetric(hysteresis: f32) -> Self {
        Self {
            deadband: hysteresis,
            overrun: hysteresis,
        }
    }

    /// `error` is positive when the temperature is on the side that needs
    /// correcting.
    pub fn wants(&self, error: f32, engaged: bool) -> bool {
        if engaged {
            error > -self.overrun
        } else {
            error >= self.deadband
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeadbandOverrun {
    pub heat: Band,
    pub cool: Band,
}

impl DeadbandOverrun {
    pub fn from_hysteresis(hysteresis: f32) -> Self {
        Self {
            heat: Band::symmetric(hysteresis),
            cool: Band::symmetric(hysteresis),
        }
    }
}

impl Default for DeadbandOverrun {
    fn default() -> Self {
        Self::from_hysteresis(0.5)
    }
}

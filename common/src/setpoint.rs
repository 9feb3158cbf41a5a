use serde::{Deserialize, Serialize};

use crate::error::SetpointError;

/// One target temperature, or a low/high band when both directions are
/// configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetTempConfig {
    SinglePoint { target: f32 },
    DualPoint { low: f32, high: f32 },
}

impl TargetTempConfig {
    pub fn single(target: f32) -> Self {
        Self::SinglePoint { target }
    }

    pub fn dual(low: f32, high: f32) -> Self {
        Self::DualPoint { low, high }
    }

    /// Threshold the heating branch compares against.
    pub fn low(&self) -> f32 {
        match *self {
            Self::SinglePoint { target } => target,
            Self::DualPoint { low, .. } => low,
        }
    }

    /// Threshold the cooling branch compares against.
    pub fn high(&self) -> f32 {
        match *self {
            Self::SinglePoint { target } => target,
            Self::DualPoint { high, .. } => high,
        }
    }

    pub fn midpoint(&self) -> f32 {
        (self.low() + self.high()) / 2.0
    }

    pub fn is_dual(&self) -> bool {
        matches!(self, Self::DualPoint { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SinglePoint { .. } => "single-point",
            Self::DualPoint { .. } => "dual-point",
        }
    }

    pub fn check(&self, min_differential: f32) -> Result<(), SetpointError> {
        match *self {
            Self::SinglePoint { target } if !target.is_finite() => Err(SetpointError::NonFinite),
            Self::SinglePoint { .. } => Ok(()),
            Self::DualPoint { low, high } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(SetpointError::NonFinite);
                }
                if low > high - min_differential {
                    return Err(SetpointError::DifferentialViolated {
                        low,
                        high,
                        differential: min_differential,
                    });
                }
                Ok(())
            }
        }
    }
}

/// The normal profile plus an optional away profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SetpointModel {
    normal: TargetTempConfig,
    away: Option<TargetTempConfig>,
    min_differential: f32,
}

impl SetpointModel {
    pub fn new(
        normal: TargetTempConfig,
        away: Option<TargetTempConfig>,
        min_differential: f32,
    ) -> Self {
        Self {
            normal,
            away,
            min_differential,
        }
    }

    /// Away falls back to the normal profile when none is configured.
    pub fn get_active_config(&self, away: bool) -> TargetTempConfig {
        match (away, self.away) {
            (true, Some(profile)) => profile,
            _ => self.normal,
        }
    }

    pub fn has_away(&self) -> bool {
        self.away.is_some()
    }

    pub fn min_differential(&self) -> f32 {
        self.min_differential
    }

    /// Checks that `requested` can replace the active profile.
    pub fn validate_replacement(
        &self,
        away: bool,
        requested: &TargetTempConfig,
    ) -> Result<(), SetpointError> {
        let active = self.get_active_config(away);
        if active.is_dual() != requested.is_dual() {
            return Err(SetpointError::ShapeMismatch {
                expected: active.kind(),
                got: requested.kind(),
            });
        }
        requested.check(self.min_differential)
    }

    /// Replaces the active profile's values. Returns whether anything changed.
    pub fn replace_active(
        &mut self,
        away: bool,
        requested: TargetTempConfig,
    ) -> Result<bool, SetpointError> {
        self.validate_replacement(away, &requested)?;
        let slot = match (away, self.away.as_mut()) {
            (true, Some(profile)) => profile,
            _ => &mut self.normal,
        };
        if *slot == requested {
            return Ok(false);
        }
        *slot = requested;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn away_profile_swaps_immediately() {
        let model = SetpointModel::new(
            TargetTempConfig::single(20.0),
            Some(TargetTempConfig::single(16.0)),
            0.5,
        );

        assert_eq!(model.get_active_config(false).high(), 20.0);
        assert_eq!(model.get_active_config(true).high(), 16.0);
    }

    #[test]
    fn away_without_profile_reads_normal() {
        let model = SetpointModel::new(TargetTempConfig::dual(18.0, 22.0), None, 0.5);
        assert_eq!(model.get_active_config(true), TargetTempConfig::dual(18.0, 22.0));
    }

    #[test]
    fn single_point_serves_both_thresholds() {
        let target = TargetTempConfig::single(21.0);
        assert_eq!(target.low(), 21.0);
        assert_eq!(target.high(), 21.0);
        assert_eq!(TargetTempConfig::dual(18.0, 22.0).midpoint(), 20.0);
    }

    #[test]
    fn replacement_enforces_shape_and_differential() {
        let mut model = SetpointModel::new(TargetTempConfig::dual(18.0, 22.0), None, 0.5);

        assert_eq!(
            model.replace_active(false, TargetTempConfig::single(20.0)),
            Err(SetpointError::ShapeMismatch {
                expected: "dual-point",
                got: "single-point",
            })
        );
        assert!(matches!(
            model.replace_active(false, TargetTempConfig::dual(21.8, 22.0)),
            Err(SetpointError::DifferentialViolated { .. })
        ));
        assert_eq!(
            model.replace_active(false, TargetTempConfig::dual(19.0, 23.0)),
            Ok(true)
        );
        assert_eq!(
            model.replace_active(false, TargetTempConfig::dual(19.0, 23.0)),
            Ok(false)
        );
        assert_eq!(model.get_active_config(false).low(), 19.0);
    }

    #[test]
    fn replacement_only_touches_active_profile() {
        let mut model = SetpointModel::new(
            TargetTempConfig::single(20.0),
            Some(TargetTempConfig::single(16.0)),
            0.5,
        );

        assert_eq!(model.replace_active(true, TargetTempConfig::single(15.0)), Ok(true));
        assert_eq!(model.get_active_config(false).high(), 20.0);
        assert_eq!(model.get_active_config(true).high(), 15.0);
    }

    #[test]
    fn non_finite_targets_are_rejected() {
        assert_eq!(
            TargetTempConfig::single(f32::NAN).check(0.5),
            Err(SetpointError::NonFinite)
        );
    }
}

use std::collections::BTreeSet;

use strum::IntoEnumIterator;

use crate::types::{ClimateAction, ClimateMode, FanMode, SwingMode};

/// A single thing the configured device can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Action(ClimateAction),
    Mode(ClimateMode),
    FanMode(FanMode),
    SwingMode(SwingMode),
    AwayPreset,
}

/// Read-only capability flags derived once from configuration.
///
/// Mode flags are never stored directly: they are derived from the action
/// flags, so a mode that drives two actions is only present when both are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    flags: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn derive(
        actions: impl IntoIterator<Item = ClimateAction>,
        fan_modes: impl IntoIterator<Item = FanMode>,
        swing_modes: impl IntoIterator<Item = SwingMode>,
        away: bool,
    ) -> Self {
        let mut flags: BTreeSet<Capability> = actions.into_iter().map(Capability::Action).collect();
        flags.insert(Capability::Action(ClimateAction::Idle));

        let modes: Vec<_> = ClimateMode::iter()
            .filter(|mode| {
                mode.required_actions()
                    .iter()
                    .all(|action| flags.contains(&Capability::Action(*action)))
            })
            .collect();
        flags.extend(modes.into_iter().map(Capability::Mode));
        flags.extend(fan_modes.into_iter().map(Capability::FanMode));
        flags.extend(swing_modes.into_iter().map(Capability::SwingMode));
        if away {
            flags.insert(Capability::AwayPreset);
        }

        Self { flags }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.flags.contains(&capability)
    }

    pub fn supports_action(&self, action: ClimateAction) -> bool {
        self.supports(Capability::Action(action))
    }

    pub fn supports_mode(&self, mode: ClimateMode) -> bool {
        self.supports(Capability::Mode(mode))
    }

    pub fn supports_fan_mode(&self, fan_mode: FanMode) -> bool {
        self.supports(Capability::FanMode(fan_mode))
    }

    pub fn supports_swing_mode(&self, swing_mode: SwingMode) -> bool {
        self.supports(Capability::SwingMode(swing_mode))
    }

    pub fn supports_away(&self) -> bool {
        self.supports(Capability::AwayPreset)
    }

    pub fn modes(&self) -> impl Iterator<Item = ClimateMode> + '_ {
        self.flags.iter().filter_map(|flag| match flag {
            Capability::Mode(mode) => Some(*mode),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn heat_cool_requires_both_actions() {
        let heat_only = CapabilitySet::derive([ClimateAction::Heating], [], [], false);
        assert!(heat_only.supports_mode(ClimateMode::Heat));
        assert!(!heat_only.supports_mode(ClimateMode::HeatCool));
        assert!(!heat_only.supports_mode(ClimateMode::Auto));

        let both = CapabilitySet::derive(
            [ClimateAction::Heating, ClimateAction::Cooling],
            [],
            [],
            false,
        );
        assert!(both.supports_mode(ClimateMode::HeatCool));
        assert!(both.supports_mode(ClimateMode::Auto));
    }

    #[test]
    fn idle_and_off_are_always_available() {
        let caps = CapabilitySet::derive([ClimateAction::Drying], [], [], false);
        assert!(caps.supports_action(ClimateAction::Idle));
        assert_eq!(
            caps.modes().collect::<Vec<_>>(),
            vec![ClimateMode::Off, ClimateMode::Dry]
        );
    }

    #[test]
    fn fan_and_swing_flags_are_keyed_by_variant() {
        let caps = CapabilitySet::derive(
            [ClimateAction::FanOnly],
            [FanMode::Low, FanMode::High],
            [SwingMode::Vertical],
            true,
        );
        assert!(caps.supports_fan_mode(FanMode::Low));
        assert!(!caps.supports_fan_mode(FanMode::Medium));
        assert!(caps.supports_swing_mode(SwingMode::Vertical));
        assert!(!caps.supports_swing_mode(SwingMode::Both));
        assert!(caps.supports_away());
    }
}

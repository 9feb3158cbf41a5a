use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    capability::CapabilitySet,
    deadband::{Band, DeadbandOverrun},
    dispatch::Trigger,
    error::ConfigError,
    setpoint::{SetpointModel, TargetTempConfig},
    types::{ClimateAction, ClimateMode, FanMode, SwingMode},
};

const KEY_LOW: &str = "default_target_temperature_low";
const KEY_HIGH: &str = "default_target_temperature_high";

const CLIMATE_ACTIONS: [ClimateAction; 4] = [
    ClimateAction::Heating,
    ClimateAction::Cooling,
    ClimateAction::Drying,
    ClimateAction::FanOnly,
];

/// Engine timing and sensor limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermostatConfig {
    pub min_cycle_ms: u64,
    pub sensor_stale_timeout_ms: u64,
    pub state_publish_interval_ms: u64,
    pub min_valid_temp: f32,
    pub max_valid_temp: f32,
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            min_cycle_ms: 0,
            sensor_stale_timeout_ms: 300_000,
            state_publish_interval_ms: 10_000,
            min_valid_temp: -40.0,
            max_valid_temp: 150.0,
        }
    }
}

impl ThermostatConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !self.min_valid_temp.is_finite()
            || !self.max_valid_temp.is_finite()
            || self.min_valid_temp >= self.max_valid_temp
        {
            self.min_valid_temp = defaults.min_valid_temp;
            self.max_valid_temp = defaults.max_valid_temp;
        }
        self.state_publish_interval_ms = self.state_publish_interval_ms.max(1_000);
        if self.sensor_stale_timeout_ms == 0 {
            self.sensor_stale_timeout_ms = defaults.sensor_stale_timeout_ms;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwayConfig {
    #[serde(default)]
    pub default_target_temperature_low: Option<f32>,
    #[serde(default)]
    pub default_target_temperature_high: Option<f32>,
}

fn default_differential() -> f32 {
    0.5
}

fn default_hysteresis() -> f32 {
    0.5
}

/// Declarative description of a thermostat: which action sequences exist,
/// which mode/fan/swing triggers are wired, and the default setpoints.
///
/// Action sequences are opaque identifiers owned by the automation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClimateConfig {
    pub idle_action: String,
    #[serde(default)]
    pub actions: BTreeMap<ClimateAction, String>,
    #[serde(default)]
    pub mode_triggers: BTreeMap<ClimateMode, String>,
    #[serde(default)]
    pub fan_mode_triggers: BTreeMap<FanMode, String>,
    #[serde(default)]
    pub swing_mode_triggers: BTreeMap<SwingMode, String>,
    #[serde(default)]
    pub target_temperature_change_action: Option<String>,
    #[serde(default)]
    pub default_mode: ClimateMode,
    #[serde(default)]
    pub default_target_temperature_low: Option<f32>,
    #[serde(default)]
    pub default_target_temperature_high: Option<f32>,
    #[serde(default = "default_differential")]
    pub set_point_minimum_differential: f32,
    #[serde(default)]
    pub heat_deadband: Option<f32>,
    #[serde(default)]
    pub heat_overrun: Option<f32>,
    #[serde(default)]
    pub cool_deadband: Option<f32>,
    #[serde(default)]
    pub cool_overrun: Option<f32>,
    #[serde(default = "default_hysteresis")]
    pub hysteresis: f32,
    #[serde(default)]
    pub fan_only_cooling: bool,
    #[serde(default)]
    pub away_config: Option<AwayConfig>,
}

/// Everything the engine needs, derived from a validated [`ClimateConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateSettings {
    pub capabilities: CapabilitySet,
    /// Absent when no configured action compares against a temperature
    /// (dry-only, or fan-only without `fan_only_cooling`).
    pub setpoints: Option<SetpointModel>,
    pub bands: DeadbandOverrun,
    pub default_mode: ClimateMode,
    pub fan_only_cooling: bool,
}

impl ClimateConfig {
    /// Minimal config with an idle action and nothing else.
    pub fn new(idle_action: impl Into<String>) -> Self {
        Self {
            idle_action: idle_action.into(),
            actions: BTreeMap::new(),
            mode_triggers: BTreeMap::new(),
            fan_mode_triggers: BTreeMap::new(),
            swing_mode_triggers: BTreeMap::new(),
            target_temperature_change_action: None,
            default_mode: ClimateMode::Off,
            default_target_temperature_low: None,
            default_target_temperature_high: None,
            set_point_minimum_differential: default_differential(),
            heat_deadband: None,
            heat_overrun: None,
            cool_deadband: None,
            cool_overrun: None,
            hysteresis: default_hysteresis(),
            fan_only_cooling: false,
            away_config: None,
        }
    }

    pub fn has_action(&self, action: ClimateAction) -> bool {
        action == ClimateAction::Idle || self.actions.contains_key(&action)
    }

    /// Every configured action sequence and the trigger that runs it.
    pub fn triggers(&self) -> Vec<(Trigger, &str)> {
        let mut triggers = vec![(
            Trigger::Action(ClimateAction::Idle),
            self.idle_action.as_str(),
        )];
        triggers.extend(
            self.actions
                .iter()
                .filter(|(action, _)| **action != ClimateAction::Idle)
                .map(|(action, seq)| (Trigger::Action(*action), seq.as_str())),
        );
        triggers.extend(
            self.mode_triggers
                .iter()
                .map(|(mode, seq)| (Trigger::Mode(*mode), seq.as_str())),
        );
        triggers.extend(
            self.fan_mode_triggers
                .iter()
                .map(|(fan_mode, seq)| (Trigger::FanMode(*fan_mode), seq.as_str())),
        );
        triggers.extend(
            self.swing_mode_triggers
                .iter()
                .map(|(swing_mode, seq)| (Trigger::SwingMode(*swing_mode), seq.as_str())),
        );
        if let Some(seq) = &self.target_temperature_change_action {
            triggers.push((Trigger::TargetTemperatureChange, seq.as_str()));
        }
        triggers
    }

    /// Heat and cool (or fan-only cooling) together need a low/high band.
    pub fn two_points_available(&self) -> bool {
        self.has_action(ClimateAction::Heating)
            && (self.has_action(ClimateAction::Cooling)
                || (self.fan_only_cooling && self.has_action(ClimateAction::FanOnly)))
    }

    fn temperature_requirements(&self) -> [(&'static str, Vec<ClimateAction>); 2] {
        let mut high = vec![ClimateAction::Cooling];
        if self.fan_only_cooling {
            high.push(ClimateAction::FanOnly);
        }
        [(KEY_HIGH, high), (KEY_LOW, vec![ClimateAction::Heating])]
    }

    pub fn validate(&self) -> Result<ClimateSettings, ConfigError> {
        if self.actions.contains_key(&ClimateAction::Idle) {
            return Err(ConfigError::IdleInActions);
        }
        if !CLIMATE_ACTIONS.iter().any(|action| self.has_action(*action)) {
            return Err(ConfigError::NoClimateAction);
        }

        for mode in self.mode_triggers.keys() {
            if let Some(action) = self.first_missing_action(*mode) {
                return Err(ConfigError::ModeMissingAction {
                    trigger: mode.config_key(),
                    action: action.config_key(),
                });
            }
        }

        let requirements = self.temperature_requirements();
        for (key, actions) in &requirements {
            let value = temperature_for(
                *key,
                self.default_target_temperature_low,
                self.default_target_temperature_high,
            );
            self.check_temperature_presence(*key, actions, value, false)?;
        }

        if let Some(away) = &self.away_config {
            for (key, actions) in &requirements {
                let value = temperature_for(
                    *key,
                    away.default_target_temperature_low,
                    away.default_target_temperature_high,
                );
                self.check_temperature_presence(*key, actions, value, true)?;
            }
        }

        if let Some(action) = self.first_missing_action(self.default_mode) {
            return Err(ConfigError::DefaultModeMissingAction {
                mode: self.default_mode,
                action: action.config_key(),
            });
        }

        let bands = self.bands()?;
        check_band("set_point_minimum_differential", self.set_point_minimum_differential)?;

        let setpoints = self.setpoints()?;
        let capabilities = CapabilitySet::derive(
            self.actions.keys().copied(),
            self.fan_mode_triggers.keys().copied(),
            self.swing_mode_triggers.keys().copied(),
            self.away_config.is_some() && setpoints.is_some(),
        );

        Ok(ClimateSettings {
            capabilities,
            setpoints,
            bands,
            default_mode: self.default_mode,
            fan_only_cooling: self.fan_only_cooling,
        })
    }

    fn first_missing_action(&self, mode: ClimateMode) -> Option<ClimateAction> {
        mode.required_actions()
            .iter()
            .copied()
            .find(|action| !self.has_action(*action))
    }

    fn check_temperature_presence(
        &self,
        key: &'static str,
        actions: &[ClimateAction],
        value: Option<f32>,
        away: bool,
    ) -> Result<(), ConfigError> {
        let wanted_by = actions.iter().copied().find(|action| self.has_action(*action));
        match (value, wanted_by) {
            (None, Some(action)) if away => Err(ConfigError::MissingAwayTemperature {
                key,
                action: action.config_key(),
            }),
            (None, Some(action)) => Err(ConfigError::MissingTemperature {
                key,
                action: action.config_key(),
            }),
            (Some(_), None) if away => Err(ConfigError::OrphanAwayTemperature {
                key,
                action: actions[0].config_key(),
            }),
            (Some(_), None) => Err(ConfigError::OrphanTemperature {
                key,
                action: actions[0].config_key(),
            }),
            (Some(value), Some(_)) if !value.is_finite() => {
                Err(ConfigError::NonFiniteTemperature { key, value })
            }
            _ => Ok(()),
        }
    }

    fn bands(&self) -> Result<DeadbandOverrun, ConfigError> {
        check_band("hysteresis", self.hysteresis)?;
        let pick = |key: &'static str, value: Option<f32>| -> Result<f32, ConfigError> {
            let value = value.unwrap_or(self.hysteresis);
            check_band(key, value)?;
            Ok(value)
        };

        Ok(DeadbandOverrun {
            heat: Band {
                deadband: pick("heat_deadband", self.heat_deadband)?,
                overrun: pick("heat_overrun", self.heat_overrun)?,
            },
            cool: Band {
                deadband: pick("cool_deadband", self.cool_deadband)?,
                overrun: pick("cool_overrun", self.cool_overrun)?,
            },
        })
    }

    fn setpoints(&self) -> Result<Option<SetpointModel>, ConfigError> {
        let two_points = self.two_points_available();
        let differential = self.set_point_minimum_differential;

        let Some(normal) = build_target(
            "normal",
            self.default_target_temperature_low,
            self.default_target_temperature_high,
            two_points,
            differential,
        )?
        else {
            return Ok(None);
        };

        let away = match &self.away_config {
            Some(away) => build_target(
                "away",
                away.default_target_temperature_low,
                away.default_target_temperature_high,
                two_points,
                differential,
            )?,
            None => None,
        };

        Ok(Some(SetpointModel::new(normal, away, differential)))
    }
}

fn temperature_for(key: &str, low: Option<f32>, high: Option<f32>) -> Option<f32> {
    if key == KEY_LOW {
        low
    } else {
        high
    }
}

fn check_band(key: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidBand { key, value })
    }
}

fn build_target(
    profile: &'static str,
    low: Option<f32>,
    high: Option<f32>,
    two_points: bool,
    differential: f32,
) -> Result<Option<TargetTempConfig>, ConfigError> {
    if two_points {
        let (Some(low), Some(high)) = (low, high) else {
            return Err(ConfigError::MissingTemperature {
                key: if low.is_none() { KEY_LOW } else { KEY_HIGH },
                action: if low.is_none() {
                    ClimateAction::Heating.config_key()
                } else {
                    ClimateAction::Cooling.config_key()
                },
            });
        };
        if low > high - differential {
            return Err(ConfigError::DifferentialViolated {
                profile,
                low,
                high,
                differential,
            });
        }
        return Ok(Some(TargetTempConfig::dual(low, high)));
    }

    Ok(high.or(low).map(TargetTempConfig::single))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub http_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            http_port: 8080,
        }
    }
}

/// On-disk controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub thermostat: ThermostatConfig,
    pub climate: ClimateConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl RuntimeConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.thermostat.sanitize();
        Ok(config)
    }
}

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// User-selected operating mode of the climate device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ClimateMode {
    #[default]
    Off,
    HeatCool,
    Cool,
    Heat,
    Dry,
    FanOnly,
    Auto,
}

impl ClimateMode {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Actions this mode may drive. A mode is only usable when every one of
    /// these is configured.
    pub fn required_actions(self) -> &'static [ClimateAction] {
        match self {
            Self::Off => &[],
            Self::HeatCool | Self::Auto => &[ClimateAction::Heating, ClimateAction::Cooling],
            Self::Cool => &[ClimateAction::Cooling],
            Self::Heat => &[ClimateAction::Heating],
            Self::Dry => &[ClimateAction::Drying],
            Self::FanOnly => &[ClimateAction::FanOnly],
        }
    }

    pub fn permits(self, action: ClimateAction) -> bool {
        action == ClimateAction::Idle || self.required_actions().contains(&action)
    }

    /// Configuration key of the trigger fired when this mode is entered.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Off => "off_mode",
            Self::HeatCool => "heat_cool_mode",
            Self::Cool => "cool_mode",
            Self::Heat => "heat_mode",
            Self::Dry => "dry_mode",
            Self::FanOnly => "fan_only_mode",
            Self::Auto => "auto_mode",
        }
    }
}

/// What the equipment is currently doing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ClimateAction {
    #[default]
    Idle,
    Heating,
    Cooling,
    Drying,
    FanOnly,
}

impl ClimateAction {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Configuration key of the action sequence run when this action starts.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Idle => "idle_action",
            Self::Heating => "heat_action",
            Self::Cooling => "cool_action",
            Self::Drying => "dry_action",
            Self::FanOnly => "fan_only_action",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FanMode {
    On,
    Off,
    Auto,
    Low,
    Medium,
    High,
    Middle,
    Focus,
    Diffuse,
}

impl FanMode {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SwingMode {
    Both,
    Horizontal,
    Off,
    Vertical,
}

impl SwingMode {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Which setpoint profile the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Normal,
    Away,
}

impl Preset {
    pub fn from_away(away: bool) -> Self {
        if away {
            Self::Away
        } else {
            Self::Normal
        }
    }

    pub fn is_away(self) -> bool {
        self == Self::Away
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThermostatStatus {
    #[serde(rename = "currentTemp")]
    pub current_temp: Option<f32>,
    #[serde(rename = "sensorValid")]
    pub sensor_valid: bool,
    #[serde(rename = "targetTemp", skip_serializing_if = "Option::is_none")]
    pub target_temp: Option<f32>,
    #[serde(rename = "targetTempLow", skip_serializing_if = "Option::is_none")]
    pub target_temp_low: Option<f32>,
    #[serde(rename = "targetTempHigh", skip_serializing_if = "Option::is_none")]
    pub target_temp_high: Option<f32>,
    pub mode: &'static str,
    pub action: &'static str,
    #[serde(rename = "fanMode")]
    pub fan_mode: Option<&'static str>,
    #[serde(rename = "swingMode")]
    pub swing_mode: Option<&'static str>,
    pub preset: Preset,
    #[serde(rename = "awaySupported")]
    pub away_supported: bool,
    #[serde(rename = "supportedModes")]
    pub supported_modes: Vec<&'static str>,
    #[serde(rename = "lastTransitionMs")]
    pub last_transition_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThermostatStatePayload {
    pub temp: Option<f32>,
    pub low: Option<f32>,
    pub high: Option<f32>,
    pub mode: &'static str,
    pub action: &'static str,
    pub away: bool,
}

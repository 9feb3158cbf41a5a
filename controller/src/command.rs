use thiserror::Error;

use climate_thermostat_common::{
    ClimateMode, FanMode, SetpointError, SwingMode, TargetTempConfig, ThermostatEngine,
    TOPIC_CMD_AWAY, TOPIC_CMD_FAN_MODE, TOPIC_CMD_MODE, TOPIC_CMD_SWING_MODE, TOPIC_CMD_TARGET,
};

/// A user request, as received over MQTT or HTTP.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Mode(ClimateMode),
    Away(bool),
    Target(TargetTempConfig),
    FanMode(FanMode),
    SwingMode(SwingMode),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown climate mode '{0}'")]
    Mode(String),
    #[error("away expects 'on' or 'off', got '{0}'")]
    Away(String),
    #[error("invalid target '{0}': expected <temp> or <low>,<high>")]
    Target(String),
    #[error("unknown fan mode '{0}'")]
    FanMode(String),
    #[error("unknown swing mode '{0}'")]
    SwingMode(String),
    #[error("{0} is not supported by this thermostat")]
    Unsupported(String),
    #[error(transparent)]
    Setpoint(#[from] SetpointError),
}

impl Command {
    /// Maps a command topic and payload to a command. Non-command topics
    /// yield `Ok(None)`.
    pub fn from_topic(topic: &str, payload: &str) -> Result<Option<Self>, CommandError> {
        let command = match topic {
            TOPIC_CMD_MODE => Self::Mode(parse_mode(payload)?),
            TOPIC_CMD_AWAY => Self::Away(parse_away(payload)?),
            TOPIC_CMD_TARGET => Self::Target(parse_target(payload)?),
            TOPIC_CMD_FAN_MODE => Self::FanMode(parse_fan_mode(payload)?),
            TOPIC_CMD_SWING_MODE => Self::SwingMode(parse_swing_mode(payload)?),
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    /// Queues the request on the engine; it takes effect on the next tick.
    pub fn apply(self, engine: &mut ThermostatEngine) -> Result<(), CommandError> {
        let accepted = match self {
            Self::Mode(mode) => engine.request_mode(mode),
            Self::Away(away) => engine.set_away(away),
            Self::Target(target) => {
                engine.request_target(target)?;
                true
            }
            Self::FanMode(fan_mode) => engine.request_fan_mode(fan_mode),
            Self::SwingMode(swing_mode) => engine.request_swing_mode(swing_mode),
        };

        if accepted {
            Ok(())
        } else {
            Err(CommandError::Unsupported(self.describe()))
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Mode(mode) => format!("mode {mode}"),
            Self::Away(_) => "away preset".to_string(),
            Self::Target(target) => format!("{} target", target.kind()),
            Self::FanMode(fan_mode) => format!("fan mode {fan_mode}"),
            Self::SwingMode(swing_mode) => format!("swing mode {swing_mode}"),
        }
    }
}

pub fn parse_mode(raw: &str) -> Result<ClimateMode, CommandError> {
    raw.trim()
        .parse()
        .map_err(|_| CommandError::Mode(raw.to_string()))
}

pub fn parse_away(raw: &str) -> Result<bool, CommandError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "away" => Ok(true),
        "off" | "false" | "home" => Ok(false),
        _ => Err(CommandError::Away(raw.to_string())),
    }
}

pub fn parse_target(raw: &str) -> Result<TargetTempConfig, CommandError> {
    let invalid = || CommandError::Target(raw.to_string());
    let parse = |value: &str| value.trim().parse::<f32>().map_err(|_| invalid());

    match raw.split_once(',') {
        Some((low, high)) => Ok(TargetTempConfig::dual(parse(low)?, parse(high)?)),
        None => Ok(TargetTempConfig::single(parse(raw)?)),
    }
}

pub fn parse_fan_mode(raw: &str) -> Result<FanMode, CommandError> {
    raw.trim()
        .parse()
        .map_err(|_| CommandError::FanMode(raw.to_string()))
}

pub fn parse_swing_mode(raw: &str) -> Result<SwingMode, CommandError> {
    raw.trim()
        .parse()
        .map_err(|_| CommandError::SwingMode(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_thermostat_common::{ClimateAction, ClimateConfig, ThermostatConfig};
    use pretty_assertions::assert_eq;

    fn cooling_engine() -> ThermostatEngine {
        let mut config = ClimateConfig::new("idle");
        config.actions.insert(ClimateAction::Cooling, "cool".into());
        config.default_target_temperature_high = Some(24.0);
        ThermostatEngine::new(ThermostatConfig::default(), config.validate().unwrap())
    }

    #[test]
    fn parses_command_topics() {
        assert_eq!(
            Command::from_topic(TOPIC_CMD_MODE, "heat_cool"),
            Ok(Some(Command::Mode(ClimateMode::HeatCool)))
        );
        assert_eq!(
            Command::from_topic(TOPIC_CMD_AWAY, " ON "),
            Ok(Some(Command::Away(true)))
        );
        assert_eq!(
            Command::from_topic(TOPIC_CMD_TARGET, "18.5, 23"),
            Ok(Some(Command::Target(TargetTempConfig::dual(18.5, 23.0))))
        );
        assert_eq!(
            Command::from_topic(TOPIC_CMD_FAN_MODE, "HIGH"),
            Ok(Some(Command::FanMode(FanMode::High)))
        );
        assert_eq!(Command::from_topic("thermostat/other", "x"), Ok(None));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(parse_mode("warm"), Err(CommandError::Mode("warm".into())));
        assert_eq!(parse_target("hot"), Err(CommandError::Target("hot".into())));
        assert_eq!(parse_target("18,"), Err(CommandError::Target("18,".into())));
        assert_eq!(parse_away("maybe"), Err(CommandError::Away("maybe".into())));
        assert!(parse_swing_mode("diagonal").is_err());
    }

    #[test]
    fn unsupported_requests_are_reported() {
        let mut engine = cooling_engine();

        assert_eq!(
            Command::Mode(ClimateMode::Heat).apply(&mut engine),
            Err(CommandError::Unsupported("mode HEAT".into()))
        );
        assert_eq!(
            Command::Away(true).apply(&mut engine),
            Err(CommandError::Unsupported("away preset".into()))
        );
        assert_eq!(Command::Mode(ClimateMode::Cool).apply(&mut engine), Ok(()));
        assert!(matches!(
            Command::Target(TargetTempConfig::dual(18.0, 22.0)).apply(&mut engine),
            Err(CommandError::Setpoint(SetpointError::ShapeMismatch { .. }))
        ));
    }
}

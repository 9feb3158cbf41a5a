pub const TOPIC_SENSOR_TEMP: &str = "thermostat/sensor/temperature";

pub const TOPIC_STATE: &str = "thermostat/climate/state";
pub const TOPIC_TRIGGER_PREFIX: &str = "thermostat/trigger";

pub const TOPIC_CMD_MODE: &str = "thermostat/cmnd/climate/mode";
pub const TOPIC_CMD_AWAY: &str = "thermostat/cmnd/climate/away";
pub const TOPIC_CMD_TARGET: &str = "thermostat/cmnd/climate/target";
pub const TOPIC_CMD_FAN_MODE: &str = "thermostat/cmnd/climate/fan_mode";
pub const TOPIC_CMD_SWING_MODE: &str = "thermostat/cmnd/climate/swing_mode";

pub fn trigger_topic(trigger_name: &str) -> String {
    format!("{TOPIC_TRIGGER_PREFIX}/{trigger_name}")
}

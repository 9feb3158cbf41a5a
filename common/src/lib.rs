pub mod capability;
pub mod config;
pub mod deadband;
pub mod dispatch;
pub mod error;
pub mod setpoint;
pub mod thermostat;
pub mod topics;
pub mod types;

pub use capability::{Capability, CapabilitySet};
pub use config::{
    AwayConfig, ClimateConfig, ClimateSettings, NetworkConfig, RuntimeConfig, ThermostatConfig,
};
pub use deadband::{Band, DeadbandOverrun};
pub use dispatch::{Edge, ThermostatEvent, Trigger, TriggerTable};
pub use error::{ConfigError, SetpointError};
pub use setpoint::{SetpointModel, TargetTempConfig};
pub use thermostat::ThermostatEngine;
pub use topics::*;
pub use types::{
    ClimateAction, ClimateMode, FanMode, Preset, SwingMode, ThermostatStatePayload,
    ThermostatStatus,
};

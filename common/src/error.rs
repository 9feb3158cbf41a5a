use thiserror::Error;

use crate::types::ClimateMode;

/// Problems found while validating a [`crate::config::ClimateConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least one of heat_action, cool_action, dry_action or fan_only_action must be defined")]
    NoClimateAction,
    #[error("IDLE is not allowed in actions; set idle_action instead")]
    IdleInActions,
    #[error("{action} must be defined to use {trigger}")]
    ModeMissingAction {
        trigger: &'static str,
        action: &'static str,
    },
    #[error("{key} must be defined when using {action}")]
    MissingTemperature {
        key: &'static str,
        action: &'static str,
    },
    #[error("{key} is defined with no {action}")]
    OrphanTemperature {
        key: &'static str,
        action: &'static str,
    },
    #[error("{key} must be defined in away_config when using {action}")]
    MissingAwayTemperature {
        key: &'static str,
        action: &'static str,
    },
    #[error("{key} is defined in away_config with no {action}")]
    OrphanAwayTemperature {
        key: &'static str,
        action: &'static str,
    },
    #[error("default_mode is set to {mode} but {action} is not present in the configuration")]
    DefaultModeMissingAction {
        mode: ClimateMode,
        action: &'static str,
    },
    #[error("{key} must be a finite, non-negative temperature (got {value})")]
    InvalidBand { key: &'static str, value: f32 },
    #[error("{key} must be a finite temperature (got {value})")]
    NonFiniteTemperature { key: &'static str, value: f32 },
    #[error("{profile} profile: low {low} must be at least {differential} below high {high}")]
    DifferentialViolated {
        profile: &'static str,
        low: f32,
        high: f32,
        differential: f32,
    },
}

/// Rejected target temperature requests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetpointError {
    #[error("no configured action uses a target temperature")]
    NoSetpoints,
    #[error("target temperature must be finite")]
    NonFinite,
    #[error("expected a {expected} target, got a {got} target")]
    ShapeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    #[error("low {low} must be at least {differential} below high {high}")]
    DifferentialViolated { low: f32, high: f32, differential: f32 },
}

//! Trigger points fired by the engine and the table that routes them to
//! externally registered action sequences.

use std::collections::HashMap;
use std::fmt;

use crate::types::{ClimateAction, ClimateMode, FanMode, SwingMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Action(ClimateAction),
    Mode(ClimateMode),
    FanMode(FanMode),
    SwingMode(SwingMode),
    TargetTemperatureChange,
}

impl Trigger {
    /// Stable name matching the configuration key that defines the trigger.
    pub fn name(self) -> String {
        match self {
            Self::Action(action) => action.config_key().to_string(),
            Self::Mode(mode) => mode.config_key().to_string(),
            Self::FanMode(fan_mode) => format!("fan_mode_{}", fan_mode.as_str()),
            Self::SwingMode(swing_mode) => format!("swing_{}", swing_mode.as_str()),
            Self::TargetTemperatureChange => "target_temperature_change".to_string(),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Enter,
    Leave,
}

/// One transition reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermostatEvent {
    pub trigger: Trigger,
    pub edge: Edge,
}

impl ThermostatEvent {
    pub fn enter(trigger: Trigger) -> Self {
        Self {
            trigger,
            edge: Edge::Enter,
        }
    }

    pub fn leave(trigger: Trigger) -> Self {
        Self {
            trigger,
            edge: Edge::Leave,
        }
    }
}

pub type TriggerHandler = Box<dyn FnMut() + Send>;

/// Handlers keyed by trigger and edge. Registration happens once at setup;
/// firing a key with no handler is a no-op.
#[derive(Default)]
pub struct TriggerTable {
    handlers: HashMap<(Trigger, Edge), TriggerHandler>,
}

impl TriggerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, trigger: Trigger, edge: Edge, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.handlers.insert((trigger, edge), Box::new(handler));
    }

    pub fn on_enter<F>(&mut self, trigger: Trigger, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.register(trigger, Edge::Enter, handler);
    }

    pub fn is_registered(&self, trigger: Trigger, edge: Edge) -> bool {
        self.handlers.contains_key(&(trigger, edge))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns whether a handler ran.
    pub fn fire(&mut self, event: ThermostatEvent) -> bool {
        match self.handlers.get_mut(&(event.trigger, event.edge)) {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    /// Fires every event in order. Returns how many handlers ran.
    pub fn dispatch(&mut self, events: &[ThermostatEvent]) -> usize {
        events.iter().filter(|event| self.fire(**event)).count()
    }
}

impl fmt::Debug for TriggerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerTable")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[test]
    fn trigger_names_match_config_keys() {
        assert_eq!(Trigger::Action(ClimateAction::Heating).name(), "heat_action");
        assert_eq!(Trigger::Action(ClimateAction::FanOnly).name(), "fan_only_action");
        assert_eq!(Trigger::Mode(ClimateMode::HeatCool).name(), "heat_cool_mode");
        assert_eq!(Trigger::FanMode(FanMode::Diffuse).name(), "fan_mode_diffuse");
        assert_eq!(Trigger::SwingMode(SwingMode::Both).name(), "swing_both");
        assert_eq!(
            Trigger::TargetTemperatureChange.to_string(),
            "target_temperature_change"
        );
    }

    #[test]
    fn dispatch_runs_handlers_in_event_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut table = TriggerTable::new();

        for (trigger, label) in [
            (Trigger::Action(ClimateAction::Idle), "idle"),
            (Trigger::Action(ClimateAction::Heating), "heat"),
        ] {
            let log = Arc::clone(&log);
            table.on_enter(trigger, move || log.lock().unwrap().push(label));
        }
        let leave_log = Arc::clone(&log);
        table.register(Trigger::Action(ClimateAction::Idle), Edge::Leave, move || {
            leave_log.lock().unwrap().push("leave idle")
        });

        let fired = table.dispatch(&[
            ThermostatEvent::leave(Trigger::Action(ClimateAction::Idle)),
            ThermostatEvent::enter(Trigger::Action(ClimateAction::Heating)),
            ThermostatEvent::enter(Trigger::Action(ClimateAction::Cooling)),
        ]);

        assert_eq!(fired, 2);
        assert_eq!(*log.lock().unwrap(), vec!["leave idle", "heat"]);
    }
}

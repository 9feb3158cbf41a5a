use crate::{
    capability::CapabilitySet,
    config::{ClimateSettings, ThermostatConfig},
    deadband::DeadbandOverrun,
    dispatch::{ThermostatEvent, Trigger},
    error::SetpointError,
    setpoint::{SetpointModel, TargetTempConfig},
    types::{
        ClimateAction, ClimateMode, FanMode, Preset, SwingMode, ThermostatStatePayload,
        ThermostatStatus,
    },
};

/// Latest request of each kind, applied at the start of the next tick.
#[derive(Debug, Clone, Copy, Default)]
struct PendingRequests {
    mode: Option<ClimateMode>,
    away: Option<bool>,
    target: Option<TargetTempConfig>,
    fan_mode: Option<FanMode>,
    swing_mode: Option<SwingMode>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Reading {
    Fresh(f32),
    Stale,
    Missing,
}

#[derive(Debug, Clone)]
pub struct ThermostatEngine {
    pub config: ThermostatConfig,
    capabilities: CapabilitySet,
    setpoints: Option<SetpointModel>,
    bands: DeadbandOverrun,
    fan_only_cooling: bool,

    action: ClimateAction,
    mode: ClimateMode,
    preset: Preset,
    fan_mode: Option<FanMode>,
    swing_mode: Option<SwingMode>,
    started: bool,

    current_temp: Option<f32>,
    last_sensor_update_ms: Option<u64>,
    last_state_change_ms: Option<u64>,

    pending: PendingRequests,
}

impl ThermostatEngine {
    pub fn new(mut config: ThermostatConfig, settings: ClimateSettings) -> Self {
        config.sanitize();
        let mode = if settings.capabilities.supports_mode(settings.default_mode) {
            settings.default_mode
        } else {
            ClimateMode::Off
        };

        Self {
            config,
            capabilities: settings.capabilities,
            setpoints: settings.setpoints,
            bands: settings.bands,
            fan_only_cooling: settings.fan_only_cooling,
            action: ClimateAction::Idle,
            mode,
            preset: Preset::Normal,
            fan_mode: None,
            swing_mode: None,
            started: false,
            current_temp: None,
            last_sensor_update_ms: None,
            last_state_change_ms: None,
            pending: PendingRequests::default(),
        }
    }

    pub fn action(&self) -> ClimateAction {
        self.action
    }

    pub fn mode(&self) -> ClimateMode {
        self.mode
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn fan_mode(&self) -> Option<FanMode> {
        self.fan_mode
    }

    pub fn swing_mode(&self) -> Option<SwingMode> {
        self.swing_mode
    }

    pub fn current_temp(&self) -> Option<f32> {
        self.current_temp
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn bands(&self) -> &DeadbandOverrun {
        &self.bands
    }

    pub fn last_transition_ms(&self) -> Option<u64> {
        self.last_state_change_ms
    }

    /// Setpoints the next evaluation compares against.
    pub fn active_target(&self) -> Option<TargetTempConfig> {
        self.setpoints
            .as_ref()
            .map(|setpoints| setpoints.get_active_config(self.preset.is_away()))
    }

    /// Fires the initial mode and idle triggers. Only the first call emits.
    pub fn start(&mut self) -> Vec<ThermostatEvent> {
        if self.started {
            return Vec::new();
        }
        self.started = true;

        vec![
            ThermostatEvent::enter(Trigger::Mode(self.mode)),
            ThermostatEvent::enter(Trigger::Action(ClimateAction::Idle)),
        ]
    }

    /// Records a reading. Non-finite or out-of-range values are dropped and
    /// leave the previous reading to age out.
    pub fn update_sensor_data(&mut self, temp: f32, now_ms: u64) -> bool {
        let valid = self.config.min_valid_temp..=self.config.max_valid_temp;
        if !temp.is_finite() || !valid.contains(&temp) {
            return false;
        }
        self.current_temp = Some(temp);
        self.last_sensor_update_ms = Some(now_ms);
        true
    }

    pub fn is_sensor_data_valid(&self, now_ms: u64) -> bool {
        matches!(self.reading(now_ms), Reading::Fresh(_))
    }

    pub fn last_sensor_update_ms(&self) -> Option<u64> {
        self.last_sensor_update_ms
    }

    /// Queues a mode change. Unsupported modes are refused.
    pub fn request_mode(&mut self, mode: ClimateMode) -> bool {
        if !self.capabilities.supports_mode(mode) {
            return false;
        }
        self.pending.mode = Some(mode);
        true
    }

    /// Queues a switch between the normal and away setpoint profiles.
    pub fn set_away(&mut self, away: bool) -> bool {
        if away && !self.capabilities.supports_away() {
            return false;
        }
        self.pending.away = Some(away);
        true
    }

    pub fn request_fan_mode(&mut self, fan_mode: FanMode) -> bool {
        if !self.capabilities.supports_fan_mode(fan_mode) {
            return false;
        }
        self.pending.fan_mode = Some(fan_mode);
        true
    }

    pub fn request_swing_mode(&mut self, swing_mode: SwingMode) -> bool {
        if !self.capabilities.supports_swing_mode(swing_mode) {
            return false;
        }
        self.pending.swing_mode = Some(swing_mode);
        true
    }

    /// Queues new values for whichever profile will be active next tick.
    pub fn request_target(&mut self, target: TargetTempConfig) -> Result<(), SetpointError> {
        let setpoints = self.setpoints.as_ref().ok_or(SetpointError::NoSetpoints)?;
        let away = self.pending.away.unwrap_or(self.preset.is_away());
        setpoints.validate_replacement(away, &target)?;
        self.pending.target = Some(target);
        Ok(())
    }

    pub fn tick(&mut self, now_ms: u64) -> Vec<ThermostatEvent> {
        let mut events = Vec::new();

        self.apply_pending(&mut events);
        self.evaluate_state(now_ms, &mut events);

        events
    }

    pub fn status(&self, now_ms: u64) -> ThermostatStatus {
        let target = self.active_target();
        let (single, low, high) = match target {
            Some(TargetTempConfig::SinglePoint { target }) => (Some(target), None, None),
            Some(TargetTempConfig::DualPoint { low, high }) => (None, Some(low), Some(high)),
            None => (None, None, None),
        };

        ThermostatStatus {
            current_temp: self.current_temp,
            sensor_valid: self.is_sensor_data_valid(now_ms),
            target_temp: single,
            target_temp_low: low,
            target_temp_high: high,
            mode: self.mode.as_str(),
            action: self.action.as_str(),
            fan_mode: self.fan_mode.map(FanMode::as_str),
            swing_mode: self.swing_mode.map(SwingMode::as_str),
            preset: self.preset,
            away_supported: self.capabilities.supports_away(),
            supported_modes: self.capabilities.modes().map(ClimateMode::as_str).collect(),
            last_transition_ms: self.last_state_change_ms,
        }
    }

    pub fn state_payload(&self) -> ThermostatStatePayload {
        let target = self.active_target();
        ThermostatStatePayload {
            temp: self.current_temp,
            low: target.map(|t| t.low()),
            high: target.map(|t| t.high()),
            mode: self.mode.as_str(),
            action: self.action.as_str(),
            away: self.preset.is_away(),
        }
    }

    fn apply_pending(&mut self, events: &mut Vec<ThermostatEvent>) {
        let pending = std::mem::take(&mut self.pending);

        if let Some(mode) = pending.mode {
            if mode != self.mode {
                events.push(ThermostatEvent::leave(Trigger::Mode(self.mode)));
                events.push(ThermostatEvent::enter(Trigger::Mode(mode)));
                self.mode = mode;
            }
        }

        if let Some(away) = pending.away {
            self.preset = Preset::from_away(away);
        }

        if let (Some(target), Some(setpoints)) = (pending.target, self.setpoints.as_mut()) {
            // Re-checked here: the profile may have changed since the request.
            if let Ok(true) = setpoints.replace_active(self.preset.is_away(), target) {
                events.push(ThermostatEvent::enter(Trigger::TargetTemperatureChange));
            }
        }

        if let Some(fan_mode) = pending.fan_mode {
            if self.fan_mode != Some(fan_mode) {
                if let Some(previous) = self.fan_mode {
                    events.push(ThermostatEvent::leave(Trigger::FanMode(previous)));
                }
                events.push(ThermostatEvent::enter(Trigger::FanMode(fan_mode)));
                self.fan_mode = Some(fan_mode);
            }
        }

        if let Some(swing_mode) = pending.swing_mode {
            if self.swing_mode != Some(swing_mode) {
                if let Some(previous) = self.swing_mode {
                    events.push(ThermostatEvent::leave(Trigger::SwingMode(previous)));
                }
                events.push(ThermostatEvent::enter(Trigger::SwingMode(swing_mode)));
                self.swing_mode = Some(swing_mode);
            }
        }
    }

    fn reading(&self, now_ms: u64) -> Reading {
        match (self.current_temp, self.last_sensor_update_ms) {
            (Some(temp), Some(last))
                if now_ms.saturating_sub(last) < self.config.sensor_stale_timeout_ms =>
            {
                Reading::Fresh(temp)
            }
            (Some(_), Some(_)) => Reading::Stale,
            _ => Reading::Missing,
        }
    }

    fn evaluate_state(&mut self, now_ms: u64, events: &mut Vec<ThermostatEvent>) {
        // OFF wins over everything, including the minimum cycle time.
        if self.mode == ClimateMode::Off {
            self.switch_action(ClimateAction::Idle, now_ms, events);
            return;
        }

        // An action the current mode no longer permits drops to IDLE right
        // away, whatever the sensor says. The next action waits for the
        // minimum cycle like any other transition.
        if !self.mode.permits(self.action) {
            self.switch_action(ClimateAction::Idle, now_ms, events);
            return;
        }

        let desired = match self.reading(now_ms) {
            Reading::Fresh(temp) => self.compute_action(temp),
            Reading::Stale => return,
            Reading::Missing => ClimateAction::Idle,
        };

        if desired == self.action {
            return;
        }

        if !self.capabilities.supports_action(desired) || !self.mode.permits(desired) {
            return;
        }

        if !self.can_change_state(now_ms) {
            return;
        }

        self.switch_action(desired, now_ms, events);
    }

    fn compute_action(&self, temp: f32) -> ClimateAction {
        let target = self.active_target();

        match (self.mode, target) {
            (ClimateMode::Off, _) => ClimateAction::Idle,
            (ClimateMode::Dry, _) => ClimateAction::Drying,
            (ClimateMode::FanOnly, _) if !self.fan_only_cooling => ClimateAction::FanOnly,
            (_, None) => ClimateAction::Idle,
            (ClimateMode::FanOnly, Some(target)) => {
                if self.cool_wanted(temp, &target, ClimateAction::FanOnly) {
                    ClimateAction::FanOnly
                } else {
                    ClimateAction::Idle
                }
            }
            (ClimateMode::Heat, Some(target)) => {
                if self.heat_wanted(temp, &target) {
                    ClimateAction::Heating
                } else {
                    ClimateAction::Idle
                }
            }
            (ClimateMode::Cool, Some(target)) => {
                if self.cool_wanted(temp, &target, ClimateAction::Cooling) {
                    ClimateAction::Cooling
                } else {
                    ClimateAction::Idle
                }
            }
            (ClimateMode::HeatCool | ClimateMode::Auto, Some(target)) => {
                let heat = self.heat_wanted(temp, &target);
                let cool = self.cool_wanted(temp, &target, ClimateAction::Cooling);
                match (heat, cool) {
                    (true, true) if temp > target.midpoint() => ClimateAction::Cooling,
                    (true, _) => ClimateAction::Heating,
                    (false, true) => ClimateAction::Cooling,
                    (false, false) => ClimateAction::Idle,
                }
            }
        }
    }

    fn heat_wanted(&self, temp: f32, target: &TargetTempConfig) -> bool {
        self.bands
            .heat
            .wants(target.low() - temp, self.action == ClimateAction::Heating)
    }

    fn cool_wanted(&self, temp: f32, target: &TargetTempConfig, action: ClimateAction) -> bool {
        self.bands
            .cool
            .wants(temp - target.high(), self.action == action)
    }

    fn can_change_state(&self, now_ms: u64) -> bool {
        self.last_state_change_ms
            .map(|last| now_ms.saturating_sub(last) >= self.config.min_cycle_ms)
            .unwrap_or(true)
    }

    fn switch_action(
        &mut self,
        next: ClimateAction,
        now_ms: u64,
        events: &mut Vec<ThermostatEvent>,
    ) {
        let previous = self.action;
        if previous == next {
            return;
        }

        events.push(ThermostatEvent::leave(Trigger::Action(previous)));
        // Never hop straight from one active action to another.
        if previous != ClimateAction::Idle && next != ClimateAction::Idle {
            events.push(ThermostatEvent::enter(Trigger::Action(ClimateAction::Idle)));
            events.push(ThermostatEvent::leave(Trigger::Action(ClimateAction::Idle)));
        }
        events.push(ThermostatEvent::enter(Trigger::Action(next)));

        self.action = next;
        self.last_state_change_ms = Some(now_ms);
    }
}

//! Pin I/O collaborator and a simulated backend for development off-device.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::trace;

use crate::error::HardwareError;

/// How a pin is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    /// Input with the internal pull-up enabled (reads HIGH when idle).
    InputPullUp,
    Output,
}

/// Raw GPIO access.
///
/// Calls are short register operations, so the trait is synchronous. Every
/// call may fail with a [`HardwareError`]; the monitor treats those as
/// transient.
pub trait PinIo: Send + Sync {
    /// Configure a pin before use.
    fn setup(&self, pin: u8, mode: PinMode) -> Result<(), HardwareError>;

    /// Read a digital level (`true` = HIGH).
    fn digital_read(&self, pin: u8) -> Result<bool, HardwareError>;

    /// Drive a digital level.
    fn digital_write(&self, pin: u8, level: bool) -> Result<(), HardwareError>;

    /// Start PWM output on a pin.
    fn pwm_start(&self, pin: u8, frequency: f32, duty_cycle: f32) -> Result<(), HardwareError>;

    /// Stop PWM output on a pin.
    fn pwm_stop(&self, pin: u8) -> Result<(), HardwareError>;

    /// Release every pin.
    fn cleanup(&self) -> Result<(), HardwareError>;
}

#[derive(Debug, Default)]
struct SimulatedState {
    modes: HashMap<u8, PinMode>,
    levels: HashMap<u8, bool>,
    pwm: HashMap<u8, (f32, f32)>,
    writes: Vec<(u8, bool)>,
    cleanups: usize,
}

/// In-memory GPIO. Input levels are set by the caller via [`set_level`].
///
/// [`set_level`]: SimulatedPins::set_level
#[derive(Debug, Default)]
pub struct SimulatedPins {
    state: Mutex<SimulatedState>,
}

impl SimulatedPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the level an input pin reads back.
    pub fn set_level(&self, pin: u8, level: bool) {
        self.lock().levels.insert(pin, level);
    }

    /// Current level of a pin (as last set or written), if any.
    pub fn level(&self, pin: u8) -> Option<bool> {
        self.lock().levels.get(&pin).copied()
    }

    /// Active PWM `(frequency, duty_cycle)` on a pin.
    pub fn pwm(&self, pin: u8) -> Option<(f32, f32)> {
        self.lock().pwm.get(&pin).copied()
    }

    /// Every digital write so far, in order.
    pub fn writes(&self) -> Vec<(u8, bool)> {
        self.lock().writes.clone()
    }

    /// Configured mode of a pin.
    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.lock().modes.get(&pin).copied()
    }

    /// Number of times `cleanup()` has run.
    pub fn cleanup_count(&self) -> usize {
        self.lock().cleanups
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PinIo for SimulatedPins {
    fn setup(&self, pin: u8, mode: PinMode) -> Result<(), HardwareError> {
        trace!(pin, ?mode, "simulated setup");
        let mut state = self.lock();
        state.modes.insert(pin, mode);
        if mode == PinMode::InputPullUp {
            state.levels.entry(pin).or_insert(true);
        }
        Ok(())
    }

    fn digital_read(&self, pin: u8) -> Result<bool, HardwareError> {
        let state = self.lock();
        if !state.modes.contains_key(&pin) {
            return Err(HardwareError::Read {
                pin,
                reason: "pin not configured".to_string(),
            });
        }
        let level = state.levels.get(&pin).copied().unwrap_or(false);
        trace!(pin, level, "simulated read");
        Ok(level)
    }

    fn digital_write(&self, pin: u8, level: bool) -> Result<(), HardwareError> {
        let mut state = self.lock();
        if state.modes.get(&pin) != Some(&PinMode::Output) {
            return Err(HardwareError::Write {
                pin,
                reason: "pin not configured as output".to_string(),
            });
        }
        trace!(pin, level, "simulated write");
        state.levels.insert(pin, level);
        state.writes.push((pin, level));
        Ok(())
    }

    fn pwm_start(&self, pin: u8, frequency: f32, duty_cycle: f32) -> Result<(), HardwareError> {
        let mut state = self.lock();
        if state.modes.get(&pin) != Some(&PinMode::Output) {
            return Err(HardwareError::Pwm {
                pin,
                reason: "pin not configured as output".to_string(),
            });
        }
        trace!(pin, frequency, duty_cycle, "simulated PWM start");
        state.pwm.insert(pin, (frequency, duty_cycle));
        Ok(())
    }

    fn pwm_stop(&self, pin: u8) -> Result<(), HardwareError> {
        trace!(pin, "simulated PWM stop");
        self.lock().pwm.remove(&pin);
        Ok(())
    }

    fn cleanup(&self) -> Result<(), HardwareError> {
        let mut state = self.lock();
        state.modes.clear();
        state.pwm.clear();
        state.cleanups += 1;
        trace!("simulated cleanup");
        Ok(())
    }
}

//! Hardware monitor. Polls inputs, detects edges, mirrors state into the
//! world model and fires callbacks.
//!
//! Lifecycle is `Stopped -> Running -> Stopped`. The polling loop runs as
//! its own tokio task and checks a stop signal on every iteration, including
//! while it sleeps, so `stop_monitoring()` returns within one poll interval
//! plus whatever callback is in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{MonitorConfig, PinConfig};
use crate::error::HardwareError;
use crate::hardware::callbacks::{CallbackRegistry, EventHandler};
use crate::hardware::events::{EventKind, PinRole};
use crate::hardware::pins::{PinIo, PinMode};
use crate::world::WorldModel;

/// Servo PWM frequency in Hz.
const SERVO_PWM_FREQUENCY: f32 = 50.0;

/// How long the servo signal is held before PWM is stopped.
const SERVO_HOLD: Duration = Duration::from_millis(500);

/// Monitor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Stopped,
    Running,
}

/// Last observed level of one monitored input.
///
/// Edge detection is value based: a reading equal to the previous one
/// produces nothing. The first reading only sets the baseline.
#[derive(Debug, Clone, Copy)]
pub struct PinState {
    pub pin: u8,
    pub role: PinRole,
    last: Option<bool>,
}

impl PinState {
    pub fn new(pin: u8, role: PinRole) -> Self {
        Self {
            pin,
            role,
            last: None,
        }
    }

    /// Record a reading; returns the event if the level changed.
    pub fn observe(&mut self, level: bool) -> Option<EventKind> {
        match self.last.replace(level) {
            Some(previous) if previous != level => Some(self.role.classify(level)),
            _ => None,
        }
    }

    pub fn last(&self) -> Option<bool> {
        self.last
    }
}

struct MonitorTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the pins: the only component that reads or drives them.
pub struct HardwareMonitor {
    world: Arc<WorldModel>,
    pins: Arc<dyn PinIo>,
    config: MonitorConfig,
    callbacks: Arc<CallbackRegistry>,
    task: Mutex<Option<MonitorTask>>,
    released: AtomicBool,
}

impl HardwareMonitor {
    /// Configure the pins and create a stopped monitor.
    pub fn new(
        world: Arc<WorldModel>,
        pins: Arc<dyn PinIo>,
        config: MonitorConfig,
    ) -> Result<Self, HardwareError> {
        setup_pins(pins.as_ref(), &config.pins).inspect_err(|e| {
            error!("Error during GPIO setup: {}", e);
        })?;
        info!("Hardware integration initialized");

        Ok(Self {
            world,
            pins,
            config,
            callbacks: Arc::new(CallbackRegistry::new()),
            task: Mutex::new(None),
            released: AtomicBool::new(false),
        })
    }

    /// Spawn the polling loop. Warns and does nothing if already running.
    pub async fn start_monitoring(&self) {
        let mut task = self.task.lock().await;
        if let Some(existing) = task.as_ref()
            && !existing.handle.is_finished()
        {
            warn!("Hardware monitoring already running");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let poll = PollLoop {
            world: Arc::clone(&self.world),
            pins: Arc::clone(&self.pins),
            callbacks: Arc::clone(&self.callbacks),
            poll_interval: self.config.poll_interval,
            error_backoff: self.config.error_backoff,
            watched: vec![
                PinState::new(self.config.pins.button, PinRole::Button),
                PinState::new(self.config.pins.motion_sensor, PinRole::MotionSensor),
            ],
        };
        let handle = tokio::spawn(poll.run(stop_rx));

        *task = Some(MonitorTask { stop_tx, handle });
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Hardware monitoring started"
        );
    }

    /// Signal the polling loop to exit and wait until it has.
    pub async fn stop_monitoring(&self) {
        let mut task = self.task.lock().await;
        let Some(running) = task.take() else {
            debug!("Hardware monitoring not running");
            return;
        };

        let _ = running.stop_tx.send(true);
        if let Err(e) = running.handle.await {
            error!("Hardware monitor task ended abnormally: {}", e);
        }
        info!("Hardware monitoring stopped");
    }

    pub async fn status(&self) -> MonitorStatus {
        match self.task.lock().await.as_ref() {
            Some(running) if !running.handle.is_finished() => MonitorStatus::Running,
            _ => MonitorStatus::Stopped,
        }
    }

    /// Register a callback for an event kind (last registration wins).
    pub async fn register_callback(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.callbacks.register(kind, handler).await;
    }

    /// Register a callback by event name; unknown names are rejected.
    pub async fn register_callback_by_name(
        &self,
        name: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), HardwareError> {
        self.callbacks.register_named(name, handler).await
    }

    /// Drive the status LED.
    pub async fn set_led(&self, on: bool) -> Result<(), HardwareError> {
        self.pins
            .digital_write(self.config.pins.led, on)
            .inspect_err(|e| error!("Error controlling LED: {}", e))?;

        let label = if on { "on" } else { "off" };
        self.world.update_hardware_state("led", label).await;
        self.world
            .update_hardware_event(format!("LED turned {label}"))
            .await;
        debug!(led = label, "LED updated");
        Ok(())
    }

    /// Rotate the servo to `angle` degrees.
    ///
    /// `angle` must be within `[0, 180]`; it is not clamped. A no-op when
    /// the servo is disabled.
    pub async fn control_servo(&self, angle: f32) -> Result<(), HardwareError> {
        let Some(pin) = self.config.pins.servo else {
            debug!("Servo control skipped - servo not enabled");
            return Ok(());
        };

        let duty_cycle = 2.5 + (angle / 180.0) * 10.0;
        self.pins
            .pwm_start(pin, SERVO_PWM_FREQUENCY, duty_cycle)
            .inspect_err(|e| error!("Error controlling servo: {}", e))?;
        tokio::time::sleep(SERVO_HOLD).await;
        self.pins
            .pwm_stop(pin)
            .inspect_err(|e| error!("Error controlling servo: {}", e))?;

        self.world.update_hardware_state("servo", angle).await;
        self.world
            .update_hardware_event(format!("Servo rotated to {angle} degrees"))
            .await;
        debug!(angle, "Servo rotated");
        Ok(())
    }

    /// Stop monitoring and release the pins. Only the first call does anything.
    pub async fn cleanup(&self) -> Result<(), HardwareError> {
        if self.released.swap(true, Ordering::SeqCst) {
            debug!("Hardware resources already released");
            return Ok(());
        }
        self.stop_monitoring().await;
        self.pins.cleanup()?;
        info!("Hardware resources cleaned up");
        Ok(())
    }
}

fn setup_pins(pins: &dyn PinIo, config: &PinConfig) -> Result<(), HardwareError> {
    pins.setup(config.led, PinMode::Output)?;
    debug!(pin = config.led, "LED pin configured as output");

    pins.setup(config.button, PinMode::InputPullUp)?;
    debug!(pin = config.button, "Button pin configured with pull-up");

    pins.setup(config.motion_sensor, PinMode::Input)?;
    debug!(pin = config.motion_sensor, "Motion sensor pin configured as input");

    match config.servo {
        Some(pin) => {
            pins.setup(pin, PinMode::Output)?;
            debug!(pin, "Servo pin configured as output");
        }
        None => debug!("Servo functionality disabled"),
    }
    Ok(())
}

/// State moved into the polling task. Rebuilt on every start.
struct PollLoop {
    world: Arc<WorldModel>,
    pins: Arc<dyn PinIo>,
    callbacks: Arc<CallbackRegistry>,
    poll_interval: Duration,
    error_backoff: Duration,
    watched: Vec<PinState>,
}

impl PollLoop {
    async fn run(mut self, mut stop: watch::Receiver<bool>) {
        debug!("Entering hardware monitoring loop");

        loop {
            if *stop.borrow() {
                break;
            }

            let pause = match self.poll_once().await {
                Ok(()) => self.poll_interval,
                Err(e) => {
                    error!("Error in monitoring loop: {}", e);
                    self.error_backoff
                }
            };

            if wait_or_stop(&mut stop, pause).await {
                break;
            }
        }

        debug!("Leaving hardware monitoring loop");
    }

    async fn poll_once(&mut self) -> Result<(), HardwareError> {
        for i in 0..self.watched.len() {
            let level = self.pins.digital_read(self.watched[i].pin)?;
            let role = self.watched[i].role;
            if let Some(event) = self.watched[i].observe(level) {
                self.publish(role, event).await;
            }
        }
        Ok(())
    }

    async fn publish(&self, role: PinRole, event: EventKind) {
        info!(event = %event, "Hardware event detected");
        self.world
            .update_hardware_state(role.component(), event.state_label())
            .await;
        self.world.update_hardware_event(event.description()).await;
        self.callbacks.dispatch(event).await;
    }
}

/// Sleep for `pause` unless stopped first. Returns true when the loop should exit.
async fn wait_or_stop(stop: &mut watch::Receiver<bool>, pause: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(pause) => {}
        changed = stop.changed() => {
            if changed.is_err() {
                return true;
            }
        }
    }
    *stop.borrow()
}

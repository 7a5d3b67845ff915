//! The assistant: activation loop, dialogue turns and shutdown.
//!
//! Two tasks touch shared state. The hardware monitor polls on its own
//! task; this loop waits for an activation (wake word, button, or an
//! explicit trigger) and runs one dialogue turn at a time. Hardware
//! callbacks talk back to the loop only through the trigger channel.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::DialogueConfig;
use crate::dialogue::DialogueOrchestrator;
use crate::error::Error;
use crate::hardware::{EventKind, HardwareMonitor};
use crate::llm::LanguageModel;
use crate::speech::{SpeechInput, SpeechOutput};
use crate::world::WorldModel;

pub const WELCOME_MESSAGE: &str = "AI Assistant is now online and ready.";
pub const GOODBYE_MESSAGE: &str = "Shutting down. Goodbye!";
pub const APOLOGY_MESSAGE: &str = "I'm sorry, I had trouble processing that. Please try again.";

/// Utterances containing this word end the session.
const SHUTDOWN_COMMAND: &str = "shutdown";

/// Pause after a listen that heard no wake word.
const IDLE_PAUSE: Duration = Duration::from_millis(100);

/// How long the LED stays on after motion.
const MOTION_BLINK: Duration = Duration::from_millis(500);

/// Requests delivered to the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Run a dialogue turn now.
    Activate,
    /// Leave the loop and release hardware.
    Shutdown,
}

/// Cloneable sender for [`Trigger`]s.
#[derive(Clone)]
pub struct AssistantHandle {
    triggers: mpsc::UnboundedSender<Trigger>,
}

impl AssistantHandle {
    pub fn activate(&self) -> bool {
        self.triggers.send(Trigger::Activate).is_ok()
    }

    pub fn request_shutdown(&self) -> bool {
        self.triggers.send(Trigger::Shutdown).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnOutcome {
    Continue,
    Shutdown,
}

pub struct Assistant {
    world: Arc<WorldModel>,
    hardware: Arc<HardwareMonitor>,
    dialogue: DialogueOrchestrator,
    input: Arc<dyn SpeechInput>,
    output: Arc<dyn SpeechOutput>,
    wake_word: String,
    triggers_tx: mpsc::UnboundedSender<Trigger>,
    triggers_rx: Mutex<mpsc::UnboundedReceiver<Trigger>>,
    shut_down: AtomicBool,
}

impl Assistant {
    pub fn new(
        config: &DialogueConfig,
        world: Arc<WorldModel>,
        hardware: Arc<HardwareMonitor>,
        llm: Arc<dyn LanguageModel>,
        input: Arc<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
    ) -> Self {
        let (triggers_tx, triggers_rx) = mpsc::unbounded_channel();
        let dialogue = DialogueOrchestrator::new(llm, Arc::clone(&world), config);

        Self {
            world,
            hardware,
            dialogue,
            input,
            output,
            wake_word: config.wake_word.clone(),
            triggers_tx,
            triggers_rx: Mutex::new(triggers_rx),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> AssistantHandle {
        AssistantHandle {
            triggers: self.triggers_tx.clone(),
        }
    }

    pub fn world(&self) -> &Arc<WorldModel> {
        &self.world
    }

    pub fn hardware(&self) -> &Arc<HardwareMonitor> {
        &self.hardware
    }

    pub fn dialogue(&self) -> &DialogueOrchestrator {
        &self.dialogue
    }

    /// Button press activates a turn; motion blinks the LED.
    pub async fn install_default_callbacks(&self) {
        let handle = self.handle();
        self.hardware
            .register_callback(
                EventKind::ButtonPress,
                Arc::new(move |_event: EventKind| {
                    let handle = handle.clone();
                    async move {
                        info!("Button press detected");
                        if !handle.activate() {
                            debug!("Assistant loop gone, activation dropped");
                        }
                        Ok::<(), Error>(())
                    }
                }),
            )
            .await;

        // Weak: the monitor owns this callback.
        let monitor = Arc::downgrade(&self.hardware);
        self.hardware
            .register_callback(
                EventKind::MotionDetected,
                Arc::new(move |_event: EventKind| {
                    let monitor = monitor.clone();
                    async move {
                        info!("Motion detected");
                        // Off the polling task so edges keep being seen.
                        tokio::spawn(blink(monitor));
                        Ok::<(), Error>(())
                    }
                }),
            )
            .await;
    }

    /// Run until a shutdown trigger, the shutdown command, or Ctrl+C.
    ///
    /// Hardware is released before returning.
    pub async fn run(&self) -> Result<(), Error> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Keyboard interrupt received");
        })
        .await
    }

    /// Like [`run`](Self::run), with `interrupt` in place of Ctrl+C.
    ///
    /// `interrupt` also cuts short a turn in progress, model call included.
    pub async fn run_until<I>(&self, interrupt: I) -> Result<(), Error>
    where
        I: Future<Output = ()>,
    {
        info!("AI Assistant starting...");
        self.install_default_callbacks().await;
        self.hardware.start_monitoring().await;

        if !self.output.speak(WELCOME_MESSAGE).await {
            warn!("Failed to speak welcome message");
        }

        let mut triggers = self.triggers_rx.lock().await;
        tokio::pin!(interrupt);

        loop {
            let outcome = tokio::select! {
                biased;

                _ = &mut interrupt => TurnOutcome::Shutdown,
                trigger = triggers.recv() => match trigger {
                    Some(Trigger::Activate) => self.interruptible_interaction(interrupt.as_mut()).await,
                    Some(Trigger::Shutdown) | None => TurnOutcome::Shutdown,
                },
                heard = self.input.detect_wake_word(&self.wake_word) => {
                    if heard {
                        info!("Wake word detected");
                        self.interruptible_interaction(interrupt.as_mut()).await
                    } else {
                        tokio::time::sleep(IDLE_PAUSE).await;
                        TurnOutcome::Continue
                    }
                }
            };

            if outcome == TurnOutcome::Shutdown {
                break;
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// A turn that gives way to `interrupt`. The LED is switched off either way.
    async fn interruptible_interaction<I>(&self, interrupt: I) -> TurnOutcome
    where
        I: Future<Output = ()> + Unpin,
    {
        tokio::select! {
            outcome = self.handle_interaction() => outcome,
            _ = interrupt => {
                warn!("Turn interrupted");
                self.indicate(false).await;
                TurnOutcome::Shutdown
            }
        }
    }

    /// One activation: listen, answer, speak. LED is on for the duration.
    async fn handle_interaction(&self) -> TurnOutcome {
        self.indicate(true).await;
        let outcome = self.converse().await;
        self.indicate(false).await;
        outcome
    }

    async fn converse(&self) -> TurnOutcome {
        let Some(user_input) = self.input.listen().await else {
            debug!("No speech captured");
            return TurnOutcome::Continue;
        };
        info!(text = %user_input, "User said");
        self.world.add_fact(format!("User said: {user_input}")).await;

        if user_input.to_lowercase().contains(SHUTDOWN_COMMAND) {
            self.say(GOODBYE_MESSAGE).await;
            return TurnOutcome::Shutdown;
        }

        match self.dialogue.respond(&user_input).await {
            Ok(reply) => {
                self.say(&reply).await;
                self.world
                    .add_fact(format!("Assistant responded: {reply}"))
                    .await;
            }
            Err(e) => {
                error!(error = %e, "Error processing conversation");
                self.say(APOLOGY_MESSAGE).await;
            }
        }
        TurnOutcome::Continue
    }

    async fn say(&self, text: &str) {
        if !self.output.speak(text).await {
            warn!("Speech output failed");
        }
    }

    /// LED feedback. Failures are already logged by the monitor.
    async fn indicate(&self, on: bool) {
        let _ = self.hardware.set_led(on).await;
    }

    /// Stop the monitor and release hardware. Only the first call does anything.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already performed");
            return;
        }
        info!("Shutting down AI Assistant...");
        if let Err(e) = self.hardware.cleanup().await {
            error!("Error releasing hardware: {}", e);
        }
        info!("Shutdown complete");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

/// LED on, hold, LED off. Failures are already logged by the monitor.
async fn blink(monitor: Weak<HardwareMonitor>) {
    let Some(monitor) = monitor.upgrade() else {
        return;
    };
    if monitor.set_led(true).await.is_ok() {
        tokio::time::sleep(MOTION_BLINK).await;
        let _ = monitor.set_led(false).await;
    }
}

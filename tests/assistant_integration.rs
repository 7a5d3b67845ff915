//! End-to-end tests for the assistant loop.
//!
//! Each test wires a real `HardwareMonitor` over `SimulatedPins`, a stub
//! language model and scripted speech, then drives the loop through
//! hardware edges and triggers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::{sleep, timeout};

use wunderkind::assistant::{APOLOGY_MESSAGE, Assistant, GOODBYE_MESSAGE, WELCOME_MESSAGE};
use wunderkind::config::{DialogueConfig, MonitorConfig, PinConfig};
use wunderkind::error::LlmError;
use wunderkind::hardware::{HardwareMonitor, MonitorStatus, SimulatedPins};
use wunderkind::llm::{ChatMessage, LanguageModel};
use wunderkind::speech::{SpeechInput, SpeechOutput};
use wunderkind::world::WorldModel;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub LLM (no real API calls).
struct StubLlm {
    reply: Result<String, ()>,
    delay: Duration,
}

impl StubLlm {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            delay: Duration::ZERO,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(()),
            delay: Duration::ZERO,
        })
    }

    fn slow(text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            delay,
        })
    }
}

#[async_trait]
impl LanguageModel for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _system_prompt: &str,
    ) -> Result<String, LlmError> {
        sleep(self.delay).await;
        self.reply.clone().map_err(|_| LlmError::AuthFailed {
            provider: "stub".to_string(),
        })
    }
}

/// Scripted utterances in, recorded speech out. Never hears the wake word.
#[derive(Default)]
struct ScriptedSpeech {
    heard: Mutex<VecDeque<String>>,
    spoken: Mutex<Vec<String>>,
}

impl ScriptedSpeech {
    fn with(lines: &[&str]) -> Arc<Self> {
        let speech = Self::default();
        speech
            .heard
            .lock()
            .unwrap()
            .extend(lines.iter().map(|l| l.to_string()));
        Arc::new(speech)
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechInput for ScriptedSpeech {
    async fn listen(&self) -> Option<String> {
        self.heard.lock().unwrap().pop_front()
    }

    async fn detect_wake_word(&self, _phrase: &str) -> bool {
        sleep(Duration::from_millis(5)).await;
        false
    }
}

#[async_trait]
impl SpeechOutput for ScriptedSpeech {
    async fn speak(&self, text: &str) -> bool {
        self.spoken.lock().unwrap().push(text.to_string());
        true
    }
}

struct Rig {
    assistant: Arc<Assistant>,
    pins: Arc<SimulatedPins>,
    world: Arc<WorldModel>,
    layout: PinConfig,
}

fn rig(llm: Arc<StubLlm>, speech: Arc<ScriptedSpeech>) -> Rig {
    let monitor = MonitorConfig {
        poll_interval: Duration::from_millis(5),
        error_backoff: Duration::from_millis(20),
        ..MonitorConfig::default()
    };
    let layout = monitor.pins;

    let world = Arc::new(WorldModel::new());
    let pins = Arc::new(SimulatedPins::new());
    let hardware = Arc::new(
        HardwareMonitor::new(world.clone(), pins.clone(), monitor).expect("pin setup"),
    );
    let assistant = Arc::new(Assistant::new(
        &DialogueConfig::default(),
        world.clone(),
        hardware,
        llm,
        speech.clone(),
        speech,
    ));

    Rig {
        assistant,
        pins,
        world,
        layout,
    }
}

fn spawn_run(assistant: &Arc<Assistant>) -> tokio::task::JoinHandle<()> {
    let assistant = Arc::clone(assistant);
    tokio::spawn(async move {
        assistant.run().await.expect("assistant run");
    })
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    timeout(TEST_TIMEOUT, async {
        while !cond() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

fn led_writes(rig: &Rig) -> Vec<bool> {
    rig.pins
        .writes()
        .into_iter()
        .filter(|(pin, _)| *pin == rig.layout.led)
        .map(|(_, level)| level)
        .collect()
}

#[tokio::test]
async fn button_press_runs_a_full_turn() {
    let speech = ScriptedSpeech::with(&["I like dark mode"]);
    let rig = rig(
        StubLlm::replying("Noted, I learned that the user likes dark mode."),
        speech.clone(),
    );
    let runner = spawn_run(&rig.assistant);

    // Let the monitor take its baseline reading before pressing.
    sleep(Duration::from_millis(50)).await;
    rig.pins.set_level(rig.layout.button, false);

    wait_until("reply to be spoken", || speech.spoken().len() >= 2).await;
    rig.assistant.handle().request_shutdown();
    timeout(TEST_TIMEOUT, runner).await.unwrap().unwrap();

    assert_eq!(
        speech.spoken(),
        vec![
            WELCOME_MESSAGE,
            "Noted, I learned that the user likes dark mode."
        ]
    );

    let facts = rig.world.facts().await;
    assert_eq!(
        facts,
        vec![
            "User said: I like dark mode",
            "the user likes dark mode",
            "Assistant responded: Noted, I learned that the user likes dark mode.",
        ]
    );

    assert_eq!(
        rig.world.get_state("hardware.button").await,
        Some(json!("pressed"))
    );
    assert!(
        rig.world
            .hardware_events()
            .await
            .contains(&"Hardware event: button_press".to_string())
    );
    assert_eq!(led_writes(&rig), vec![true, false]);
    assert_eq!(rig.pins.cleanup_count(), 1);
}

#[tokio::test]
async fn model_failure_speaks_apology_and_keeps_running() {
    let speech = ScriptedSpeech::with(&["hello", "shutdown please"]);
    let rig = rig(StubLlm::failing(), speech.clone());
    let handle = rig.assistant.handle();

    handle.activate();
    handle.activate();
    timeout(TEST_TIMEOUT, rig.assistant.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        speech.spoken(),
        vec![WELCOME_MESSAGE, APOLOGY_MESSAGE, GOODBYE_MESSAGE]
    );
    assert_eq!(
        rig.world.facts().await,
        vec!["User said: hello", "User said: shutdown please"]
    );
    assert_eq!(rig.pins.cleanup_count(), 1);
}

#[tokio::test]
async fn motion_blinks_the_led() {
    let speech = ScriptedSpeech::with(&[]);
    let rig = rig(StubLlm::replying("unused"), speech);
    let runner = spawn_run(&rig.assistant);

    sleep(Duration::from_millis(50)).await;
    rig.pins.set_level(rig.layout.motion_sensor, true);

    wait_until("LED blink", || led_writes(&rig) == vec![true, false]).await;
    rig.assistant.handle().request_shutdown();
    timeout(TEST_TIMEOUT, runner).await.unwrap().unwrap();

    assert_eq!(
        rig.world.get_state("hardware.motion_sensor").await,
        Some(json!("active"))
    );
    assert_eq!(rig.world.get_state("hardware.led").await, Some(json!("off")));
    let events = rig.world.hardware_events().await;
    assert!(events.contains(&"Hardware event: motion_detected".to_string()));
    assert!(events.contains(&"LED turned on".to_string()));
    assert!(events.contains(&"LED turned off".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hardware_events_recorded_during_model_call() {
    let speech = ScriptedSpeech::with(&["take your time"]);
    let rig = rig(
        StubLlm::slow("Done thinking.", Duration::from_millis(300)),
        speech.clone(),
    );
    let runner = spawn_run(&rig.assistant);

    sleep(Duration::from_millis(50)).await;
    rig.assistant.handle().activate();
    // Lands while the model call is still in flight.
    sleep(Duration::from_millis(100)).await;
    rig.pins.set_level(rig.layout.motion_sensor, true);

    wait_until("reply to be spoken", || speech.spoken().len() >= 2).await;
    rig.assistant.handle().request_shutdown();
    timeout(TEST_TIMEOUT, runner).await.unwrap().unwrap();

    let events = rig.world.hardware_events().await;
    assert!(events.contains(&"Hardware event: motion_detected".to_string()));
    assert_eq!(speech.spoken().last().map(String::as_str), Some("Done thinking."));
}

#[tokio::test]
async fn shutdown_releases_hardware_exactly_once() {
    let rig = rig(StubLlm::replying("unused"), ScriptedSpeech::with(&[]));

    rig.assistant.handle().request_shutdown();
    timeout(TEST_TIMEOUT, rig.assistant.run())
        .await
        .unwrap()
        .unwrap();

    // Any further shutdown path is a no-op.
    rig.assistant.shutdown().await;
    rig.assistant.hardware().cleanup().await.unwrap();

    assert!(rig.assistant.is_shut_down());
    assert_eq!(rig.pins.cleanup_count(), 1);
    assert_eq!(
        rig.assistant.hardware().status().await,
        MonitorStatus::Stopped
    );
}

#[tokio::test]
async fn interrupt_cuts_short_a_model_call() {
    let speech = ScriptedSpeech::with(&["this will take a while"]);
    let rig = rig(
        StubLlm::slow("too late", Duration::from_secs(30)),
        speech.clone(),
    );
    let (interrupt_tx, interrupt_rx) = tokio::sync::oneshot::channel::<()>();

    let assistant = Arc::clone(&rig.assistant);
    let runner = tokio::spawn(async move {
        assistant
            .run_until(async {
                let _ = interrupt_rx.await;
            })
            .await
    });

    sleep(Duration::from_millis(50)).await;
    rig.assistant.handle().activate();
    // The model call is now in flight.
    sleep(Duration::from_millis(100)).await;
    interrupt_tx.send(()).unwrap();

    timeout(Duration::from_secs(1), runner)
        .await
        .expect("interrupt did not end the turn")
        .unwrap()
        .unwrap();

    assert_eq!(speech.spoken(), vec![WELCOME_MESSAGE]);
    assert_eq!(rig.pins.cleanup_count(), 1);
    assert!(rig.assistant.is_shut_down());
    assert_eq!(led_writes(&rig), vec![true, false]);
}

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use wunderkind::assistant::Assistant;
use wunderkind::config::AssistantConfig;
use wunderkind::hardware::{HardwareMonitor, SimulatedPins};
use wunderkind::llm::create_provider;
use wunderkind::speech::ConsoleSpeech;
use wunderkind::world::WorldModel;

const LOG_FILE: &str = "wunderkind.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Console + file logging
    let log_dir = std::env::var("WUNDERKIND_LOG_DIR").unwrap_or_else(|_| ".".to_string());
    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE);
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    let config = AssistantConfig::from_env().context("Failed to load configuration")?;

    eprintln!("Wunderkind v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Wake word: {}", config.dialogue.wake_word);
    eprintln!("   Log file: {}/{}", log_dir, LOG_FILE);
    eprintln!("   Type the wake word to start a turn, then your message. Ctrl+C to exit.\n");

    let llm = create_provider(&config.llm).context("Failed to create LLM provider")?;

    let world = Arc::new(WorldModel::new());
    let pins = Arc::new(SimulatedPins::new());
    let hardware = Arc::new(
        HardwareMonitor::new(Arc::clone(&world), pins, config.monitor.clone())
            .context("Failed to initialize hardware")?,
    );

    let speech = Arc::new(ConsoleSpeech::new(&config.speech));
    let assistant = Assistant::new(
        &config.dialogue,
        world,
        hardware,
        llm,
        speech.clone(),
        speech,
    );

    assistant.run().await?;
    Ok(())
}

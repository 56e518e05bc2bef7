//! Brainstorm application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialise tracing
//! 3. Build the speech services from the configured host programs
//! 4. Run the `chat` intake REPL or a `phase` countdown

mod cli;

use std::path::Path;
use std::sync::Arc;

use brainstorm_chat::{ConversationController, HttpReplyClient, ProceedOutcome};
use brainstorm_core::config::BrainstormConfig;
use brainstorm_core::error::BrainstormError;
use brainstorm_core::types::{PhaseMode, Utterance};
use brainstorm_phase::{format_clock, is_low_time, PhaseEvent, PhaseManager, Urgency};
use brainstorm_speech::{
    CommandPlayer, CommandRecognizer, CommandSynthesizer, ElevenLabsSynthesizer, ListenOutcome,
    LocalSynthesizer, Recognizer, RemoteSynthesizer, SpeechInputService, SpeechOutputService,
    VoiceDefaults,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{CliArgs, Command};

const CHAT_HELP: &str =
    "Type to talk. Commands: /listen (speak once), /proceed, /more, /stop (silence), /quit";

/// Build the narrator: remote synthesis with a player, local voice as fallback.
fn build_speech_output(config: &BrainstormConfig) -> Result<SpeechOutputService, BrainstormError> {
    let mut service = SpeechOutputService::new(VoiceDefaults::from_config(
        &config.synthesis,
        &config.fallback_voice,
    ));

    if config.synthesis.enabled {
        let synthesizer = ElevenLabsSynthesizer::from_config(&config.synthesis)?;
        match CommandPlayer::from_command(config.synthesis.player_command.clone()) {
            Some(player) if player.is_available() => {
                tracing::info!(
                    configured = synthesizer.is_configured(),
                    "Remote synthesis enabled"
                );
                service = service.with_remote(Arc::new(synthesizer), Arc::new(player));
            }
            _ => tracing::warn!("Audio player not found, remote synthesis disabled"),
        }
    }

    match CommandSynthesizer::from_config(&config.fallback_voice) {
        Some(local) => {
            if !local.is_available() {
                tracing::warn!(command = %config.fallback_voice.command, "Local voice program not found");
            }
            service = service.with_local(Arc::new(local));
        }
        None => tracing::info!("Local voice fallback disabled"),
    }

    Ok(service)
}

fn build_speech_input(config: &BrainstormConfig) -> SpeechInputService {
    let recognizer = CommandRecognizer::from_config(&config.recognition)
        .map(|r| Arc::new(r) as Arc<dyn Recognizer>);
    SpeechInputService::from_config(&config.recognition, recognizer)
}

fn print_assistant(utterance: &Utterance) {
    println!("assistant: {}", utterance.text);
}

/// Interactive intake conversation on stdin/stdout.
async fn run_chat(config: &BrainstormConfig, mute: bool) -> Result<(), BrainstormError> {
    let mut controller = ConversationController::new(config.conversation.clone());
    if let Some(remote) = HttpReplyClient::from_config(&config.conversation)? {
        tracing::info!(endpoint = %remote.endpoint(), "Remote replies enabled");
        controller = controller.with_remote(Arc::new(remote));
    }
    let speech = Arc::new(build_speech_output(config)?);
    if !mute {
        controller = controller.with_speech(Arc::clone(&speech));
    }
    let input = build_speech_input(config);
    if !input.is_available() {
        tracing::info!("Voice input unavailable, typed input only");
    }

    println!("{}", CHAT_HELP);
    print_assistant(&controller.start().await?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let text = match line {
            "/quit" | "/exit" => break,
            "/stop" => {
                speech.stop();
                input.stop_listening();
                continue;
            }
            "/more" => {
                print_assistant(&controller.request_more_info().await?);
                continue;
            }
            "/proceed" => {
                match controller.proceed().await? {
                    ProceedOutcome::Completed(summary) => {
                        println!("{}", serde_json::to_string_pretty(&summary)?);
                        break;
                    }
                    ProceedOutcome::NeedsTopic(prompt) => print_assistant(&prompt),
                }
                continue;
            }
            "/listen" => match input.listen().await {
                Ok(ListenOutcome::Heard(text)) => {
                    println!("you (voice): {}", text);
                    text
                }
                Ok(ListenOutcome::Stopped) => continue,
                Err(e) => {
                    eprintln!("voice input: {}", e);
                    continue;
                }
            },
            other => other.to_string(),
        };

        match controller.submit(&text).await {
            Ok(outcome) => {
                print_assistant(&outcome.reply);
                if let Some(prompt) = outcome.proceed_prompt {
                    print_assistant(&prompt);
                    println!("(type /proceed to continue)");
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    speech.stop();
    Ok(())
}

fn render_tick(remaining_seconds: u64, progress_fraction: f64) -> String {
    let urgency = Urgency::from_progress(progress_fraction);
    let marker = if is_low_time(remaining_seconds) { " !" } else { "" };
    format!("{} [{}]{}", format_clock(remaining_seconds), urgency, marker)
}

/// Countdown for one phase. `+` extends, `q` quits.
async fn run_phase(config: &BrainstormConfig, mode: PhaseMode) -> Result<(), BrainstormError> {
    let mut manager = PhaseManager::new(&config.phase);
    if manager.select_mode(mode, chrono::Utc::now()).is_none() {
        println!("{} phase: no countdown.", mode);
        return Ok(());
    }
    println!(
        "{} phase started. Enter '+' to add {}s, 'q' to stop.",
        mode, config.phase.extend_secs
    );

    let mut interval = tokio::time::interval(tokio::time::Duration::from_millis(
        config.phase.tick_interval_ms.max(1),
    ));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = interval.tick() => match manager.tick(chrono::Utc::now()) {
                Some(PhaseEvent::Tick(tick)) => {
                    println!("{}", render_tick(tick.remaining_seconds, tick.progress_fraction));
                }
                Some(PhaseEvent::Completed(_)) => {
                    println!("Time's up!");
                    break;
                }
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(cmd) if cmd.trim() == "+" => {
                    if manager.extend_default() {
                        tracing::info!(secs = config.phase.extend_secs, "Phase extended");
                    }
                }
                Some(cmd) if cmd.trim() == "q" => {
                    manager.clear();
                    break;
                }
                Some(_) => {}
                None => stdin_open = false,
            },
        }
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<(), BrainstormError> {
    if path.exists() && !force {
        return Err(BrainstormError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    BrainstormConfig::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config (read before tracing so its log level applies).
    let config_file = args.resolve_config_path();
    let loaded = BrainstormConfig::load(&config_file);
    let config_level = match &loaded {
        Ok(config) => config.general.log_level.clone(),
        Err(_) => BrainstormConfig::default().general.log_level,
    };

    // Tracing.
    let level = args.resolve_log_level(&config_level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    tracing::info!("Starting brainstorm v{}", env!("CARGO_PKG_VERSION"));

    let config = match loaded {
        Ok(config) => {
            tracing::info!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Err(e) => {
            tracing::warn!(path = %config_file.display(), error = %e, "Using default configuration");
            BrainstormConfig::default()
        }
    };

    match args.command() {
        Command::Chat => run_chat(&config, args.mute).await?,
        Command::Phase { mode } => run_phase(&config, mode).await?,
        Command::InitConfig { force } => init_config(&config_file, force)?,
    }

    Ok(())
}

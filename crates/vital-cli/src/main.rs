//! vital - terminal client for Vital Talk conversation practice

mod audio;
mod commands;
mod config;
mod render;
mod transcript_log;

use clap::{CommandFactory, Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use vital_api::{ApiClient, SpeechService};
use vital_session::{Session, WebSocketTransport};

use crate::audio::{CommandPlayer, CommandRecorder};
use crate::commands::CommandResult;
use crate::config::Config;
use crate::transcript_log::TranscriptLog;

/// vital - practice difficult conversations with a simulated family member
#[derive(Parser, Debug)]
#[command(name = "vital")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Service URL (default from config, then http://localhost:8000)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List practice scenarios
    Scenarios,

    /// Show one scenario
    Scenario { id: u64 },

    /// Start a conversation for a scenario
    Start {
        /// Scenario id
        #[arg(long)]
        scenario: u64,

        /// User id (default from config)
        #[arg(long)]
        user: Option<u64>,

        /// Join the conversation right away
        #[arg(long)]
        chat: bool,

        /// Don't speak agent replies
        #[arg(long)]
        no_audio: bool,
    },

    /// Join an existing conversation
    Chat {
        id: u64,

        /// Don't speak agent replies
        #[arg(long)]
        no_audio: bool,
    },

    /// Pause a conversation
    Pause { id: u64 },

    /// Resume a paused conversation
    Resume { id: u64 },

    /// Show the feedback report for a conversation
    Feedback { id: u64 },

    /// Show the saved transcript of a conversation, one section per join
    Log { id: u64 },

    /// Check the speech service
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("vital=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    // Load config file; CLI flags take precedence
    let cfg = Config::load();
    let server_url = args
        .server
        .unwrap_or_else(|| cfg.server_url().to_string());
    let client = ApiClient::with_timeout(server_url, cfg.request_timeout())?;

    match command {
        Command::Scenarios => {
            let scenarios = client
                .list_scenarios()
                .await
                .map_err(|e| service_error(e, "Failed to list scenarios"))?;
            println!("{}", render::scenario_list(&scenarios));
        }
        Command::Scenario { id } => {
            let scenario = client
                .get_scenario(id)
                .await
                .map_err(|e| service_error(e, &format!("Scenario {}", id)))?;
            println!("{}", render::scenario_list(&[scenario]));
        }
        Command::Start {
            scenario,
            user,
            chat,
            no_audio,
        } => {
            let user_id = user.unwrap_or_else(|| cfg.user_id());
            let info = client
                .start_conversation(scenario, user_id)
                .await
                .map_err(|e| service_error(e, &format!("Scenario {}", scenario)))?;
            println!(
                "Started conversation {} (scenario {}, emotional state: {})",
                info.id,
                info.scenario_id,
                info.current_emotional_state.label()
            );
            if chat {
                run_chat(&client, &cfg, info.id, cfg.audio_mode() && !no_audio).await?;
            } else {
                println!("Join it with: vital chat {}", info.id);
            }
        }
        Command::Chat { id, no_audio } => {
            run_chat(&client, &cfg, id, cfg.audio_mode() && !no_audio).await?;
        }
        Command::Pause { id } => {
            let reply = client
                .pause_conversation(id)
                .await
                .map_err(|e| service_error(e, &format!("Conversation {}", id)))?;
            print_status_reply("Paused", id, reply)?;
        }
        Command::Resume { id } => {
            let reply = client
                .resume_conversation(id)
                .await
                .map_err(|e| service_error(e, &format!("Conversation {}", id)))?;
            print_status_reply("Resumed", id, reply)?;
        }
        Command::Feedback { id } => {
            let report = client
                .feedback(id)
                .await
                .map_err(|e| service_error(e, &format!("Feedback for conversation {}", id)))?;
            print!("{}", render::feedback_report(&report));
        }
        Command::Log { id } => {
            let path = TranscriptLog::path_in(&TranscriptLog::transcripts_dir(), id);
            let joins = TranscriptLog::replay(&path)?;
            for (i, messages) in joins.iter().enumerate() {
                if joins.len() > 1 {
                    if i > 0 {
                        println!();
                    }
                    println!("--- join {} of {} ---", i + 1, joins.len());
                }
                for message in messages {
                    println!("{}", render::message_line(message));
                }
            }
        }
        Command::Health => {
            let health = client
                .audio_health()
                .await
                .map_err(|e| service_error(e, "Speech service"))?;
            println!("Speech service: {}", health.status);
            println!("  Transcription: {}", availability(health.whisper_available));
            println!("  Synthesis:     {}", availability(health.tts_available));
        }
    }

    Ok(())
}

/// Turn a service error into a message saying what to check
fn service_error(e: vital_api::Error, what: &str) -> anyhow::Error {
    if e.is_connection_error() {
        anyhow::anyhow!(
            "{}: cannot reach the service ({}). Is the server running? Set server_url in the config or pass --server.",
            what,
            e
        )
    } else if e.is_not_found() {
        anyhow::anyhow!("{}: not found", what)
    } else {
        anyhow::Error::new(e).context(what.to_string())
    }
}

fn availability(available: bool) -> &'static str {
    if available { "available" } else { "unavailable" }
}

fn print_status_reply(action: &str, id: u64, reply: vital_api::StatusReply) -> anyhow::Result<()> {
    if let Some(error) = reply.error {
        anyhow::bail!("Conversation {}: {}", id, error);
    }
    println!(
        "{} conversation {}{}",
        action,
        id,
        reply
            .status
            .map(|s| format!(" (status: {})", s))
            .unwrap_or_default()
    );
    Ok(())
}

async fn run_chat(
    client: &ApiClient,
    cfg: &Config,
    conversation_id: u64,
    audio_mode: bool,
) -> anyhow::Result<()> {
    if audio_mode {
        match client.audio_health().await {
            Ok(health) if !health.tts_available => {
                tracing::warn!("Speech synthesis is unavailable; replies will be silent")
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Could not check the speech service: {}", e),
        }
    }

    let speech: Arc<dyn SpeechService> = Arc::new(client.clone());
    let transport = WebSocketTransport::new();
    let url = client.session_url(conversation_id);

    let mut session = Session::open(&transport, &url, conversation_id)
        .await
        .with_audio_mode(audio_mode)
        .with_speech(speech)
        .with_audio_output(Arc::new(CommandPlayer::new(
            cfg.audio.player.clone(),
            cfg.audio_dir(),
        )));
    if let Some(recorder) = cfg.audio.recorder.clone() {
        session = session.with_audio_input(Arc::new(CommandRecorder::new(recorder)));
    }

    let mut log = match TranscriptLog::open(conversation_id, client.base_url()) {
        Ok(log) => Some(log),
        Err(e) => {
            tracing::warn!("Transcript will not be saved: {}", e);
            None
        }
    };

    if session.is_connected() {
        eprintln!(
            "Joined conversation {}. Type /help for commands.",
            conversation_id
        );
        eprintln!();
    } else {
        eprintln!("Could not connect to {}", url);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = session.next_event() => {
                let Some(event) = event else { break };
                if let Some(log) = log.as_mut() {
                    if let Err(e) = log.record(&event) {
                        tracing::warn!("Failed to write transcript: {}", e);
                    }
                }
                if let Some(line) = render::event_line(&event) {
                    if event.is_blocking_notice() {
                        eprintln!("{}", line);
                    } else {
                        println!("{}", line);
                    }
                }
            }
            line = lines.next_line() => {
                // EOF
                let Some(line) = line? else { break };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                match commands::execute_command(input, &session) {
                    Some(result) => {
                        if !apply_command(&mut session, result).await {
                            break;
                        }
                    }
                    None => {
                        if let Err(e) = session.send_message(input) {
                            report(&e);
                        }
                    }
                }
            }
        }
    }

    session.close();
    if let Some(log) = log {
        eprintln!("Transcript saved to {}", log.path().display());
    }
    eprintln!("Get feedback with: vital feedback {}", conversation_id);
    Ok(())
}

fn report(e: &vital_session::Error) {
    if e.is_user_facing() {
        eprintln!("Error: {}", e);
    } else {
        tracing::debug!("Ignored session error: {}", e);
    }
}

/// Apply a slash command to the session. Returns false to leave the chat.
async fn apply_command(session: &mut Session, result: CommandResult) -> bool {
    match result {
        CommandResult::Redo => match session.request_redo() {
            Ok(0) => println!("Nothing to undo yet."),
            Ok(_) => {}
            Err(e) => report(&e),
        },
        CommandResult::Hint => {
            if let Err(e) = session.request_hint() {
                report(&e);
            }
        }
        CommandResult::DismissHint => {
            if !session.dismiss_hint() {
                println!("No hint is showing.");
            }
        }
        CommandResult::SetAudio(enabled) => session.set_audio_mode(enabled),
        CommandResult::StartRecording => match session.start_recording().await {
            // Reported through the event stream
            Ok(()) | Err(vital_session::Error::MicrophoneUnavailable(_)) => {}
            Err(e) => report(&e),
        },
        CommandResult::StopRecording => {
            if let Err(e) = session.stop_recording() {
                report(&e);
            }
        }
        CommandResult::Message(msg) => println!("{}", msg),
        CommandResult::Exit => return false,
        CommandResult::Unknown(cmd) => {
            println!("Unknown command: /{}", cmd);
            println!("Type /help for available commands.");
        }
    }
    true
}

//! Command line surface: one subcommand per backend capability.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::app::{AppController, ChatSession};
use crate::domain::{
    ApiScheme, AudioClip, DomainError, Liveness, Notice, SynthesisResult,
};

/// VoxAI - text-to-speech, speech-to-text and voice chat from the terminal.
///
/// Talks to a VoxAI backend (default http://127.0.0.1:8000). Settings live in
/// the VoxAI config file; VOXAI_BACKEND_URL and VOXAI_API_SCHEME override it.
#[derive(Parser)]
#[command(name = "voxai")]
#[command(about = "VoxAI backend client")]
#[command(version)]
pub struct Cli {
    /// Backend origin for this invocation only
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// API scheme for this invocation only (v1 or legacy)
    #[arg(long, global = true)]
    pub scheme: Option<ApiScheme>,

    /// Request deadline in milliseconds for this invocation only, voice chat included
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether the backend is up
    Health,
    /// List synthesis voices
    Voices,
    /// List transcription languages
    Languages,
    /// Synthesize speech from text
    Tts(TtsArgs),
    /// Transcribe an audio file or a microphone recording
    Stt(SttArgs),
    /// One voice chat turn: speak, get a spoken answer
    Chat(ChatArgs),
    /// List microphone input devices
    Devices,
    /// Show or change the stored configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct TtsArgs {
    /// Text to synthesize
    #[arg(short = 't', long)]
    pub text: String,
    /// Voice id (defaults to synthesis.voice)
    #[arg(short = 'V', long)]
    pub voice: Option<String>,
    /// Speed multiplier, 0.25 to 4.0
    #[arg(long)]
    pub speed: Option<f32>,
    /// Pitch offset
    #[arg(long, allow_hyphen_values = true)]
    pub pitch: Option<f32>,
    /// Where to write returned audio
    #[arg(short = 'o', long, default_value = "speech.wav")]
    pub out: PathBuf,
}

/// Where the audio to upload comes from: exactly one of a file or a recording.
#[derive(Args)]
pub struct AudioInput {
    /// Audio file to upload
    #[arg(short = 'f', long, conflicts_with = "record", required_unless_present = "record")]
    pub file: Option<PathBuf>,
    /// Record from the microphone for this many seconds
    #[arg(short = 'r', long, value_name = "SECS")]
    pub record: Option<u64>,
    /// Input device id to record from (see `voxai devices`)
    #[arg(long, requires = "record")]
    pub device: Option<String>,
}

#[derive(Args)]
pub struct SttArgs {
    #[command(flatten)]
    pub input: AudioInput,
    /// Language hint, e.g. en_US ("auto" lets the backend detect)
    #[arg(short = 'l', long)]
    pub language: Option<String>,
}

#[derive(Args)]
pub struct ChatArgs {
    #[command(flatten)]
    pub input: AudioInput,
    /// Voice the assistant answers with (defaults to synthesis.voice)
    #[arg(short = 'V', long)]
    pub voice: Option<String>,
    /// Save the spoken answer here when the backend returns audio directly
    #[arg(short = 'o', long, default_value = "answer.wav")]
    pub out: PathBuf,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print config, data and log locations
    Paths,
    /// Store the backend origin and optionally the API scheme
    SetBackend {
        origin: String,
        #[arg(long)]
        scheme: Option<ApiScheme>,
    },
}

/// Application paths information.
#[derive(Serialize)]
pub struct AppPaths {
    pub data_dir: String,
    pub logs_dir: String,
    pub config_path: String,
}

/// Dispatch a parsed command line.
pub async fn execute(cli: Cli, controller: &AppController) -> anyhow::Result<()> {
    controller.override_backend(cli.backend.as_deref(), cli.scheme, cli.timeout_ms)?;

    match &cli.command {
        Commands::Health => health(controller, cli.json).await,
        Commands::Voices => voices(controller, cli.json).await,
        Commands::Languages => languages(controller, cli.json).await,
        Commands::Tts(args) => tts(controller, args, cli.json).await,
        Commands::Stt(args) => stt(controller, args, cli.json).await,
        Commands::Chat(args) => chat(controller, args, cli.json).await,
        Commands::Devices => devices(controller, cli.json),
        Commands::Config(args) => config(controller, args, cli.json),
    }
}

// ==================== Backend Commands ====================

/// Check backend liveness.
async fn health(controller: &AppController, json: bool) -> anyhow::Result<()> {
    let health = controller
        .api()
        .health()
        .await
        .map_err(|e| failure("Health check", e))?;

    if json {
        return print_json(&health);
    }

    match health.liveness {
        Liveness::Up => print_success(&format!(
            "Backend is up{}",
            health
                .version
                .as_deref()
                .map(|v| format!(" (version {})", v))
                .unwrap_or_default()
        )),
        Liveness::Down => print_error(&format!("Backend reports it is down: {}", health.raw)),
        Liveness::Unknown => print_info(&format!(
            "Backend answered without a status field: {}",
            health.raw
        )),
    }

    if !health.is_up() {
        anyhow::bail!("backend is not confirmed up");
    }
    Ok(())
}

/// List synthesis voices.
async fn voices(controller: &AppController, json: bool) -> anyhow::Result<()> {
    let voices = controller
        .api()
        .voices()
        .await
        .map_err(|e| failure("Loading voices", e))?;

    if json {
        return print_json(&voices);
    }

    for voice in &voices {
        println!(
            "{}\t{}\t{}",
            voice.id,
            voice.name,
            voice.language.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// List transcription languages.
async fn languages(controller: &AppController, json: bool) -> anyhow::Result<()> {
    let list = controller
        .api()
        .languages()
        .await
        .map_err(|e| failure("Loading languages", e))?;

    if json {
        return print_json(&list);
    }

    for language in &list.languages {
        let marker = if list.default.as_deref() == Some(language.code.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("{}\t{}{}", language.code, language.name, marker);
    }
    if list.fallback {
        print_info("Backend has no languages route, showing the built-in list");
    }
    Ok(())
}

/// Synthesize speech.
async fn tts(controller: &AppController, args: &TtsArgs, json: bool) -> anyhow::Result<()> {
    let request = controller.config().synthesis.request(
        &args.text,
        args.voice.as_deref(),
        args.speed,
        args.pitch,
    );

    let result = controller
        .api()
        .synthesize(&request)
        .await
        .map_err(|e| failure("Speech synthesis", e))?;

    match result {
        SynthesisResult::Audio(handle) => {
            let bytes = handle.len();
            let saved = handle.save_to(&args.out)?;
            if json {
                return print_json(&serde_json::json!({ "path": saved, "bytes": bytes }));
            }
            print_success(&format!("Saved {} to {}", format_bytes(bytes), saved.display()));
        }
        SynthesisResult::Hosted(hosted) => {
            if json {
                return print_json(&hosted);
            }
            match hosted.audio_url {
                Some(url) => println!("{}", url),
                None => anyhow::bail!("Speech synthesis failed: backend returned no audio"),
            }
        }
    }
    Ok(())
}

/// Transcribe a file or recording.
async fn stt(controller: &AppController, args: &SttArgs, json: bool) -> anyhow::Result<()> {
    let clip = capture(controller, &args.input).await?;

    let transcription = controller
        .api()
        .transcribe(&clip, args.language.as_deref())
        .await
        .map_err(|e| failure("Transcription", e))?;

    if json {
        return print_json(&transcription);
    }
    println!("{}", transcription.text);
    Ok(())
}

/// Run one voice chat turn.
async fn chat(controller: &AppController, args: &ChatArgs, json: bool) -> anyhow::Result<()> {
    let clip = capture(controller, &args.input).await?;
    let voice = args
        .voice
        .clone()
        .unwrap_or_else(|| controller.config().synthesis.voice);

    let mut session = ChatSession::new(controller.api(), voice);
    let turn = session
        .send(&clip)
        .await
        .map_err(|notice| anyhow::anyhow!(notice.message))?;

    let saved = match turn.audio {
        Some(audio) => Some(audio.save_to(&args.out)?),
        None => None,
    };

    if json {
        return print_json(&serde_json::json!({
            "messages": session.conversation().messages(),
            "saved_audio": saved,
        }));
    }

    for message in session.conversation().messages() {
        println!("{:?}: {}", message.role, message.text);
    }
    match (saved, turn.reply.audio_url) {
        (Some(path), _) => print_success(&format!("Saved answer to {}", path.display())),
        (None, Some(url)) => println!("Audio: {}", url),
        (None, None) => {}
    }
    Ok(())
}

// ==================== Audio Commands ====================

/// List audio input devices.
fn devices(controller: &AppController, json: bool) -> anyhow::Result<()> {
    let devices = controller.list_audio_devices()?;

    if json {
        return print_json(&devices);
    }

    for device in &devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("{}\t{}{}", device.id, device.name, marker);
    }
    Ok(())
}

// ==================== Config Commands ====================

fn config(controller: &AppController, args: &ConfigArgs, json: bool) -> anyhow::Result<()> {
    match args.command.as_ref().unwrap_or(&ConfigCommand::Show) {
        ConfigCommand::Show => {
            let config = controller.config();
            if json {
                print_json(&config)
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        }
        ConfigCommand::Paths => {
            let paths = AppPaths {
                data_dir: controller.data_dir(),
                logs_dir: controller.logs_dir(),
                config_path: controller.config_path(),
            };
            if json {
                print_json(&paths)
            } else {
                println!("config: {}", paths.config_path);
                println!("data:   {}", paths.data_dir);
                println!("logs:   {}", paths.logs_dir);
                Ok(())
            }
        }
        ConfigCommand::SetBackend { origin, scheme } => {
            let mut config = controller.stored_config()?;
            config.backend.origin = origin.trim().to_string();
            if let Some(scheme) = scheme {
                config.backend.scheme = *scheme;
            }
            controller.update_config(config)?;
            print_success(&format!("Backend set to {}", origin.trim()));
            Ok(())
        }
    }
}

// ==================== Helpers ====================

/// Read the clip from a file or record it from the microphone.
async fn capture(controller: &AppController, input: &AudioInput) -> anyhow::Result<AudioClip> {
    if let Some(path) = input.file.as_deref() {
        return Ok(load_clip(path)?);
    }
    if input.device.is_some() {
        controller.select_audio_device(input.device.as_deref())?;
    }

    let Some(secs) = input.record else {
        anyhow::bail!("either --file or --record is required");
    };

    controller.start_recording().await?;
    print_info(&format!("Recording for {} s...", secs));
    tokio::time::sleep(Duration::from_secs(secs)).await;
    let clip = controller.stop_recording().await?;
    print_info(&format!(
        "Captured {:.1} s of audio",
        clip.duration_secs().unwrap_or(0.0)
    ));
    Ok(clip)
}

fn load_clip(path: &Path) -> Result<AudioClip, DomainError> {
    if !path.is_file() {
        return Err(DomainError::validation(format!(
            "Audio file not found: {}",
            path.display()
        )));
    }
    AudioClip::from_file(path)
}

/// Workflow failure as the message the user sees.
fn failure(workflow: &str, err: DomainError) -> anyhow::Error {
    anyhow::anyhow!(Notice::failure(workflow, &err).message)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

fn print_error(msg: &str) {
    eprintln!("\x1b[31m✗\x1b[0m {}", msg);
}

fn print_info(msg: &str) {
    eprintln!("\x1b[34mℹ\x1b[0m {}", msg);
}

fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tts() {
        let cli = Cli::try_parse_from([
            "voxai", "--scheme", "legacy", "tts", "-t", "hello", "-V", "neural", "--pitch", "-2",
        ])
        .unwrap();

        assert_eq!(cli.scheme, Some(ApiScheme::Legacy));
        let Commands::Tts(args) = cli.command else {
            panic!("expected tts");
        };
        assert_eq!(args.text, "hello");
        assert_eq!(args.voice.as_deref(), Some("neural"));
        assert_eq!(args.pitch, Some(-2.0));
        assert_eq!(args.out, PathBuf::from("speech.wav"));
    }

    #[test]
    fn test_audio_input_is_exclusive_and_required() {
        assert!(Cli::try_parse_from(["voxai", "stt"]).is_err());
        assert!(Cli::try_parse_from(["voxai", "stt", "-f", "a.wav", "-r", "3"]).is_err());

        let cli = Cli::try_parse_from(["voxai", "chat", "--record", "4"]).unwrap();
        let Commands::Chat(args) = cli.command else {
            panic!("expected chat");
        };
        assert_eq!(args.input.record, Some(4));
        assert!(args.input.file.is_none());
        assert_eq!(args.out, PathBuf::from("answer.wav"));

        assert!(Cli::try_parse_from(["voxai", "stt", "-f", "a.wav", "--device", "mic"]).is_err());
        assert!(Cli::try_parse_from(["voxai", "stt", "-r", "2", "--device", "mic"]).is_ok());
    }

    #[test]
    fn test_missing_audio_file_is_validation_error() {
        let err = load_clip(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
    }
}

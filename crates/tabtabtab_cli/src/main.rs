//! CLI driver for the extension runtime.
//!
//! # Responsibility
//! - Verify `tabtabtab_core` wiring end to end without a real host.
//! - Dispatch one event read from a JSON file and print the outcome as JSON.

mod echo;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tabtabtab_core::{
    core_version, init_from_config, ChannelNotificationSender, ContextQuery, CopyContext,
    ExtensionDescriptor, ExtensionDirectory, ExtensionHost, HostConfig, PasteContext, SseEvent,
    UnavailableLlmProcessor,
};
use tokio::sync::mpsc::Receiver;

const PUSH_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "tabtabtab", about = "Dispatch clipboard events to built-in extensions")]
struct Cli {
    /// JSON host config; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the core crate version.
    Version,
    /// Dispatch a copy event payload.
    Copy { event: PathBuf },
    /// Dispatch a paste event payload.
    Paste { event: PathBuf },
    /// Dispatch a context query on behalf of `source`.
    Context {
        event: PathBuf,
        #[arg(long, default_value = "cli")]
        source: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    if matches!(cli.command, Command::Version) {
        println!("tabtabtab_core version={}", core_version());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => HostConfig::load(path).map_err(|err| err.to_string())?,
        None => HostConfig::default(),
    };
    init_from_config(&config).map_err(|err| err.to_string())?;

    let (sender, mut pushes) =
        ChannelNotificationSender::new(config.notification_channel_capacity);
    let host = ExtensionHost::from_directory(
        &builtin_directory()?,
        Arc::new(sender),
        Arc::new(UnavailableLlmProcessor),
    )
    .map_err(|err| err.to_string())?;

    let (output, pending_pushes) = dispatch_command(&host, cli.command, &config).await?;
    print_json(&output)?;
    for event in collect_pushes(&mut pushes, pending_pushes, PUSH_WAIT).await {
        let value = serde_json::to_value(&event).map_err(|err| err.to_string())?;
        print_json(&value)?;
    }
    Ok(())
}

/// Dispatches one event command, returning the rendered report and how many
/// push notifications the responses promised.
async fn dispatch_command(
    host: &ExtensionHost,
    command: Command,
    config: &HostConfig,
) -> Result<(Value, usize), String> {
    match command {
        Command::Version => Ok((json!({ "core_version": core_version() }), 0)),
        Command::Copy { event } => {
            let mut context: CopyContext = read_event(&event)?;
            fill_default_device(&mut context, &config.default_device_id);
            let report = host
                .dispatch_copy(context)
                .await
                .map_err(|err| err.to_string())?;
            let pending = report
                .responses()
                .filter(|(_, response)| response.is_processing_task)
                .count();
            Ok((report.to_json(), pending))
        }
        Command::Paste { event } => {
            let context: PasteContext = read_event(&event)?;
            let report = host
                .dispatch_paste(context)
                .await
                .map_err(|err| err.to_string())?;
            let pending = report
                .responses()
                .filter(|(_, response)| response.is_processing_task)
                .count();
            Ok((report.to_json(), pending))
        }
        Command::Context { event, source } => {
            let query: ContextQuery = read_event(&event)?;
            let report = host
                .dispatch_context_request(&source, query)
                .await
                .map_err(|err| err.to_string())?;
            Ok((report.to_json(), 0))
        }
    }
}

fn fill_default_device(context: &mut CopyContext, default_device_id: &str) {
    if context.device_id.is_none() {
        context.device_id = Some(default_device_id.to_string());
    }
}

fn builtin_directory() -> Result<ExtensionDirectory, String> {
    let mut directory = ExtensionDirectory::new();
    let descriptor = ExtensionDescriptor::new(
        echo::ECHO_EXTENSION_ID,
        "Acknowledges copies, pushes summaries, pastes session contents",
        echo::build,
    )
    .map_err(|err| err.to_string())?;
    directory.register(descriptor).map_err(|err| err.to_string())?;
    Ok(directory)
}

fn read_event<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read event `{}`: {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("failed to parse event `{}`: {err}", path.display()))
}

/// Waits up to `wait` per event for `expected` pushes; returns early when the
/// channel closes or a wait elapses.
async fn collect_pushes(
    pushes: &mut Receiver<SseEvent>,
    expected: usize,
    wait: Duration,
) -> Vec<SseEvent> {
    let mut events = Vec::with_capacity(expected);
    while events.len() < expected {
        match tokio::time::timeout(wait, pushes.recv()).await {
            Ok(Some(event)) => events.push(event),
            Ok(None) | Err(_) => break,
        }
    }
    events
}

fn print_json(value: &Value) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        builtin_directory, collect_pushes, dispatch_command, fill_default_device, run, Cli,
        Command,
    };
    use clap::Parser;
    use serde_json::{json, Map};
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;
    use tabtabtab_core::{
        ChannelNotificationSender, CopyContext, ExtensionHost, HostConfig, SseEvent, Timestamp,
        UnavailableLlmProcessor,
    };
    use tempfile::NamedTempFile;

    fn push(device_id: &str) -> SseEvent {
        SseEvent {
            device_id: device_id.to_string(),
            event_name: "extension_notification".to_string(),
            data: Map::new(),
        }
    }

    fn event_file(value: serde_json::Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp event file");
        write!(file, "{value}").expect("write event");
        file
    }

    #[test]
    fn default_device_fills_only_missing_ids() {
        let mut anonymous = CopyContext::new("r1", Timestamp::default());
        fill_default_device(&mut anonymous, "local-device");
        assert_eq!(anonymous.device_id.as_deref(), Some("local-device"));

        let mut explicit = CopyContext::new("r2", Timestamp::default()).with_device_id("phone");
        fill_default_device(&mut explicit, "local-device");
        assert_eq!(explicit.device_id.as_deref(), Some("phone"));
    }

    #[tokio::test]
    async fn push_wait_returns_partial_result_after_timeout() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        tx.send(push("device-1")).await.expect("queue push");

        let events = collect_pushes(&mut rx, 2, Duration::from_millis(50)).await;
        assert_eq!(events, vec![push("device-1")]);
        drop(tx);
    }

    #[tokio::test]
    async fn push_wait_stops_when_channel_closes() {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<SseEvent>(1);
        drop(tx);
        let events = collect_pushes(&mut rx, 3, Duration::from_secs(5)).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn copy_without_device_is_pushed_to_default_device() {
        let (sender, mut rx) = ChannelNotificationSender::new(4);
        let host = ExtensionHost::from_directory(
            &builtin_directory().expect("builtin directory"),
            Arc::new(sender),
            Arc::new(UnavailableLlmProcessor),
        )
        .expect("host");
        let event = event_file(json!({
            "request_id": "r1",
            "timestamp": "2024-01-01T00:00:00",
            "window_info": {},
            "screenshot_provided": false,
            "selected_text": "hello"
        }));

        let config = HostConfig::default();
        let (output, pending) = dispatch_command(
            &host,
            Command::Copy {
                event: event.path().to_path_buf(),
            },
            &config,
        )
        .await
        .expect("dispatch copy");

        assert_eq!(pending, 1);
        assert_eq!(output["request_id"], "r1");
        assert_eq!(output["responses"][0]["response"]["is_processing_task"], true);

        let events = collect_pushes(&mut rx, pending, Duration::from_secs(5)).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].device_id, config.default_device_id);
        assert_eq!(events[0].data["notification_status"], "error");
    }

    #[tokio::test]
    async fn unreadable_event_file_is_reported_as_error() {
        let cli = Cli::try_parse_from(["tabtabtab", "copy", "/nonexistent/tabtabtab-event.json"])
            .expect("parse args");
        let err = run(cli).await.expect_err("missing event file must fail");
        assert!(err.contains("failed to read event"), "{err}");

        let event = event_file(json!({ "request_id": "r2" }));
        let cli = Cli::try_parse_from([
            "tabtabtab".to_string(),
            "copy".to_string(),
            event.path().display().to_string(),
        ])
        .expect("parse args");
        let err = run(cli).await.expect_err("copy without timestamp must fail");
        assert!(err.contains("failed to parse event"), "{err}");
    }
}

mod chat;
mod setup;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use debate_core::config::DEFAULT_SERVER_URL;
use debate_core::{RoomKind, RoomProvisioner, RosterForm, ServerConfig, SettingsStore};

#[derive(Parser)]
#[command(name = "debate-room", version, about = "Join AI-facilitated debate and discussion rooms")]
struct Cli {
    /// Room server address (http, https, ws or wss).
    #[arg(long, global = true, env = "DEBATE_ROOM_SERVER")]
    server: Option<String>,

    /// Directory holding settings.json.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Give up on HTTP requests after this many seconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a room and start chatting")]
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        room_type: Option<RoomKind>,
        /// Participant name; repeat for each participant.
        #[arg(long = "participant")]
        participants: Vec<String>,
    },

    #[command(about = "Join an existing room by id or link")]
    Join {
        room: String,
        #[arg(long)]
        name: Option<String>,
    },

    #[command(about = "List active rooms")]
    Rooms,

    #[command(about = "Show or change saved settings")]
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    #[command(about = "Print saved settings")]
    Show,
    #[command(about = "Save the display name (omit to clear)")]
    SetName { name: Option<String> },
    #[command(about = "Save the server address (omit to clear)")]
    SetServer { url: Option<String> },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "debate_core=debug,debate_cli=debug"
    } else {
        "debate_core=info,debate_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::config_dir()
            .map(|dir| dir.join("debate-room"))
            .context("no config directory on this system, pass --data-dir")?,
    };
    let store = SettingsStore::new(&data_dir);
    tracing::debug!("settings at {}", store.path().display());

    let server = cli
        .server
        .or(store.get().server_url)
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let config = || -> Result<ServerConfig> {
        let config = ServerConfig::parse(&server)
            .with_context(|| format!("bad server address {server:?}"))?;
        Ok(match cli.timeout {
            Some(secs) => config.with_request_timeout(Duration::from_secs(secs)),
            None => config,
        })
    };

    match cli.command {
        Commands::Create {
            name,
            room_type,
            participants,
        } => create(&store, config()?, name, room_type, participants).await,
        Commands::Join { room, name } => join(&store, config()?, &room, name).await,
        Commands::Rooms => list_rooms(config()?).await,
        // Settings stay editable even when the saved server address is broken.
        Commands::Settings { action } => settings(&store, &server, action),
    }
}

async fn create(
    store: &SettingsStore,
    config: ServerConfig,
    name: Option<String>,
    room_type: Option<RoomKind>,
    participants: Vec<String>,
) -> Result<()> {
    let saved = store.get();
    let from_flags = !participants.is_empty();
    let mut form = if from_flags {
        RosterForm::with_participants(participants)
    } else if !saved.participant_names.is_empty() {
        RosterForm::with_participants(saved.participant_names.clone())
    } else {
        RosterForm::new()
    };
    form.name = name.or(saved.display_name).unwrap_or_default();
    form.room_type = room_type.unwrap_or(saved.room_type);

    let mut input = setup::stdin_lines();
    let request = setup::fill_form(&mut form, &mut input, !from_flags).await?;
    store.set_display_name(Some(form.name.trim().to_string()));
    store.remember_setup(request.room_type(), request.participant_names().to_vec());

    let provisioner = RoomProvisioner::new(config.clone())?;
    let descriptor = loop {
        println!("Creating {} room...", request.room_type());
        match provisioner.create_room(&request).await {
            Ok(descriptor) => break descriptor,
            Err(e) => {
                if !setup::confirm(&mut input, &format!("{e}. Retry?")).await? {
                    anyhow::bail!(e);
                }
            }
        }
    };
    tracing::info!("created room {}", descriptor.room_id);
    println!("Room {} is ready.", descriptor.room_id);

    chat::run(&config, descriptor, &form.name, &mut input).await
}

async fn join(store: &SettingsStore, config: ServerConfig, room: &str, name: Option<String>) -> Result<()> {
    let room_id = RoomProvisioner::parse_room_id(room)?;
    let provisioner = RoomProvisioner::new(config.clone())?;
    let descriptor = provisioner.fetch_room(&room_id).await?;

    let mut input = setup::stdin_lines();
    let name = setup::ask_name(&mut input, name.or(store.get().display_name)).await?;
    store.set_display_name(Some(name.clone()));

    chat::run(&config, descriptor, &name, &mut input).await
}

async fn list_rooms(config: ServerConfig) -> Result<()> {
    let provisioner = RoomProvisioner::new(config)?;
    let rooms = provisioner.list_rooms().await?;
    if rooms.is_empty() {
        println!("No active rooms.");
        return Ok(());
    }
    for room in rooms {
        println!(
            "{:<10} {:<10} {:<40} {}",
            room.room_id,
            room.room_type.to_string(),
            room.topic.as_deref().unwrap_or("-"),
            room.participants.join(", ")
        );
    }
    Ok(())
}

fn settings(store: &SettingsStore, server: &str, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let s = store.get();
            println!("file:         {}", store.path().display());
            println!("name:         {}", s.display_name.as_deref().unwrap_or("-"));
            println!("server:       {}", s.server_url.as_deref().unwrap_or("-"));
            println!("using server: {server}");
            println!("room type:    {}", s.room_type.label());
            println!("participants: {}", s.participant_names.join(", "));
        }
        SettingsAction::SetName { name } => {
            let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
            store.set_display_name(name);
        }
        SettingsAction::SetServer { url } => {
            if let Some(url) = &url {
                ServerConfig::parse(url)?;
            }
            store.set_server_url(url);
        }
    }
    Ok(())
}

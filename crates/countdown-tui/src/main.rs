mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod mpv;
mod theme;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use countdown_proto::config::{self, Config};
use countdown_proto::presentation::{SurfaceChange, Visibility};
use tokio::sync::{broadcast, mpsc};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::core::PlayerHealth;

/// What the PlayerCore broadcasts to the UI.
#[derive(Debug, Clone)]
pub enum CoreBroadcast {
    /// One region toggled, with every region's state after the toggle so a
    /// receiver that lagged resyncs on the next message.
    Surface {
        change: SurfaceChange,
        visibility: Visibility,
    },
    /// Playback position or duration changed.
    Timeline {
        time_pos: Option<f64>,
        duration: Option<f64>,
    },
    Health(PlayerHealth),
    /// A WARN/ERROR line from the tracing layer.
    Log(String),
}

#[derive(Debug, Parser)]
#[command(name = "countdown", about = "Intro video and countdown to the event")]
struct Cli {
    /// Video to play instead of the configured one.
    #[arg(long, value_name = "PATH", conflicts_with = "no_video")]
    video: Option<PathBuf>,

    /// Event instant, RFC 3339 (e.g. 2029-10-06T13:00:00+02:00).
    #[arg(long, value_name = "RFC3339")]
    target: Option<String>,

    /// Skip the player; content appears after the load timeout.
    #[arg(long)]
    no_video: bool,
}

/// Forwards WARN and ERROR events to the broadcast channel.
struct BroadcastLayer {
    sender: broadcast::Sender<CoreBroadcast>,
}

impl BroadcastLayer {
    fn new(sender: broadcast::Sender<CoreBroadcast>) -> Self {
        Self { sender }
    }
}

impl<S> tracing_subscriber::Layer<S> for BroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = event.metadata().level();
        if !matches!(*level, tracing::Level::WARN | tracing::Level::ERROR) {
            return;
        }

        let mut message = format!("{} [{}] ", chrono::Local::now().format("%H:%M:%S"), level);
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        // no receivers yet is fine
        let _ = self.sender.send(CoreBroadcast::Log(message));
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // broadcast first so the log layer can use it
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<CoreBroadcast>(256);

    let data_dir = countdown_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("countdown.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(BroadcastLayer::new(broadcast_tx.clone()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,countdown_tui=debug,countdown_proto=debug")
            }),
        )
        .init();

    // the terminal is about to be taken over; print where the log goes
    eprintln!("countdown log: {}", log_path.display());
    info!("countdown starting…");

    let mut config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());
    if let Some(target) = cli.target.as_deref() {
        config.event.target = config::parse_target(target)?;
    }
    if let Some(video) = cli.video {
        config.video.path = video;
    }
    config.validate()?;

    info!(
        "event: {} on {}",
        config.event.title,
        config.event.target.format("%d.%m.%Y %H:%M %:z")
    );

    let video = (!cli.no_video).then(|| config.video.path.clone());

    // all inputs into the core funnel through this channel
    let (event_tx, event_rx) = mpsc::channel::<core::CoreEvent>(256);

    let player_core = core::PlayerCore::new(&config, video, broadcast_tx.clone(), event_tx.clone());
    tokio::spawn(async move {
        if let Err(e) = player_core.run(event_rx).await {
            tracing::error!("PlayerCore exited with error: {}", e);
        }
    });

    let app = app::App::new(&config, event_tx);
    app.run(broadcast_rx).await?;

    info!("countdown exiting");
    Ok(())
}

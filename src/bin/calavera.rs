use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use calavera_lib::audio::NativeAudioHost;
use calavera_lib::playback::{PlaybackState, Session, SessionObserver, SessionSnapshot};
use calavera_lib::poem::Poem;
use calavera_lib::settings::{AppSettings, Surface};
use calavera_lib::speech::{SpeechEngine, UtteranceRequest, Voice};

/// Play the calavera stanza by stanza through the default audio device.
#[derive(Parser, Debug)]
#[command(name = "calavera", version)]
struct Cli {
    /// Poem text file; the bundled calavera when omitted.
    #[arg(long)]
    poem: Option<PathBuf>,

    /// Directory that relative asset paths are resolved against.
    #[arg(long, default_value = ".")]
    assets: PathBuf,

    /// Settings JSON file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print every stanza and mark the one playing.
    #[arg(long)]
    show_all: bool,

    /// Output volume, 0.0 to 1.0.
    #[arg(long, default_value_t = 1.0)]
    volume: f32,
}

/// The terminal has no speech synthesizer
struct NoSpeech;

impl SpeechEngine for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn speak(&mut self, _request: UtteranceRequest) {}
    fn cancel(&mut self) {}
    fn pause(&mut self) {}
    fn resume(&mut self) {}

    fn is_speaking(&self) -> bool {
        false
    }

    fn is_paused(&self) -> bool {
        false
    }
}

struct Forward(mpsc::UnboundedSender<SessionSnapshot>);

impl SessionObserver for Forward {
    fn snapshot_changed(&self, snapshot: &SessionSnapshot) {
        let _ = self.0.send(snapshot.clone());
    }
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    if snapshot.state == PlaybackState::Idle {
        return;
    }
    println!("-- {} --", snapshot.view.status);
    for stanza in &snapshot.view.stanzas {
        let marker = if stanza.highlighted { "> " } else { "  " };
        for line in &stanza.lines {
            println!("{}{}", marker, line);
        }
        println!();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    calavera_lib::init_tracing();
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => AppSettings::load_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => AppSettings::default(),
    };
    settings.assets = settings.assets.resolve(&cli.assets);
    settings.interface.surface = Surface::Stanzas;
    settings.interface.show_all |= cli.show_all;

    let poem = match &cli.poem {
        Some(path) => Poem::load(path).with_context(|| format!("failed to load {}", path.display()))?,
        None => Poem::bundled(),
    };
    if let Some(title) = poem.title() {
        println!("{}\n", title);
    }

    let (audio_tx, audio_rx) = mpsc::unbounded_channel();
    let host = NativeAudioHost::new(audio_tx).context("failed to open audio output")?;
    host.set_volume(cli.volume);

    let (snapshot_tx, mut snapshots) = mpsc::unbounded_channel();
    let (session, task) = Session::spawn(
        poem,
        &settings,
        host,
        NoSpeech,
        audio_rx,
        Some(Box::new(Forward(snapshot_tx))),
    );
    session.play().await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            Some(snapshot) = snapshots.recv() => {
                print_snapshot(&snapshot);
                if snapshot.state == PlaybackState::Ended {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupted, stopping playback");
                break;
            }
        }
    }

    session.shutdown().await?;
    task.await.context("playback session panicked")?;
    Ok(())
}

// Presentation model
// Maps playback state onto visible stanzas and the button set

use serde::Serialize;

use crate::playback::state::PlaybackState;
use crate::poem::Poem;
use crate::settings::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Control {
    Play,
    Pause,
    Resume,
    Stop,
    Replay,
    ShowAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StanzaView {
    pub index: usize,
    pub lines: Vec<String>,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub title: Option<String>,
    pub status: String,
    pub stanzas: Vec<StanzaView>,
    pub controls: Vec<Control>,
    pub show_all: bool,
}

pub fn controls_for(state: PlaybackState) -> Vec<Control> {
    let mut controls = match state {
        PlaybackState::Idle => vec![Control::Play],
        PlaybackState::Playing => vec![Control::Pause, Control::Stop],
        PlaybackState::Paused => vec![Control::Resume, Control::Stop],
        PlaybackState::Ended => vec![Control::Replay],
    };
    controls.push(Control::ShowAll);
    controls
}

fn status_for(surface: Surface, state: PlaybackState, index: usize, total: usize) -> String {
    match (state, surface) {
        (PlaybackState::Idle, _) => "Listo para comenzar".to_string(),
        (PlaybackState::Playing, Surface::Stanzas) => {
            format!("Estrofa {} de {}", (index + 1).min(total), total)
        }
        (PlaybackState::Playing, Surface::Narration) => "Narrando…".to_string(),
        (PlaybackState::Paused, _) => "En pausa".to_string(),
        (PlaybackState::Ended, _) => "Fin de la calavera".to_string(),
    }
}

/// Build the view for the current playback position
///
/// On the stanza surface only the current stanza is shown unless `show_all`
/// is set, in which case every stanza is listed and the current one
/// highlighted. Narration has no notion of a current stanza.
pub fn render(
    poem: &Poem,
    surface: Surface,
    state: PlaybackState,
    index: usize,
    show_all: bool,
) -> ViewModel {
    let total = poem.len();
    let current = match (surface, state) {
        (Surface::Stanzas, PlaybackState::Playing | PlaybackState::Paused) if index < total => {
            Some(index)
        }
        _ => None,
    };

    let visible: Vec<usize> = match surface {
        _ if show_all => (0..total).collect(),
        Surface::Stanzas => match state {
            PlaybackState::Idle => Vec::new(),
            PlaybackState::Ended => total.checked_sub(1).into_iter().collect(),
            _ => current.into_iter().collect(),
        },
        Surface::Narration => match state {
            PlaybackState::Idle => Vec::new(),
            _ => (0..total).collect(),
        },
    };

    let stanzas = visible
        .into_iter()
        .filter_map(|i| {
            poem.stanza(i).map(|s| StanzaView {
                index: i,
                lines: s.lines().to_vec(),
                highlighted: show_all && current == Some(i),
            })
        })
        .collect();

    ViewModel {
        title: poem.title().map(str::to_string),
        status: status_for(surface, state, index, total),
        stanzas,
        controls: controls_for(state),
        show_all,
    }
}

// Native audio host
// Clips are decoded on loader threads and mixed on a dedicated output thread

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::decoder::decode_file;
use super::output::DeviceSink;
use super::resample::conform;
use super::{AudioClip, AudioEvent, AudioEventKind, AudioHost, ClipId};
use crate::error::AudioError;

/// Frames mixed per pass of the output thread
const MIX_BLOCK_FRAMES: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoiceStatus {
    Loading,
    Ready,
    Playing,
    Paused,
    Done,
    Failed,
}

struct Voice {
    samples: Arc<Vec<f32>>,
    pos: usize,
    status: VoiceStatus,
    /// `play` arrived while still loading
    autoplay: bool,
}

struct Shared {
    voices: Mutex<HashMap<ClipId, Voice>>,
    events: UnboundedSender<AudioEvent>,
    running: AtomicBool,
    flush: AtomicBool,
    volume: Mutex<f32>,
    sample_rate: u32,
    channels: usize,
}

impl Shared {
    fn emit(&self, clip: ClipId, kind: AudioEventKind) {
        let _ = self.events.send(AudioEvent::new(clip, kind));
    }
}

/// [`AudioHost`] that plays through the default output device
pub struct NativeAudioHost {
    shared: Arc<Shared>,
}

impl NativeAudioHost {
    /// Open the output device and start the mixer thread. Clip events are
    /// delivered on `events`.
    pub fn new(events: UnboundedSender<AudioEvent>) -> Result<Self, AudioError> {
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shared_tx, shared_rx) = std_mpsc::channel::<Arc<Shared>>();

        thread::Builder::new()
            .name("calavera-mixer".to_string())
            .spawn(move || {
                let mut output = match DeviceSink::open_default() {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok((output.sample_rate(), output.channels() as usize)));
                if let Ok(shared) = shared_rx.recv() {
                    mix_loop(&mut output, &shared);
                }
            })
            .map_err(|e| AudioError::Output(format!("failed to spawn mixer thread: {}", e)))?;

        let (sample_rate, channels) = ready_rx
            .recv()
            .map_err(|_| AudioError::Output("mixer thread exited during startup".to_string()))??;

        let shared = Arc::new(Shared {
            voices: Mutex::new(HashMap::new()),
            events,
            running: AtomicBool::new(true),
            flush: AtomicBool::new(false),
            volume: Mutex::new(1.0),
            sample_rate,
            channels,
        });
        shared_tx
            .send(shared.clone())
            .map_err(|_| AudioError::Output("mixer thread exited during startup".to_string()))?;

        debug!(sample_rate, channels, "audio output ready");
        Ok(Self { shared })
    }

    pub fn set_volume(&self, volume: f32) {
        *self.shared.volume.lock() = volume.clamp(0.0, 1.0);
    }
}

impl Drop for NativeAudioHost {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }
}

fn mix_loop(output: &mut DeviceSink, shared: &Shared) {
    let block_len = MIX_BLOCK_FRAMES * shared.channels;
    let mut block = vec![0.0f32; block_len];
    let mut mixed: Vec<f32> = Vec::with_capacity(block_len);
    let mut offset = 0;

    while shared.running.load(Ordering::SeqCst) {
        if shared.flush.swap(false, Ordering::SeqCst) {
            output.flush();
            offset = mixed.len();
        }

        output.set_gain(*shared.volume.lock());

        if offset >= mixed.len() {
            block.iter_mut().for_each(|s| *s = 0.0);
            let mut finished = Vec::new();
            {
                let mut voices = shared.voices.lock();
                for (id, voice) in voices.iter_mut() {
                    if voice.status != VoiceStatus::Playing {
                        continue;
                    }
                    let remaining = &voice.samples[voice.pos.min(voice.samples.len())..];
                    let take = remaining.len().min(block_len);
                    for (dst, src) in block.iter_mut().zip(&remaining[..take]) {
                        *dst += *src;
                    }
                    voice.pos += take;
                    if voice.pos >= voice.samples.len() {
                        voice.status = VoiceStatus::Done;
                        finished.push(*id);
                    }
                }
            }
            for id in finished {
                shared.emit(id, AudioEventKind::Ended);
            }
            mixed.clear();
            mixed.extend(block.iter().map(|s| s.clamp(-1.0, 1.0)));
            offset = 0;
        }

        offset += output.push(&mixed[offset..]);
        if offset < mixed.len() {
            // Ring is full; let the device drain it
            thread::sleep(Duration::from_millis(2));
        }
    }
    debug!(starved = output.starved_callbacks(), "mixer thread stopped");
}

impl AudioHost for NativeAudioHost {
    type Clip = NativeClip;

    fn open(&self, id: ClipId, path: &Path) -> NativeClip {
        self.shared.voices.lock().insert(
            id,
            Voice {
                samples: Arc::new(Vec::new()),
                pos: 0,
                status: VoiceStatus::Loading,
                autoplay: false,
            },
        );

        let shared = self.shared.clone();
        let path = path.to_path_buf();
        let spawned = thread::Builder::new()
            .name("calavera-loader".to_string())
            .spawn(move || load_clip(&shared, id, path));
        if let Err(e) = spawned {
            self.shared
                .emit(id, AudioEventKind::Failed(format!("failed to spawn loader: {}", e)));
        }

        NativeClip {
            id,
            shared: self.shared.clone(),
        }
    }
}

fn load_clip(shared: &Shared, id: ClipId, path: PathBuf) {
    let decoded = decode_file(&path).and_then(|clip| conform(clip, shared.sample_rate, shared.channels));

    let mut voices = shared.voices.lock();
    // Released while loading
    let Some(voice) = voices.get_mut(&id) else {
        return;
    };

    match decoded {
        Ok(samples) => {
            voice.samples = Arc::new(samples);
            voice.status = VoiceStatus::Ready;
            let autoplay = std::mem::take(&mut voice.autoplay);
            if autoplay {
                voice.status = VoiceStatus::Playing;
            }
            drop(voices);
            shared.emit(id, AudioEventKind::Ready);
            if autoplay {
                shared.emit(id, AudioEventKind::Started);
            }
        }
        Err(e) => {
            voice.status = VoiceStatus::Failed;
            drop(voices);
            warn!(path = %path.display(), error = %e, "failed to load clip");
            shared.emit(id, AudioEventKind::Failed(e.to_string()));
        }
    }
}

/// Handle to one clip in the mixer; dropping it removes the clip
pub struct NativeClip {
    id: ClipId,
    shared: Arc<Shared>,
}

impl AudioClip for NativeClip {
    fn id(&self) -> ClipId {
        self.id
    }

    fn play(&mut self) {
        let event = {
            let mut voices = self.shared.voices.lock();
            let Some(voice) = voices.get_mut(&self.id) else {
                return;
            };
            match voice.status {
                VoiceStatus::Loading => {
                    voice.autoplay = true;
                    None
                }
                VoiceStatus::Ready | VoiceStatus::Paused | VoiceStatus::Done => {
                    if voice.status == VoiceStatus::Done {
                        voice.pos = 0;
                    }
                    voice.status = VoiceStatus::Playing;
                    Some(AudioEventKind::Started)
                }
                VoiceStatus::Playing => None,
                VoiceStatus::Failed => Some(AudioEventKind::PlayRejected(
                    "clip failed to load".to_string(),
                )),
            }
        };
        if let Some(kind) = event {
            self.shared.emit(self.id, kind);
        }
    }

    fn pause(&mut self) -> bool {
        let mut voices = self.shared.voices.lock();
        match voices.get_mut(&self.id) {
            Some(voice) if voice.status == VoiceStatus::Playing => {
                voice.status = VoiceStatus::Paused;
                true
            }
            Some(voice) => {
                voice.autoplay = false;
                false
            }
            None => false,
        }
    }

    fn resume(&mut self) -> bool {
        let mut voices = self.shared.voices.lock();
        match voices.get_mut(&self.id) {
            Some(voice) if voice.status == VoiceStatus::Paused => {
                voice.status = VoiceStatus::Playing;
                true
            }
            _ => false,
        }
    }

    fn rewind(&mut self) {
        if let Some(voice) = self.shared.voices.lock().get_mut(&self.id) {
            voice.pos = 0;
            if voice.status == VoiceStatus::Done {
                voice.status = VoiceStatus::Ready;
            }
        }
    }
}

impl Drop for NativeClip {
    fn drop(&mut self) {
        let removed = self.shared.voices.lock().remove(&self.id);
        if removed.is_some_and(|v| v.status == VoiceStatus::Playing) {
            self.shared.flush.store(true, Ordering::SeqCst);
        }
    }
}

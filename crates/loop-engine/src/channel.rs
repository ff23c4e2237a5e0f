//! A channel: the unit the mixer renders. Most channels carry a
//! [`SamplePlayer`]; `MASTER_OUT`, `MASTER_IN` and `PREVIEW` are internal
//! buses that only ever accumulate what other channels render into them.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;

use atomic_float::AtomicF32;

use crate::buffer::AudioBuffer;
use crate::clock::Clock;
use crate::events::Event;
use crate::midi::MidiReceiver;
use crate::sample_player::{SamplePlayer, SamplePlayerMode, SamplePlayerState};
use crate::types::{AtomicChannelStatus, ChannelId, ChannelStatus};
use crate::wave::Wave;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Master,
    Preview,
    Sample,
    Midi,
}

impl ChannelKind {
    pub fn is_internal(self) -> bool {
        matches!(self, ChannelKind::Master | ChannelKind::Preview)
    }
}

/// The lock-free half of a channel's configuration: everything the audio
/// thread reads every block and the UI thread occasionally writes.
pub struct ChannelState {
    id: ChannelId,
    kind: ChannelKind,
    column_id: ChannelId,
    status: AtomicChannelStatus,
    volume: AtomicF32,
    pan: AtomicF32,
    mute: AtomicBool,
    solo: AtomicBool,
    armed: AtomicBool,
    /// User-thread only; never touched by the audio callback.
    name: StdMutex<String>,
}

impl ChannelState {
    pub fn new(id: ChannelId, kind: ChannelKind, column_id: ChannelId) -> Self {
        Self {
            id,
            kind,
            column_id,
            status: AtomicChannelStatus::new(if kind.is_internal() {
                ChannelStatus::Play
            } else {
                ChannelStatus::Empty
            }),
            volume: AtomicF32::new(1.0),
            pan: AtomicF32::new(0.5),
            mute: AtomicBool::new(false),
            solo: AtomicBool::new(false),
            armed: AtomicBool::new(false),
            name: StdMutex::new(String::new()),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn column_id(&self) -> ChannelId {
        self.column_id
    }

    pub fn status(&self) -> ChannelStatus {
        self.status.load_rt()
    }

    pub fn status_for_ui(&self) -> ChannelStatus {
        self.status.load_ui()
    }

    pub fn volume(&self) -> f32 {
        self.volume.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.max(0.0), Ordering::Relaxed);
    }

    pub fn pan_unit(&self) -> f32 {
        self.pan.load(Ordering::Relaxed)
    }

    pub fn set_pan_unit(&self, pan: f32) {
        self.pan.store(pan.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    pub fn is_muted(&self) -> bool {
        self.mute.load(Ordering::Relaxed)
    }

    pub fn set_muted(&self, muted: bool) {
        self.mute.store(muted, Ordering::Relaxed);
    }

    pub fn is_solo(&self) -> bool {
        self.solo.load(Ordering::Relaxed)
    }

    pub fn set_solo(&self, solo: bool) {
        self.solo.store(solo, Ordering::Relaxed);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Relaxed)
    }

    pub fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::Relaxed);
    }

    pub fn name(&self) -> String {
        self.name.lock().unwrap().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.lock().unwrap() = name.into();
    }

    pub fn is_internal(&self) -> bool {
        self.kind.is_internal()
    }

    /// `isActive`: internal buses are always active; a SAMPLE channel is
    /// active when it has a wave assigned (status isn't EMPTY/MISSING).
    pub fn is_active(&self) -> bool {
        self.is_internal()
            || !matches!(self.status(), ChannelStatus::Empty | ChannelStatus::Missing)
    }

    /// Forces this channel's status to `Off`. Used by [`crate::sequencer::Sequencer::stop`]
    /// to honour "stop on sequencer halt" outside the normal event-driven
    /// transition table.
    pub fn force_off(&self) {
        self.status.store_rt(ChannelStatus::Off);
    }
}

/// The parts of a channel only the audio thread ever touches: the sample
/// player's transient flags, its MIDI-in scratch buffer and its render
/// scratch. Held behind an `UnsafeCell` because `Channel` itself lives
/// inside an `Arc` shared with the RCU snapshot mechanism — readers on
/// other threads only ever see `ChannelState`'s atomics, never this.
struct ChannelAudioState {
    player: Option<SamplePlayer>,
    midi: MidiReceiver,
    scratch: AudioBuffer,
}

/// A single mixer channel: its lock-free state, plus (for SAMPLE channels)
/// the sample-playback state machine and MIDI-in receiver.
pub struct Channel {
    state: ChannelState,
    wave_id: Option<crate::types::WaveId>,
    player_state: Option<SamplePlayerState>,
    audio: UnsafeCell<ChannelAudioState>,
}

// SAFETY: `audio` is mutated exclusively by the single real-time audio
// thread inside `parse`/`render`, one channel at a time, driven from an
// RCU snapshot that guarantees the allocation outlives the block. No other
// thread ever calls `parse`/`render` or otherwise reaches into `audio`.
unsafe impl Sync for Channel {}

impl Channel {
    pub fn new(id: ChannelId, kind: ChannelKind, column_id: ChannelId, block_frames: usize, out_channels: usize) -> Self {
        let (player_state, player) = if kind == ChannelKind::Sample {
            (
                Some(SamplePlayerState::new(0, 0, SamplePlayerMode::LoopBasic)),
                Some(SamplePlayer::new(block_frames)),
            )
        } else {
            (None, None)
        };
        Self {
            state: ChannelState::new(id, kind, column_id),
            wave_id: None,
            player_state,
            audio: UnsafeCell::new(ChannelAudioState {
                player,
                midi: MidiReceiver::new(),
                scratch: AudioBuffer::new(block_frames, out_channels),
            }),
        }
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    /// # Safety
    /// Caller must be the audio thread and must not call this re-entrantly
    /// or hold the result across another call to `parse`/`render` on the
    /// same channel.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    unsafe fn audio_mut(&self) -> &mut ChannelAudioState {
        &mut *self.audio.get()
    }

    pub fn wave_id(&self) -> Option<crate::types::WaveId> {
        self.wave_id
    }

    /// Assigns a new wave and resets playback range. Only ever called on a
    /// freshly constructed `Channel` before it is published into the RCU
    /// list (`MixerHandler::load_wave` builds the replacement this way
    /// rather than mutating a live, shared channel in place).
    pub fn assign_wave(&mut self, wave: &Wave) {
        self.wave_id = Some(wave.id());
        if let Some(state) = &self.player_state {
            state.set_range(0, wave.size().max(1));
            self.state.status.store_rt(ChannelStatus::Off);
        }
        let audio = self.audio.get_mut();
        if let Some(player) = &mut audio.player {
            player.ensure_capacity(audio.scratch.frames());
        }
    }

    pub fn clear_wave(&mut self) {
        self.wave_id = None;
        if self.player_state.is_some() {
            self.state.status.store_rt(ChannelStatus::Empty);
        }
    }

    pub fn player_state(&self) -> Option<&SamplePlayerState> {
        self.player_state.as_ref()
    }

    pub fn ensure_block_size(&mut self, block_frames: usize, out_channels: usize) {
        let audio = self.audio.get_mut();
        audio.scratch.resize(block_frames, out_channels);
        if let Some(player) = &mut audio.player {
            player.ensure_capacity(block_frames);
        }
    }

    /// Dispatches every event targeting this channel to its sample player
    /// and MIDI receiver. Audio-thread only.
    pub fn parse(&self, events: &[Event], clock: &Clock) {
        // SAFETY: see `audio_mut`; the mixer calls this once per channel,
        // sequentially, from the audio thread only.
        let audio = unsafe { self.audio_mut() };
        let Some(player) = &mut audio.player else {
            return;
        };
        let Some(state) = &self.player_state else {
            return;
        };
        for event in events {
            if !event.targets(self.state.id) {
                continue;
            }
            if let Some(midi) = event.midi {
                audio.midi.parse(midi);
            }
            player.handle_event(event, &self.state.status, state, clock, &mut audio.scratch);
        }
    }

    /// Renders this channel's scratch buffer and mixes it into `out` when
    /// appropriate. `audible` is false while another channel is soloed and
    /// this one isn't. Audio-thread only.
    pub fn render(&self, wave: Option<&Wave>, out: &mut AudioBuffer, audible: bool) {
        // SAFETY: see `audio_mut`.
        let audio = unsafe { self.audio_mut() };
        if let (Some(player), Some(state)) = (&mut audio.player, &self.player_state) {
            player.render(wave, &self.state.status, state, &mut audio.scratch);
        } else {
            audio.scratch.clear();
        }

        if self.state.is_internal() {
            out.mix_from(&audio.scratch, 1.0);
            return;
        }

        if !self.state.is_muted() && audible {
            out.mix_from(&audio.scratch, self.state.volume());
        }
    }

    pub fn scratch(&self) -> &AudioBuffer {
        // SAFETY: shared access to the scratch buffer only, used by tests
        // and UI-side metering between blocks; never overlaps a live
        // `parse`/`render` call in practice since those run on the audio
        // thread exclusively.
        unsafe { &(*self.audio.get()).scratch }
    }
}

impl crate::rcu::Identified for Channel {
    type Id = ChannelId;

    fn id(&self) -> ChannelId {
        self.state.id
    }
}

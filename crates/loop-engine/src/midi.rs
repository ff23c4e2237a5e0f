//! Per-channel MIDI input: a bounded note buffer, a channel filter and an
//! optional "learn" mode that captures the next incoming note/CC as a
//! binding instead of playing it.

use crate::events::MidiData;

const MAX_PENDING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiLearnState {
    Idle,
    Listening,
    Bound(u8, u8), // (status, note/cc)
}

/// Holds the MIDI-in state for one channel: whether it reacts to MIDI at
/// all, which hardware MIDI channel (0-15) it listens on, and a bounded
/// scratch buffer for messages parsed this block.
pub struct MidiReceiver {
    enabled: bool,
    midi_channel: Option<u8>,
    pending: Vec<MidiData>,
    learn: MidiLearnState,
}

impl MidiReceiver {
    pub fn new() -> Self {
        Self {
            enabled: false,
            midi_channel: None,
            pending: Vec::with_capacity(MAX_PENDING),
            learn: MidiLearnState::Idle,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_midi_channel(&mut self, channel: Option<u8>) {
        self.midi_channel = channel;
    }

    pub fn begin_learn(&mut self) {
        self.learn = MidiLearnState::Listening;
    }

    pub fn learned(&self) -> MidiLearnState {
        self.learn
    }

    fn accepts(&self, midi: &MidiData) -> bool {
        if !self.enabled {
            return false;
        }
        match self.midi_channel {
            Some(channel) => (midi.status & 0x0F) == channel,
            None => true,
        }
    }

    /// Feeds one raw MIDI message. If this receiver is in learn mode, the
    /// message is captured as a binding and swallowed rather than queued.
    /// Otherwise the message is normalised to channel 0 before being
    /// appended to the buffer.
    pub fn parse(&mut self, midi: MidiData) {
        if self.learn == MidiLearnState::Listening {
            self.learn = MidiLearnState::Bound(midi.status, midi.note);
            return;
        }
        if !self.accepts(&midi) {
            return;
        }
        if self.pending.len() >= MAX_PENDING {
            log::warn!("midi receiver buffer full, dropping message");
            return;
        }
        self.pending.push(MidiData {
            status: midi.status & 0xF0,
            ..midi
        });
    }

    pub fn drain(&mut self) -> Vec<MidiData> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for MidiReceiver {
    fn default() -> Self {
        Self::new()
    }
}

//! User-thread orchestration of channel lifecycle: add, load a wave,
//! clone, delete. Every operation here mutates the RCU lists under their
//! own writer lock and is safe to call from the UI thread; callers must
//! serialize concurrent calls themselves (§4.10: "externally sequenced").

use std::sync::Arc;

use crate::channel::{Channel, ChannelKind};
use crate::error::CommandError;
use crate::mixer::Mixer;
use crate::types::{ChannelId, WaveId, FIRST_USER_ID, MASTER_IN_ID, MASTER_OUT_ID, PREVIEW_ID};
use crate::wave::Wave;

/// The channel type a caller requests when adding a channel; distinct from
/// [`ChannelKind`] because callers never get to request MASTER/PREVIEW —
/// those ids are reserved and created once at engine startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Sample,
    Midi,
}

impl From<ChannelType> for ChannelKind {
    fn from(value: ChannelType) -> Self {
        match value {
            ChannelType::Sample => ChannelKind::Sample,
            ChannelType::Midi => ChannelKind::Midi,
        }
    }
}

/// Thin façade over [`Mixer`]'s RCU lists providing the four lifecycle
/// commands a UI issues. Holds no state of its own beyond a monotonic id
/// counter for freshly created channels.
pub struct MixerHandler {
    next_id: ChannelId,
}

impl MixerHandler {
    pub fn new() -> Self {
        Self {
            next_id: FIRST_USER_ID,
        }
    }

    fn allocate_id(&mut self) -> ChannelId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Creates the three reserved internal channels. Called once at engine
    /// startup; panics if called twice since reserved ids would collide
    /// (a programmer error, not a runtime condition).
    pub fn install_reserved_channels(&self, mixer: &Mixer, block_frames: usize, out_channels: usize) {
        mixer.channels.push(Channel::new(MASTER_OUT_ID, ChannelKind::Master, MASTER_OUT_ID, block_frames, out_channels));
        mixer.channels.push(Channel::new(MASTER_IN_ID, ChannelKind::Master, MASTER_IN_ID, block_frames, out_channels));
        mixer.channels.push(Channel::new(PREVIEW_ID, ChannelKind::Preview, PREVIEW_ID, block_frames, out_channels));
    }

    /// Adds a new channel of the requested type, returning its freshly
    /// allocated id. Fails per §7's `ResamplerInit` if the device block
    /// shape is degenerate (a zero-frame or zero-channel resampler scratch
    /// buffer could never be filled).
    pub fn add_channel(
        &mut self,
        mixer: &Mixer,
        kind: ChannelType,
        column_id: ChannelId,
        block_frames: usize,
        out_channels: usize,
    ) -> Result<ChannelId, CommandError> {
        let id = self.allocate_id();
        if block_frames == 0 || out_channels == 0 {
            return Err(CommandError::ResamplerInit(id));
        }
        mixer
            .channels
            .push(Channel::new(id, kind.into(), column_id, block_frames, out_channels));
        Ok(id)
    }

    /// Loads `wave` into `channel_id`: pushes the wave into the wave RCU
    /// list, builds a replacement channel referencing it, atomically swaps
    /// it into the channel list, then pops the previously referenced wave
    /// (if any and if nothing else references it).
    pub fn load_wave(
        &self,
        mixer: &Mixer,
        channel_id: ChannelId,
        wave: Wave,
        block_frames: usize,
        out_channels: usize,
    ) -> Result<(), CommandError> {
        if channel_id == MASTER_OUT_ID || channel_id == MASTER_IN_ID || channel_id == PREVIEW_ID {
            return Err(CommandError::ReservedId(channel_id));
        }
        if block_frames == 0 || out_channels == 0 {
            return Err(CommandError::ResamplerInit(channel_id));
        }
        let old = mixer
            .channels
            .get(channel_id)
            .ok_or(CommandError::ChannelNotFound(channel_id))?;
        let old_wave_id = old.wave_id();

        let wave_id = wave.id();
        mixer.waves.push(wave);
        let loaded_wave = mixer.waves.get(wave_id).ok_or(CommandError::WaveNotFound(wave_id))?;

        let mut replacement = Channel::new(channel_id, old.state().kind(), old.state().column_id(), block_frames, out_channels);
        replacement.assign_wave(&loaded_wave);
        replacement.state().set_volume(old.state().volume());
        replacement.state().set_pan_unit(old.state().pan_unit());
        replacement.state().set_muted(old.state().is_muted());
        replacement.state().set_solo(old.state().is_solo());
        replacement.state().set_name(old.state().name());

        mixer.channels.replace(channel_id, Arc::new(replacement));

        if let Some(old_wave_id) = old_wave_id {
            self.pop_wave_if_unreferenced(mixer, old_wave_id);
        }
        Ok(())
    }

    fn pop_wave_if_unreferenced(&self, mixer: &Mixer, wave_id: WaveId) {
        let still_referenced = mixer
            .channels
            .snapshot()
            .iter()
            .any(|channel| channel.wave_id() == Some(wave_id));
        if !still_referenced {
            mixer.waves.pop(wave_id);
        }
    }

    /// Deep-copies a channel's configuration into a newly allocated id.
    /// The clone shares no storage with the original beyond the wave it
    /// references (waves are immutable, so sharing is safe).
    pub fn clone_channel(&mut self, mixer: &Mixer, channel_id: ChannelId, block_frames: usize, out_channels: usize) -> Result<ChannelId, CommandError> {
        let original = mixer
            .channels
            .get(channel_id)
            .ok_or(CommandError::ChannelNotFound(channel_id))?;
        let new_id = self.allocate_id();
        if block_frames == 0 || out_channels == 0 {
            return Err(CommandError::ResamplerInit(new_id));
        }
        let mut clone = Channel::new(new_id, original.state().kind(), original.state().column_id(), block_frames, out_channels);
        if let Some(wave_id) = original.wave_id() {
            if let Some(wave) = mixer.waves.get(wave_id) {
                clone.assign_wave(&wave);
            }
        }
        clone.state().set_volume(original.state().volume());
        clone.state().set_pan_unit(original.state().pan_unit());
        clone.state().set_muted(original.state().is_muted());
        clone.state().set_solo(original.state().is_solo());
        clone.state().set_name(original.state().name());
        mixer.channels.push(clone);
        Ok(new_id)
    }

    /// Removes a channel and, if nothing else references its wave, the
    /// wave too.
    pub fn delete_channel(&self, mixer: &Mixer, channel_id: ChannelId) -> Result<(), CommandError> {
        if channel_id == MASTER_OUT_ID || channel_id == MASTER_IN_ID || channel_id == PREVIEW_ID {
            return Err(CommandError::ReservedId(channel_id));
        }
        let removed = mixer
            .channels
            .pop(channel_id)
            .ok_or(CommandError::ChannelNotFound(channel_id))?;
        if let Some(wave_id) = removed.wave_id() {
            self.pop_wave_if_unreferenced(mixer, wave_id);
        }
        Ok(())
    }
}

impl Default for MixerHandler {
    fn default() -> Self {
        Self::new()
    }
}

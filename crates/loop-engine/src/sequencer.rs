//! Transport control: start/stop/rewind, and the quantized-rewind
//! deferral consumed by the mixer on the next subdivision boundary.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::clock::{Clock, TransportStatus};
use crate::mixer::Mixer;

/// Owns no state beyond the quantized-rewind flag; everything else lives
/// on [`Clock`] and the channel RCU list, which this type only
/// orchestrates.
pub struct Sequencer {
    rewind_wait: AtomicBool,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            rewind_wait: AtomicBool::new(false),
        }
    }

    pub fn start(&self, clock: &Clock) {
        match clock.status() {
            TransportStatus::Stopped | TransportStatus::Waiting => {
                clock.set_status(TransportStatus::Running);
            }
            TransportStatus::Running => {}
        }
    }

    /// Stops the transport and, for every non-internal channel, resets it
    /// back to `Off` the way a `KILL` would (honouring "stop on sequencer
    /// halt").
    pub fn stop(&self, mixer: &Mixer) {
        mixer.clock.set_status(TransportStatus::Stopped);
        for channel in mixer.channels.snapshot().iter() {
            if channel.state().is_internal() {
                continue;
            }
            if channel.player_state().is_some() {
                channel.state().force_off();
            }
        }
    }

    pub fn toggle(&self, mixer: &Mixer) {
        if mixer.clock.status() == TransportStatus::Running {
            self.stop(mixer);
        } else {
            self.start(&mixer.clock);
        }
    }

    /// Rewinds the transport to frame 0. If quantizing is active and the
    /// transport is running, defers until the mixer observes the next
    /// subdivision boundary (`take_pending_rewind`); otherwise rewinds
    /// immediately.
    pub fn rewind(&self, mixer: &Mixer) {
        if mixer.clock.can_quantize() {
            self.rewind_wait.store(true, Ordering::Relaxed);
        } else {
            self.rewind_now(mixer);
        }
    }

    fn rewind_now(&self, mixer: &Mixer) {
        mixer.clock.set_current_frame(0);
        self.rewind_channels(mixer);
    }

    /// Called by the mixer once per block after a `quanto_has_passed` tick
    /// if a rewind is pending.
    pub fn take_pending_rewind(&self, mixer: &Mixer) {
        if self.rewind_wait.swap(false, Ordering::Relaxed) {
            self.rewind_now(mixer);
        }
    }

    fn rewind_channels(&self, mixer: &Mixer) {
        for channel in mixer.channels.snapshot().iter() {
            if channel.state().is_internal() {
                continue;
            }
            if let Some(state) = channel.player_state() {
                state.reset_tracker();
            }
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::events::event_queue;
    use loop_rt::QueueLane;

    fn make_mixer() -> Mixer {
        let cfg = EngineConfig::default();
        let (_ui_tx, ui_rx) = event_queue(cfg.event_queue_capacity, QueueLane::Ui);
        let (_midi_tx, midi_rx) = event_queue(cfg.event_queue_capacity, QueueLane::Midi);
        Mixer::new(&cfg, ui_rx, midi_rx)
    }

    #[test]
    fn start_stop_toggle_transport_status() {
        let mixer = make_mixer();
        let seq = Sequencer::new();
        assert_eq!(mixer.clock.status(), TransportStatus::Stopped);
        seq.start(&mixer.clock);
        assert_eq!(mixer.clock.status(), TransportStatus::Running);
        seq.toggle(&mixer);
        assert_eq!(mixer.clock.status(), TransportStatus::Stopped);
    }

    #[test]
    fn rewind_defers_while_quantizing_and_running() {
        let mixer = make_mixer();
        let seq = Sequencer::new();
        seq.start(&mixer.clock);
        mixer.clock.set_current_frame(500);

        seq.rewind(&mixer);
        assert_eq!(mixer.clock.current_frame(), 500);

        seq.take_pending_rewind(&mixer);
        assert_eq!(mixer.clock.current_frame(), 0);
    }

    #[test]
    fn rewind_is_immediate_when_not_quantizing() {
        let mixer = make_mixer();
        mixer.clock.set_quantize(0);
        mixer.clock.set_current_frame(500);
        let seq = Sequencer::new();
        seq.rewind(&mixer);
        assert_eq!(mixer.clock.current_frame(), 0);
    }
}

//! Top-level handle tying the mixer, sequencer and handler together, and
//! owning the producer half of both event queues for callers on the UI
//! and MIDI threads.

use crate::config::EngineConfig;
use crate::events::{event_queue, Event, EventProducer};
use crate::handler::MixerHandler;
use crate::mixer::Mixer;
use crate::sequencer::Sequencer;
use loop_rt::QueueLane;

/// Owns everything needed to run the audio core: the realtime-facing
/// [`Mixer`], the non-realtime [`MixerHandler`] and [`Sequencer`]
/// orchestrators, and the producing ends of the two event queues.
pub struct Engine {
    pub mixer: Mixer,
    pub handler: MixerHandler,
    pub sequencer: Sequencer,
    ui_tx: EventProducer,
    midi_tx: EventProducer,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let (ui_tx, ui_rx) = event_queue(config.event_queue_capacity, QueueLane::Ui);
        let (midi_tx, midi_rx) = event_queue(config.event_queue_capacity, QueueLane::Midi);
        let mixer = Mixer::new(&config, ui_rx, midi_rx);
        let handler = MixerHandler::new();
        handler.install_reserved_channels(&mixer, config.block_size, config.out_channels);

        Self {
            mixer,
            handler,
            sequencer: Sequencer::new(),
            ui_tx,
            midi_tx,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Enqueues a UI-originated event (press/release/kill from keyboard or
    /// on-screen grid). Returns `false` if the queue is full.
    pub fn push_ui_event(&mut self, event: Event) -> bool {
        self.ui_tx.push(event)
    }

    /// Enqueues a MIDI-originated event. Returns `false` if the queue is
    /// full.
    pub fn push_midi_event(&mut self, event: Event) -> bool {
        self.midi_tx.push(event)
    }

    /// The realtime entry point. Delegates straight to the mixer; kept on
    /// `Engine` so the audio driver only needs to hold one handle.
    pub fn process(&mut self, input: &crate::buffer::AudioBuffer, out: &mut crate::buffer::AudioBuffer) {
        self.mixer.process(input, out, &self.sequencer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::AudioBuffer;
    use crate::events::Event;
    use crate::types::FIRST_USER_ID;

    #[test]
    fn reserved_channels_exist_after_construction() {
        let engine = Engine::new(EngineConfig::default());
        assert_eq!(engine.mixer.channels.len(), 3);
    }

    #[test]
    fn process_runs_without_channels_registered() {
        let mut engine = Engine::new(EngineConfig::default());
        let input = AudioBuffer::new(engine.config().block_size, engine.config().out_channels);
        let mut out = AudioBuffer::new(engine.config().block_size, engine.config().out_channels);
        engine.process(&input, &mut out);
        assert!(out.as_slice().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn full_ui_queue_reports_drop() {
        let mut engine = Engine::new(EngineConfig {
            event_queue_capacity: 2,
            ..Default::default()
        });
        assert!(engine.push_ui_event(Event::press(FIRST_USER_ID, 0)));
        assert!(engine.push_ui_event(Event::press(FIRST_USER_ID, 0)));
        assert!(!engine.push_ui_event(Event::press(FIRST_USER_ID, 0)));
    }
}

//! The real-time audio core of a live loop-machine: the lock-free event
//! pipeline, per-channel sample-playback state machines, and the
//! clock/mixer/sequencer transport layer that ties them together under a
//! realtime callback.
//!
//! The audio thread only ever touches [`mixer::Mixer::process`]; every
//! other entry point ([`handler::MixerHandler`], [`sequencer::Sequencer`],
//! [`engine::Engine`]'s event producers) is safe to call from the UI or
//! MIDI thread and serializes itself against the audio thread through the
//! RCU lists and lock-free atomics in [`types`] and [`sample_player`].

pub mod buffer;
pub mod channel;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod handler;
pub mod midi;
pub mod mixer;
pub mod rcu;
pub mod sample_player;
pub mod sequencer;
pub mod types;
pub mod wave;
pub mod wave_reader;

pub use engine::Engine;
pub use error::{BufferError, CommandError, WaveLoadError};

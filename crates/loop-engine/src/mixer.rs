//! The audio callback: drains both event queues, advances the clock, asks
//! every live channel to parse events and render, then assembles the
//! output block.

use std::sync::atomic::{AtomicBool, Ordering};

use atomic_float::AtomicF32;

use crate::buffer::AudioBuffer;
use crate::channel::Channel;
use crate::clock::{Clock, TransportStatus};
use crate::config::EngineConfig;
use crate::events::{Event, EventConsumer};
use crate::rcu::{Identified, RcuList};
use crate::sequencer::Sequencer;
use crate::types::{ChannelId, MASTER_IN_ID, MASTER_OUT_ID};
use crate::wave::Wave;

/// Shared, lock-free mixer-wide settings the UI can poke between blocks.
pub struct MixerSettings {
    pub master_volume: AtomicF32,
    pub input_volume: AtomicF32,
    pub limiter_enabled: AtomicBool,
    pub monitor_input: AtomicBool,
    pub record_input: AtomicBool,
    pub peak_out: AtomicF32,
    pub peak_in: AtomicF32,
    /// Linear equivalent of the armed signal threshold, converted once at
    /// arm time so the audio thread never calls `powf` per block.
    threshold_linear: AtomicF32,
    threshold_armed: AtomicBool,
    /// Latched until the UI calls `take_threshold_fired`.
    threshold_fired: AtomicBool,
}

impl MixerSettings {
    fn new() -> Self {
        Self {
            master_volume: AtomicF32::new(1.0),
            input_volume: AtomicF32::new(1.0),
            limiter_enabled: AtomicBool::new(true),
            monitor_input: AtomicBool::new(false),
            record_input: AtomicBool::new(false),
            peak_out: AtomicF32::new(0.0),
            peak_in: AtomicF32::new(0.0),
            threshold_linear: AtomicF32::new(1.0),
            threshold_armed: AtomicBool::new(false),
            threshold_fired: AtomicBool::new(false),
        }
    }

    /// Arms the input-peak threshold callback: the next block whose input
    /// peak reaches `db` disarms it and latches `threshold_fired`. User
    /// thread only.
    pub fn arm_threshold(&self, db: f32) {
        self.threshold_linear
            .store(loop_dsp::gain::db_to_linear(db), Ordering::Relaxed);
        self.threshold_fired.store(false, Ordering::Relaxed);
        self.threshold_armed.store(true, Ordering::Relaxed);
    }

    /// Consumes the latched fired flag, returning whether it had tripped
    /// since it was last armed or checked.
    pub fn take_threshold_fired(&self) -> bool {
        self.threshold_fired.swap(false, Ordering::Relaxed)
    }
}

/// Owns the channel/wave RCU lists, the clock, both event queues and the
/// scratch buffers the audio callback needs. One `Mixer` per engine.
pub struct Mixer {
    pub channels: RcuList<Channel>,
    pub waves: RcuList<Wave>,
    pub clock: Clock,
    pub settings: MixerSettings,
    ui_events: EventConsumer,
    midi_events: EventConsumer,
    event_buf: Vec<Event>,
    in_to_out: AudioBuffer,
    virtual_input: AudioBuffer,
    block_size: usize,
    out_channels: usize,
}

impl Mixer {
    pub fn new(
        cfg: &EngineConfig,
        ui_events: EventConsumer,
        midi_events: EventConsumer,
    ) -> Self {
        let clock = Clock::new(
            cfg.sample_rate,
            cfg.initial_bpm,
            cfg.beats_per_bar,
            cfg.bars,
            cfg.quantize,
        );
        let loop_frames = clock.frames_in_loop().max(1) as usize;
        Self {
            channels: RcuList::new(),
            waves: RcuList::new(),
            clock,
            settings: MixerSettings::new(),
            ui_events,
            midi_events,
            event_buf: Vec::with_capacity(64),
            in_to_out: AudioBuffer::new(cfg.block_size, cfg.out_channels),
            virtual_input: AudioBuffer::new(loop_frames, cfg.out_channels),
            block_size: cfg.block_size,
            out_channels: cfg.out_channels,
        }
    }

    fn process_line_in(&mut self, input: &AudioBuffer) -> f32 {
        let mut peak = 0.0f32;
        for sample in input.as_slice() {
            peak = peak.max(sample.abs());
        }
        self.settings.peak_in.store(peak, Ordering::Relaxed);

        if self.settings.threshold_armed.load(Ordering::Relaxed)
            && peak >= self.settings.threshold_linear.load(Ordering::Relaxed)
        {
            self.settings.threshold_armed.store(false, Ordering::Relaxed);
            self.settings.threshold_fired.store(true, Ordering::Relaxed);
        }

        self.in_to_out.clear();
        if self.settings.monitor_input.load(Ordering::Relaxed) {
            let input_volume = self.settings.input_volume.load(Ordering::Relaxed);
            self.in_to_out.mix_from(input, input_volume);
        }
        peak
    }

    fn parse_events(&mut self) {
        self.event_buf.clear();
        self.ui_events.drain_into(&mut self.event_buf);
        self.midi_events.drain_into(&mut self.event_buf);
        if self.event_buf.is_empty() {
            return;
        }

        let snapshot = self.channels.snapshot();
        for channel in snapshot.iter() {
            channel.parse(&self.event_buf, &self.clock);
        }
    }

    /// Advances the clock one frame at a time and, per §4.3, turns the
    /// musical boundaries it crosses into broadcast `OnBar`/`OnFirstBeat`
    /// events delivered to every channel at the frame they actually land
    /// on, and consumes any sequencer rewind pending a quanto boundary.
    fn advance_transport(&mut self, nframes: usize, sequencer: &Sequencer) {
        if self.clock.status() != TransportStatus::Running {
            return;
        }
        let snapshot = self.channels.snapshot();
        for local_frame in 0..nframes {
            let tick = self.clock.tick();
            // Metronome sample synthesis and MIDI clock sync are driven by
            // the plug-in host collaborator (§6), out of this core's scope.
            if tick.is_on_bar {
                let event = Event::on_bar(local_frame as crate::types::Frame);
                for channel in snapshot.iter() {
                    channel.parse(std::slice::from_ref(&event), &self.clock);
                }
            }
            if tick.is_on_first_beat {
                let event = Event::on_first_beat(local_frame as crate::types::Frame);
                for channel in snapshot.iter() {
                    channel.parse(std::slice::from_ref(&event), &self.clock);
                }
            }
            if tick.quanto_has_passed {
                sequencer.take_pending_rewind(&*self);
            }
        }
    }

    fn line_in_rec(&mut self, input: &AudioBuffer) {
        if !self.settings.record_input.load(Ordering::Relaxed) {
            return;
        }
        if self.virtual_input.is_empty() {
            return;
        }
        let loop_frames = self.virtual_input.frames() as i64;
        let start = (self.clock.current_frame() % loop_frames) as usize;
        let input_volume = self.settings.input_volume.load(Ordering::Relaxed);

        // Overdub: accumulate into the virtual input buffer, wrapping at
        // the loop boundary when the input block crosses it.
        for i in 0..input.frames() {
            let dst_index = (start + i) % self.virtual_input.frames();
            if let (Ok(src), Ok(dst)) = (input.frame(i), self.virtual_input.frame(dst_index)) {
                let mixed: Vec<f32> = dst
                    .iter()
                    .zip(src.iter())
                    .map(|(d, s)| d + s * input_volume)
                    .collect();
                let _ = self.virtual_input.copy_frame(dst_index, &mixed);
            }
        }
    }

    fn has_solos(&self, snapshot: &crate::rcu::Snapshot<Channel>) -> bool {
        snapshot.iter().any(|c| c.state().is_solo())
    }

    fn render_channels(&mut self, out: &mut AudioBuffer) {
        let snapshot = self.channels.snapshot();
        let has_solos = self.has_solos(&snapshot);

        let waves = self.waves.snapshot();
        let lookup = |id: ChannelId| -> Option<std::sync::Arc<Wave>> {
            snapshot
                .iter()
                .find(|c| c.id() == id)
                .and_then(|c| c.wave_id())
                .and_then(|wid| waves.iter().find(|w| w.id() == wid).cloned())
        };

        for channel in snapshot.iter() {
            if channel.id() == MASTER_IN_ID || channel.id() == MASTER_OUT_ID {
                continue;
            }
            let audible = !has_solos || channel.state().is_solo();
            let wave = lookup(channel.id());
            channel.render(wave.as_deref(), out, audible);
        }

        // MASTER_IN then MASTER_OUT, explicitly by id rather than RCU push
        // order: MASTER_OUT must be rendered last, after everything else
        // (including MASTER_IN) has accumulated into `out`.
        for id in [MASTER_IN_ID, MASTER_OUT_ID] {
            if let Some(channel) = snapshot.iter().find(|c| c.id() == id) {
                channel.render(None, out, true);
            }
        }
    }

    fn finalize_output(&mut self, out: &mut AudioBuffer) {
        out.mix_from(&self.in_to_out, 1.0);
        let master_volume = self.settings.master_volume.load(Ordering::Relaxed);
        for sample in out.as_mut_slice() {
            *sample *= master_volume;
        }
        if self.settings.limiter_enabled.load(Ordering::Relaxed) {
            for sample in out.as_mut_slice() {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }
        let peak = out.as_slice().iter().fold(0.0f32, |m, s| m.max(s.abs()));
        self.settings.peak_out.store(peak, Ordering::Relaxed);
    }

    /// The realtime entry point, called once per device block. Never
    /// allocates, never blocks, never returns an error: a degraded path
    /// (no channels, disabled engine) simply produces zeroed output.
    pub fn process(&mut self, input: &AudioBuffer, out: &mut AudioBuffer, sequencer: &Sequencer) {
        out.clear();
        if out.channels() != self.out_channels || out.frames() > self.block_size {
            let event = loop_rt::RtEvent::DeviceError;
            log::warn!("mixer block shape mismatch (rt_event={}), closing stream", event.kind_id());
            self.clock.set_status(TransportStatus::Stopped);
            return;
        }

        self.process_line_in(input);
        self.parse_events();
        self.advance_transport(out.frames(), sequencer);
        self.line_in_rec(input);
        self.render_channels(out);
        self.finalize_output(out);
    }
}

//! Musical transport: converts bpm/meter into frame counts at the device
//! sample rate and advances one frame at a time, reporting the musical
//! boundaries the mixer turns into `OnBar`/`OnFirstBeat` events.

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU8, Ordering};

use crate::types::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Stopped,
    Waiting,
    Running,
}

impl TransportStatus {
    fn to_u8(self) -> u8 {
        match self {
            TransportStatus::Stopped => 0,
            TransportStatus::Waiting => 1,
            TransportStatus::Running => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => TransportStatus::Waiting,
            2 => TransportStatus::Running,
            _ => TransportStatus::Stopped,
        }
    }
}

/// Boundaries crossed by advancing the clock by one frame, reported so the
/// mixer can turn them into broadcast events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInfo {
    pub is_on_bar: bool,
    pub is_on_beat: bool,
    pub is_on_first_beat: bool,
    pub quanto_has_passed: bool,
}

pub struct Clock {
    sample_rate: AtomicU32,
    bpm: AtomicU32, // bpm * 100, integral storage for lock-free atomics
    beats_per_bar: AtomicU32,
    /// Subdivisions per beat used for press quantization; `0` disables
    /// quantizing entirely.
    quantize: AtomicU32,

    frames_in_beat: AtomicI64,
    frames_in_bar: AtomicI64,
    /// Wrap modulus for `current_frame`; one full loop region.
    frames_in_loop: AtomicI64,
    /// Length of the overall sequence; distinct from `frames_in_loop` only
    /// when a future arrangement view spans multiple loop regions. Today
    /// the two coincide (see DESIGN.md open-question record).
    frames_in_seq: AtomicI64,
    frames_in_quanto: AtomicI64,

    current_frame: AtomicI64,
    status: AtomicU8,
}

impl Clock {
    pub fn new(sample_rate: u32, bpm: f32, beats_per_bar: u32, bars: u32, quantize: u32) -> Self {
        let clock = Self {
            sample_rate: AtomicU32::new(sample_rate),
            bpm: AtomicU32::new((bpm * 100.0).round() as u32),
            beats_per_bar: AtomicU32::new(beats_per_bar.max(1)),
            quantize: AtomicU32::new(quantize),
            frames_in_beat: AtomicI64::new(0),
            frames_in_bar: AtomicI64::new(0),
            frames_in_loop: AtomicI64::new(0),
            frames_in_seq: AtomicI64::new(0),
            frames_in_quanto: AtomicI64::new(0),
            current_frame: AtomicI64::new(0),
            status: AtomicU8::new(TransportStatus::Stopped.to_u8()),
        };
        clock.recompute(bars);
        clock
    }

    fn recompute(&self, bars: u32) {
        let sample_rate = self.sample_rate.load(Ordering::Relaxed) as f64;
        let bpm = self.bpm.load(Ordering::Relaxed) as f64 / 100.0;
        let beats_per_bar = self.beats_per_bar.load(Ordering::Relaxed) as f64;
        let quantize = self.quantize.load(Ordering::Relaxed).max(1) as f64;

        let frames_in_beat = ((60.0 / bpm.max(1.0)) * sample_rate).round() as i64;
        let frames_in_bar = frames_in_beat * beats_per_bar as i64;
        let frames_in_loop = frames_in_bar * bars.max(1) as i64;
        let frames_in_quanto = (frames_in_beat as f64 / quantize).round().max(1.0) as i64;

        self.frames_in_beat.store(frames_in_beat, Ordering::Release);
        self.frames_in_bar.store(frames_in_bar, Ordering::Release);
        self.frames_in_loop.store(frames_in_loop, Ordering::Release);
        self.frames_in_seq.store(frames_in_loop, Ordering::Release);
        self.frames_in_quanto
            .store(frames_in_quanto, Ordering::Release);
    }

    /// Recomputes derived frame counts after a tempo or meter change.
    /// User-thread only.
    pub fn set_tempo(&self, bpm: f32, beats_per_bar: u32, bars: u32) {
        self.bpm.store((bpm * 100.0).round() as u32, Ordering::Relaxed);
        self.beats_per_bar
            .store(beats_per_bar.max(1), Ordering::Relaxed);
        self.recompute(bars);
    }

    pub fn set_quantize(&self, quantize: u32) {
        self.quantize.store(quantize, Ordering::Relaxed);
        self.recompute(self.bars());
    }

    pub fn set_sample_rate(&self, sample_rate: u32, bars: u32) {
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.recompute(bars);
    }

    fn bars(&self) -> u32 {
        let loop_len = self.frames_in_loop.load(Ordering::Relaxed);
        let bar_len = self.frames_in_bar.load(Ordering::Relaxed).max(1);
        (loop_len / bar_len).max(1) as u32
    }

    pub fn status(&self) -> TransportStatus {
        TransportStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: TransportStatus) {
        self.status.store(status.to_u8(), Ordering::Release);
    }

    pub fn current_frame(&self) -> Frame {
        self.current_frame.load(Ordering::Relaxed)
    }

    pub fn set_current_frame(&self, frame: Frame) {
        self.current_frame.store(frame, Ordering::Release);
    }

    pub fn frames_in_loop(&self) -> Frame {
        self.frames_in_loop.load(Ordering::Relaxed)
    }

    pub fn frames_in_bar(&self) -> Frame {
        self.frames_in_bar.load(Ordering::Relaxed)
    }

    pub fn frames_in_beat(&self) -> Frame {
        self.frames_in_beat.load(Ordering::Relaxed)
    }

    pub fn frames_in_seq(&self) -> Frame {
        self.frames_in_seq.load(Ordering::Relaxed)
    }

    /// Whether a quantized press issued right now would have somewhere to
    /// snap to: quantizing is only meaningful while the transport is
    /// running and a subdivision is configured.
    pub fn can_quantize(&self) -> bool {
        self.quantize.load(Ordering::Relaxed) > 0 && self.status() == TransportStatus::Running
    }

    /// Advances the clock by one frame, wrapping at `frames_in_loop`, and
    /// reports which musical boundaries were just crossed. Audio-thread
    /// only.
    pub fn tick(&self) -> TickInfo {
        let loop_len = self.frames_in_loop().max(1);
        let bar_len = self.frames_in_bar().max(1);
        let beat_len = self.frames_in_beat().max(1);
        let quanto_len = self.frames_in_quanto.load(Ordering::Relaxed).max(1);

        let previous = self.current_frame();
        let next = (previous + 1) % loop_len;
        self.set_current_frame(next);

        TickInfo {
            is_on_bar: next % bar_len == 0,
            is_on_beat: next % beat_len == 0,
            is_on_first_beat: next % bar_len == 0,
            quanto_has_passed: next % quanto_len == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_wraps_at_loop_boundary() {
        let clock = Clock::new(48_000, 120.0, 4, 1, 4);
        let loop_len = clock.frames_in_loop();
        clock.set_current_frame(loop_len - 1);
        let info = clock.tick();
        assert_eq!(clock.current_frame(), 0);
        assert!(info.is_on_bar);
        assert!(info.is_on_first_beat);
    }

    #[test]
    fn can_quantize_requires_running_and_subdivision() {
        let clock = Clock::new(48_000, 120.0, 4, 1, 4);
        assert!(!clock.can_quantize());
        clock.set_status(TransportStatus::Running);
        assert!(clock.can_quantize());
        clock.set_quantize(0);
        assert!(!clock.can_quantize());
    }

    #[test]
    fn tempo_change_recomputes_frame_counts() {
        let clock = Clock::new(48_000, 120.0, 4, 1, 4);
        let beat_120 = clock.frames_in_beat();
        clock.set_tempo(60.0, 4, 1);
        let beat_60 = clock.frames_in_beat();
        assert!(beat_60 > beat_120);
    }
}

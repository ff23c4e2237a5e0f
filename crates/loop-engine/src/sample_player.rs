//! The per-channel sample-playback state machine. Consumes `Press`/
//! `Release`/`Kill` and clock-derived `OnBar`/`OnFirstBeat` events and
//! decides when a channel starts, loops, rewinds or stops.

use std::sync::atomic::{AtomicU8, Ordering};

use atomic_float::AtomicF32;

use crate::buffer::AudioBuffer;
use crate::clock::Clock;
use crate::events::{Event, EventKind};
use crate::types::{AtomicChannelStatus, ChannelStatus, Frame};
use crate::wave::Wave;
use crate::wave_reader::WaveReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePlayerMode {
    LoopBasic,
    LoopOnce,
    LoopRepeat,
    LoopOnceBar,
    SingleBasic,
    SinglePress,
    SingleRetrig,
    SingleEndless,
}

impl SamplePlayerMode {
    fn to_u8(self) -> u8 {
        match self {
            SamplePlayerMode::LoopBasic => 0,
            SamplePlayerMode::LoopOnce => 1,
            SamplePlayerMode::LoopRepeat => 2,
            SamplePlayerMode::LoopOnceBar => 3,
            SamplePlayerMode::SingleBasic => 4,
            SamplePlayerMode::SinglePress => 5,
            SamplePlayerMode::SingleRetrig => 6,
            SamplePlayerMode::SingleEndless => 7,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SamplePlayerMode::LoopOnce,
            2 => SamplePlayerMode::LoopRepeat,
            3 => SamplePlayerMode::LoopOnceBar,
            4 => SamplePlayerMode::SingleBasic,
            5 => SamplePlayerMode::SinglePress,
            6 => SamplePlayerMode::SingleRetrig,
            7 => SamplePlayerMode::SingleEndless,
            _ => SamplePlayerMode::LoopBasic,
        }
    }

    /// Whether this mode loops (keeps rendering from `begin` after reaching
    /// `end`) rather than stopping.
    pub fn is_looping(self) -> bool {
        matches!(
            self,
            SamplePlayerMode::LoopBasic
                | SamplePlayerMode::LoopRepeat
                | SamplePlayerMode::SingleEndless
        )
    }

    /// Whether a fresh press on an `Off` channel arms (`Wait`) rather than
    /// playing immediately.
    pub fn arms_on_press(self) -> bool {
        matches!(
            self,
            SamplePlayerMode::LoopBasic
                | SamplePlayerMode::LoopOnce
                | SamplePlayerMode::LoopRepeat
                | SamplePlayerMode::LoopOnceBar
        )
    }
}

/// Shared, lock-free sample-playback parameters. Written from the UI thread
/// (begin/end/shift/pitch/mode) and read-and-advanced by the audio thread
/// (tracker).
#[derive(Debug)]
pub struct SamplePlayerState {
    tracker: std::sync::atomic::AtomicI64,
    begin: std::sync::atomic::AtomicI64,
    end: std::sync::atomic::AtomicI64,
    shift: std::sync::atomic::AtomicI64,
    pitch: AtomicF32,
    mode: AtomicU8,
}

impl SamplePlayerState {
    pub fn new(begin: Frame, end: Frame, mode: SamplePlayerMode) -> Self {
        Self {
            tracker: std::sync::atomic::AtomicI64::new(begin),
            begin: std::sync::atomic::AtomicI64::new(begin),
            end: std::sync::atomic::AtomicI64::new(end),
            shift: std::sync::atomic::AtomicI64::new(0),
            pitch: AtomicF32::new(1.0),
            mode: AtomicU8::new(mode.to_u8()),
        }
    }

    pub fn tracker(&self) -> Frame {
        self.tracker.load(Ordering::Relaxed)
    }

    fn set_tracker(&self, value: Frame) {
        self.tracker.store(value, Ordering::Release);
    }

    pub fn begin(&self) -> Frame {
        self.begin.load(Ordering::Relaxed)
    }

    pub fn end(&self) -> Frame {
        self.end.load(Ordering::Relaxed)
    }

    pub fn set_range(&self, begin: Frame, end: Frame) {
        debug_assert!(begin < end);
        self.begin.store(begin, Ordering::Relaxed);
        self.end.store(end, Ordering::Relaxed);
    }

    pub fn shift(&self) -> Frame {
        self.shift.load(Ordering::Relaxed)
    }

    pub fn set_shift(&self, shift: Frame) {
        self.shift.store(shift, Ordering::Relaxed);
    }

    pub fn pitch(&self) -> f32 {
        self.pitch.load(Ordering::Relaxed)
    }

    pub fn set_pitch(&self, pitch: f32) {
        self.pitch.store(pitch.clamp(0.01, 4.0), Ordering::Relaxed);
    }

    pub fn mode(&self) -> SamplePlayerMode {
        SamplePlayerMode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    pub fn set_mode(&self, mode: SamplePlayerMode) {
        self.mode.store(mode.to_u8(), Ordering::Relaxed);
    }

    /// Resets the tracker to `begin`. Used by the sequencer's `rewindChannels`
    /// under a channel-list snapshot, independent of the press/release
    /// transition table.
    pub fn reset_tracker(&self) {
        self.set_tracker(self.begin());
    }
}

/// Audio-thread-only half of a sample player: transient flags and the
/// per-instance wave reader. Never shared across threads.
pub struct SamplePlayer {
    reader: WaveReader,
    rewinding: bool,
    quantizing: bool,
    offset: Frame,
}

impl SamplePlayer {
    pub fn new(max_block_frames: usize) -> Self {
        Self {
            reader: WaveReader::new(max_block_frames),
            rewinding: false,
            quantizing: false,
            offset: 0,
        }
    }

    pub fn ensure_capacity(&mut self, max_block_frames: usize) {
        self.reader.ensure_capacity(max_block_frames);
    }

    pub fn is_quantizing(&self) -> bool {
        self.quantizing
    }

    fn rewind(&mut self, status: &AtomicChannelStatus, state: &SamplePlayerState, local_frame: Frame) {
        self.quantizing = false;
        if status.load_rt() == ChannelStatus::Play || status.load_rt() == ChannelStatus::Ending {
            self.rewinding = true;
            self.offset = local_frame;
        } else {
            state.set_tracker_begin(state.begin());
        }
    }

    fn kill(
        &mut self,
        status: &AtomicChannelStatus,
        state: &SamplePlayerState,
        scratch: &mut AudioBuffer,
        local_frame: Frame,
    ) {
        status.store_rt(ChannelStatus::Off);
        state.set_tracker_begin(state.begin());
        self.quantizing = false;
        self.reader.reset_phase();
        if local_frame > 0 {
            let _ = scratch.clear_range(local_frame as usize, scratch.frames());
        }
    }

    /// Dispatches one event already known to target this channel.
    pub fn handle_event(
        &mut self,
        event: &Event,
        status: &AtomicChannelStatus,
        state: &SamplePlayerState,
        clock: &Clock,
        scratch: &mut AudioBuffer,
    ) {
        let mode = state.mode();
        let current = status.load_rt();
        let local_frame = event.local_frame;

        match event.kind {
            EventKind::Press => match current {
                ChannelStatus::Off | ChannelStatus::Empty if mode.arms_on_press() => {
                    self.offset = local_frame;
                    status.store_rt(ChannelStatus::Wait);
                }
                ChannelStatus::Off | ChannelStatus::Empty => {
                    if clock.can_quantize() {
                        self.quantizing = true;
                    } else {
                        self.offset = local_frame;
                        status.store_rt(ChannelStatus::Play);
                    }
                }
                ChannelStatus::Play => match mode {
                    SamplePlayerMode::SingleRetrig => self.rewind(status, state, local_frame),
                    SamplePlayerMode::SingleBasic => {
                        self.rewind(status, state, local_frame);
                        status.store_rt(ChannelStatus::Off);
                    }
                    _ if mode.is_looping() || mode == SamplePlayerMode::SingleEndless => {
                        status.store_rt(ChannelStatus::Ending);
                    }
                    _ => {}
                },
                _ => {}
            },
            EventKind::Release => {
                if current == ChannelStatus::Play && mode == SamplePlayerMode::SinglePress {
                    self.kill(status, state, scratch, local_frame);
                }
            }
            EventKind::Kill => {
                self.kill(status, state, scratch, local_frame);
            }
            EventKind::OnBar => {
                if mode == SamplePlayerMode::LoopRepeat && current == ChannelStatus::Play {
                    self.rewind(status, state, local_frame);
                } else if mode == SamplePlayerMode::LoopOnceBar && current == ChannelStatus::Wait {
                    self.offset = local_frame;
                }
            }
            EventKind::OnFirstBeat => match current {
                ChannelStatus::Wait => {
                    status.store_rt(ChannelStatus::Play);
                    self.offset = local_frame;
                }
                ChannelStatus::Off | ChannelStatus::Empty if self.quantizing => {
                    status.store_rt(ChannelStatus::Play);
                    self.offset = local_frame;
                    self.quantizing = false;
                }
                ChannelStatus::Ending if mode.is_looping() => {
                    self.kill(status, state, scratch, local_frame);
                }
                ChannelStatus::Play if mode.is_looping() => {
                    self.rewind(status, state, local_frame);
                }
                _ => {}
            },
        }
    }

    /// Renders one block of audio into `scratch`, which the caller has
    /// already sized to the device block length.
    pub fn render(
        &mut self,
        wave: Option<&Wave>,
        status: &AtomicChannelStatus,
        state: &SamplePlayerState,
        scratch: &mut AudioBuffer,
    ) {
        let current = status.load_rt();
        let Some(wave) = wave else {
            scratch.clear();
            return;
        };
        if current != ChannelStatus::Play && current != ChannelStatus::Ending {
            scratch.clear();
            return;
        }
        scratch.clear();

        let begin = state.begin();
        let end = state.end().min(wave.size());
        let mut tracker = state.tracker() + state.shift();
        if tracker < begin || tracker >= end {
            tracker = begin;
        }
        let pitch = state.pitch();
        let mode = state.mode();

        if self.rewinding {
            // Finish the tail of the old region into the start of the
            // block, then resume from `begin` at the split point captured
            // by rewind()/kill(), not at however many frames the tail fill
            // happened to produce.
            let _ = self.reader.fill(wave, tracker, scratch, 0, pitch);
            tracker = begin;
            self.reader.reset_phase();
            self.rewinding = false;

            let resume_offset = (self.offset.max(0) as usize).min(scratch.frames());
            if resume_offset < scratch.frames() {
                let used2 = self.reader.fill(wave, tracker, scratch, resume_offset, pitch);
                tracker += used2;
            }
        } else {
            let offset = (self.offset.max(0) as usize).min(scratch.frames());
            let used = self.reader.fill(wave, tracker, scratch, offset, pitch);
            tracker += used;
        }

        if tracker >= end {
            tracker = begin;
            if mode.is_looping() {
                let produced_so_far = (scratch.frames()).min(scratch.frames());
                let clamped_offset = produced_so_far.saturating_sub(1).min(scratch.frames() - 1);
                self.reader.reset_phase();
                let _ = self.reader.fill(wave, tracker, scratch, clamped_offset, pitch);
            } else {
                status.store_rt(ChannelStatus::Off);
            }
        }

        self.offset = 0;
        state.set_tracker_begin(tracker);
    }
}

impl SamplePlayerState {
    /// Sets the tracker directly (used by render/rewind/kill, all of which
    /// already enforce `begin <= value`).
    fn set_tracker_begin(&self, value: Frame) {
        self.set_tracker(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TransportStatus;

    fn make_wave(len: i64) -> Wave {
        let samples: Vec<f32> = (0..len).map(|i| i as f32).collect();
        Wave::new(1, "w", 48_000, samples)
    }

    fn make_clock() -> Clock {
        Clock::new(48_000, 120.0, 4, 1, 4)
    }

    #[test]
    fn press_loop_basic_arms_then_plays_on_first_beat() {
        let wave = make_wave(1000);
        let state = SamplePlayerState::new(0, 1000, SamplePlayerMode::LoopBasic);
        let status = AtomicChannelStatus::new(ChannelStatus::Off);
        let clock = make_clock();
        let mut player = SamplePlayer::new(64);
        let mut scratch = AudioBuffer::new(64, 1);

        player.handle_event(&Event::press(5, 0), &status, &state, &clock, &mut scratch);
        assert_eq!(status.load_rt(), ChannelStatus::Wait);

        player.render(Some(&wave), &status, &state, &mut scratch);
        assert!(scratch.as_slice().iter().all(|s| *s == 0.0));

        player.handle_event(&Event::on_first_beat(0), &status, &state, &clock, &mut scratch);
        assert_eq!(status.load_rt(), ChannelStatus::Play);
        player.render(Some(&wave), &status, &state, &mut scratch);
        assert_eq!(scratch.frame(0).unwrap(), &[0.0]);
        assert_eq!(state.tracker(), 64);
    }

    #[test]
    fn single_basic_second_press_stops_after_rewind() {
        let wave = make_wave(200);
        let state = SamplePlayerState::new(0, 200, SamplePlayerMode::SingleBasic);
        let status = AtomicChannelStatus::new(ChannelStatus::Off);
        let clock = make_clock();
        let mut player = SamplePlayer::new(64);
        let mut scratch = AudioBuffer::new(64, 1);

        player.handle_event(&Event::press(1, 0), &status, &state, &clock, &mut scratch);
        assert_eq!(status.load_rt(), ChannelStatus::Play);
        player.render(Some(&wave), &status, &state, &mut scratch);
        player.render(Some(&wave), &status, &state, &mut scratch);
        assert_eq!(state.tracker(), 128);

        player.handle_event(&Event::press(1, 10), &status, &state, &clock, &mut scratch);
        assert_eq!(status.load_rt(), ChannelStatus::Off);
        player.render(Some(&wave), &status, &state, &mut scratch);
        assert!(scratch.as_slice().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn kill_mid_block_zeroes_tail() {
        let wave = make_wave(1000);
        let state = SamplePlayerState::new(0, 1000, SamplePlayerMode::LoopBasic);
        let status = AtomicChannelStatus::new(ChannelStatus::Play);
        let clock = make_clock();
        let mut player = SamplePlayer::new(64);
        let mut scratch = AudioBuffer::new(64, 1);

        player.render(Some(&wave), &status, &state, &mut scratch);
        player.handle_event(&Event::kill(1, 40), &status, &state, &clock, &mut scratch);
        assert_eq!(status.load_rt(), ChannelStatus::Off);
        assert_eq!(state.tracker(), state.begin());
        for i in 40..64 {
            assert_eq!(scratch.frame(i).unwrap(), &[0.0]);
        }
    }

    #[test]
    fn loop_repeat_rewinds_on_bar() {
        let wave = make_wave(1000);
        let state = SamplePlayerState::new(0, 1000, SamplePlayerMode::LoopRepeat);
        let status = AtomicChannelStatus::new(ChannelStatus::Play);
        let clock = make_clock();
        let mut player = SamplePlayer::new(64);
        let mut scratch = AudioBuffer::new(64, 1);

        player.handle_event(&Event::on_bar(32), &status, &state, &clock, &mut scratch);
        player.render(Some(&wave), &status, &state, &mut scratch);
        assert_eq!(scratch.frame(0).unwrap(), &[0.0]);
        assert_eq!(scratch.frame(32).unwrap(), &[0.0]);
        assert_eq!(state.tracker(), 32);
    }

    #[test]
    fn quantized_single_press_waits_for_first_beat() {
        let wave = make_wave(1000);
        let state = SamplePlayerState::new(0, 1000, SamplePlayerMode::SinglePress);
        let status = AtomicChannelStatus::new(ChannelStatus::Off);
        let clock = make_clock();
        clock.set_status(TransportStatus::Running);
        let mut player = SamplePlayer::new(64);
        let mut scratch = AudioBuffer::new(64, 1);

        player.handle_event(&Event::press(1, 0), &status, &state, &clock, &mut scratch);
        assert_eq!(status.load_rt(), ChannelStatus::Off);
        assert!(player.is_quantizing());

        player.handle_event(&Event::on_first_beat(0), &status, &state, &clock, &mut scratch);
        assert_eq!(status.load_rt(), ChannelStatus::Play);
        assert!(!player.is_quantizing());
    }
}

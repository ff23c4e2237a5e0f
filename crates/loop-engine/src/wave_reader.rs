//! Fills a destination [`AudioBuffer`] with audio read from a [`Wave`] at a
//! given pitch. Two paths: a straight copy at unity pitch, and a persistent
//! linear-interpolation resample otherwise. The resample scratch is
//! preallocated to the device block length so `fill` never allocates.

use loop_dsp::resample::{linear_resample_into, SrcState};

use crate::buffer::AudioBuffer;
use crate::types::Frame;
use crate::wave::Wave;

pub struct WaveReader {
    src_state: SrcState,
    mono_scratch: Vec<f32>,
}

impl WaveReader {
    pub fn new(max_block_frames: usize) -> Self {
        Self {
            src_state: SrcState::new(),
            mono_scratch: vec![0.0; max_block_frames.max(1)],
        }
    }

    /// Must be called whenever the device block length grows; never called
    /// from the audio thread.
    pub fn ensure_capacity(&mut self, max_block_frames: usize) {
        if self.mono_scratch.len() < max_block_frames {
            self.mono_scratch.resize(max_block_frames, 0.0);
        }
    }

    /// Resets the resampler's fractional phase. Called whenever the tracker
    /// jumps discontinuously (rewind, kill) so the next `fill` doesn't
    /// interpolate across the seam.
    pub fn reset_phase(&mut self) {
        self.src_state.reset();
    }

    /// Fills `dst[dst_offset..]` with up to `dst.frames() - dst_offset`
    /// frames of `wave` starting at `tracker`, at `pitch`. Returns the
    /// number of source frames consumed (the amount the caller should
    /// advance `tracker` by).
    pub fn fill(
        &mut self,
        wave: &Wave,
        tracker: Frame,
        dst: &mut AudioBuffer,
        dst_offset: usize,
        pitch: f32,
    ) -> Frame {
        if dst_offset >= dst.frames() || tracker < 0 {
            return 0;
        }
        let want = dst.frames() - dst_offset;

        if (pitch - 1.0).abs() < f32::EPSILON {
            let wave_remaining = (wave.size() - tracker).max(0) as usize;
            let n = want.min(wave_remaining);
            for i in 0..n {
                let sample = wave.sample_at(tracker + i as Frame);
                if let Ok(frame) = dst.frame_mut(dst_offset + i) {
                    frame.iter_mut().for_each(|slot| *slot = sample);
                }
            }
            n as Frame
        } else {
            self.ensure_capacity(want);
            let scratch = &mut self.mono_scratch[..want];
            let start = tracker as usize;
            let src: &[f32] = wave.samples().get(start..).unwrap_or(&[]);
            let result = linear_resample_into(src, scratch, pitch, &mut self.src_state);
            for i in 0..result.produced {
                if let Ok(frame) = dst.frame_mut(dst_offset + i) {
                    let sample = scratch[i];
                    frame.iter_mut().for_each(|slot| *slot = sample);
                }
            }
            result.consumed_frames
        }
    }
}

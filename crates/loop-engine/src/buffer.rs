//! Fixed-layout interleaved audio buffer: `frames` groups of `channels`
//! contiguous `f32`s. Every per-channel scratch buffer, the virtual input
//! buffer and the in-to-out bridge in the mixer are one of these.

use crate::error::BufferError;

#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    frames: usize,
    channels: usize,
    data: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(frames: usize, channels: usize) -> Self {
        if frames == 0 || channels == 0 {
            return Self::empty();
        }
        Self {
            frames,
            channels,
            data: vec![0.0; frames * channels],
        }
    }

    pub const fn empty() -> Self {
        Self {
            frames: 0,
            channels: 0,
            data: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Resizes in place, re-zeroing storage when the shape changes. A no-op
    /// when the shape already matches (the hot path on the audio thread,
    /// which never resizes — only the owning channel's setup code does).
    pub fn resize(&mut self, frames: usize, channels: usize) {
        if self.frames == frames && self.channels == channels {
            return;
        }
        *self = Self::new(frames, channels);
    }

    #[inline]
    fn check_frame(&self, index: usize) -> Result<(), BufferError> {
        if index >= self.frames {
            return Err(BufferError::InvalidRange {
                index,
                frames: self.frames,
            });
        }
        Ok(())
    }

    /// Returns the interleaved slot range `[start, start+channels)` for one
    /// frame.
    pub fn frame(&self, index: usize) -> Result<&[f32], BufferError> {
        self.check_frame(index)?;
        let start = index * self.channels;
        Ok(&self.data[start..start + self.channels])
    }

    pub fn frame_mut(&mut self, index: usize) -> Result<&mut [f32], BufferError> {
        self.check_frame(index)?;
        let start = index * self.channels;
        let channels = self.channels;
        Ok(&mut self.data[start..start + channels])
    }

    /// Overwrites frame `index` with `values`, which must be `channels`
    /// long.
    pub fn copy_frame(&mut self, index: usize, values: &[f32]) -> Result<(), BufferError> {
        let dst = self.frame_mut(index)?;
        let n = dst.len().min(values.len());
        dst[..n].copy_from_slice(&values[..n]);
        Ok(())
    }

    /// Zeroes the frame range `[start, end)`. Used by `kill()` to silence
    /// the tail of a block after a mid-block cut.
    pub fn clear_range(&mut self, start: usize, end: usize) -> Result<(), BufferError> {
        if start > end || end > self.frames {
            return Err(BufferError::InvalidRange {
                index: end,
                frames: self.frames,
            });
        }
        let channels = self.channels;
        let lo = start * channels;
        let hi = end * channels;
        self.data[lo..hi].fill(0.0);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Copies up to `frames` frames from `src` starting at its frame 0 into
    /// `self` starting at `dst_offset`. Returns the number of frames
    /// actually copied (clamped to both buffers' capacity).
    pub fn copy_from(&mut self, src: &AudioBuffer, frames: usize, dst_offset: usize) -> usize {
        if self.channels != src.channels || dst_offset >= self.frames {
            return 0;
        }
        let available_dst = self.frames - dst_offset;
        let n = frames.min(available_dst).min(src.frames);
        let channels = self.channels;
        let dst_lo = dst_offset * channels;
        self.data[dst_lo..dst_lo + n * channels].copy_from_slice(&src.data[..n * channels]);
        n
    }

    /// Adds `source * gain` into `self`, frame-by-frame, channel-by-channel.
    /// This is the mixing primitive the channel and mixer use to accumulate
    /// into the output bus.
    pub fn mix_from(&mut self, source: &AudioBuffer, gain: f32) {
        if self.channels != source.channels {
            return;
        }
        let n = self.frames.min(source.frames) * self.channels;
        for i in 0..n {
            self.data[i] += source.data[i] * gain;
        }
    }

    /// Moves the backing storage out, leaving `self` empty.
    pub fn take(&mut self) -> AudioBuffer {
        std::mem::replace(self, AudioBuffer::empty())
    }
}

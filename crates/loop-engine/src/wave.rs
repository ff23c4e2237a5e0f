//! An immutable decoded audio asset. Waves are produced by the external
//! wave-loader collaborator (§6) off the audio thread and never mutated
//! once built; the audio thread only ever reads through a `WaveRcu`
//! snapshot (see [`crate::rcu`]).

use std::sync::Arc;

use crate::types::{Frame, WaveId};

#[derive(Debug, Clone)]
pub struct Wave {
    id: WaveId,
    path: Arc<str>,
    sample_rate: u32,
    /// Mono sample data; the loader rejects multichannel source material
    /// (`WaveLoadError::WrongData`), so every output channel reads the same
    /// stream.
    samples: Arc<[f32]>,
}

impl Wave {
    pub fn new(id: WaveId, path: impl Into<Arc<str>>, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            id,
            path: path.into(),
            sample_rate,
            samples: samples.into(),
        }
    }

    pub fn id(&self) -> WaveId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn size(&self) -> Frame {
        self.samples.len() as Frame
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample at `index`, or silence past the end. Negative indices (from a
    /// rewind that undershot) also read as silence rather than panicking.
    #[inline]
    pub fn sample_at(&self, index: Frame) -> f32 {
        if index < 0 {
            return 0.0;
        }
        self.samples.get(index as usize).copied().unwrap_or(0.0)
    }
}

impl crate::rcu::Identified for Wave {
    type Id = WaveId;

    fn id(&self) -> WaveId {
        self.id
    }
}

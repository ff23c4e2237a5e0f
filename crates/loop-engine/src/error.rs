use thiserror::Error;

/// Frame-addressed operations that can fail. Audio-thread call sites never
/// propagate this — they clamp in release builds and `debug_assert` in
/// debug builds — but the user-thread buffer APIs return it so callers can
/// react to programmer error instead of silently corrupting memory.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("frame index {index} out of range for buffer of {frames} frames")]
    InvalidRange { index: usize, frames: usize },
}

/// Status codes a wave loader can report back to `MixerHandler`. The actual
/// decode/resample work lives in the external wave-loader collaborator
/// (§6); this crate only models the outcomes it must react to.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WaveLoadError {
    #[error("wave file contains unsupported channel layout")]
    WrongData,
    #[error("I/O error while reading wave file")]
    Io,
    #[error("wave file path exceeds the supported length")]
    PathTooLong,
    #[error("wave file contained no audio data")]
    NoData,
}

/// Errors raised by user-thread orchestration (`MixerHandler`, `Sequencer`).
/// Never surfaced on the audio thread.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("channel {0} not found")]
    ChannelNotFound(u64),
    #[error("wave {0} not found")]
    WaveNotFound(u64),
    #[error("channel id {0} is reserved")]
    ReservedId(u64),
    #[error("failed to allocate resampler state for channel {0}")]
    ResamplerInit(u64),
    #[error("wave load failed: {0}")]
    WaveLoad(#[from] WaveLoadError),
}

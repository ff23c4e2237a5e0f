//! Engine-wide configuration, captured once at startup and threaded into
//! every component that needs it instead of scattering magic numbers.

/// Immutable snapshot of the settings the engine is constructed with.
/// Changing any of these after construction means rebuilding the engine;
/// per-block config (tempo, quantize) lives on [`crate::clock::Clock`]
/// instead since it changes at runtime.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub out_channels: usize,
    pub initial_bpm: f32,
    pub beats_per_bar: u32,
    pub bars: u32,
    pub quantize: u32,
    /// Capacity of each SPSC event queue (UI, MIDI).
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 256,
            out_channels: 2,
            initial_bpm: 120.0,
            beats_per_bar: 4,
            bars: 1,
            quantize: 4,
            event_queue_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let cfg = EngineConfig::default();
        assert!(cfg.sample_rate > 0);
        assert!(cfg.block_size > 0);
        assert!(cfg.out_channels > 0);
    }
}

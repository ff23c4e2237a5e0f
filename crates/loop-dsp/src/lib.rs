//! loop-dsp
//! ========
//! Small, allocation-free signal-processing building blocks shared by the
//! loop-machine audio core: dB/linear gain conversion and the
//! linear-interpolation resampler used by the wave reader.

pub mod gain;
pub mod resample;

//! Shared type aliases used across the audio core.

use std::sync::atomic::{AtomicU8, Ordering};

/// A signed frame count. Signed because rewinds and shifts can momentarily
/// compute negative offsets before clamping.
pub type Frame = i64;

/// Shared between [`crate::channel`] and [`crate::sample_player`]: the
/// sample player drives this state machine, the channel reads it to decide
/// whether to mix a channel's scratch buffer into the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// No wave assigned; nothing to play.
    Empty,
    /// Wave assigned but not playing.
    Off,
    Play,
    /// Armed, waiting for the next musical boundary.
    Wait,
    /// Will stop at the next boundary.
    Ending,
    /// Wave reference is stale (its wave was removed from the RCU list).
    Missing,
}

impl ChannelStatus {
    fn to_u8(self) -> u8 {
        match self {
            ChannelStatus::Empty => 0,
            ChannelStatus::Off => 1,
            ChannelStatus::Play => 2,
            ChannelStatus::Wait => 3,
            ChannelStatus::Ending => 4,
            ChannelStatus::Missing => 5,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ChannelStatus::Off,
            2 => ChannelStatus::Play,
            3 => ChannelStatus::Wait,
            4 => ChannelStatus::Ending,
            5 => ChannelStatus::Missing,
            _ => ChannelStatus::Empty,
        }
    }
}

/// Lock-free `ChannelStatus` cell. Per the crate's ordering convention, the
/// audio thread stores with `Release` and any user-thread reader (UI
/// polling for display) loads with `Acquire`; the audio thread's own reads
/// use `Relaxed` since it is the sole writer and already serializes its own
/// transitions.
#[derive(Debug)]
pub struct AtomicChannelStatus(AtomicU8);

impl AtomicChannelStatus {
    pub fn new(initial: ChannelStatus) -> Self {
        Self(AtomicU8::new(initial.to_u8()))
    }

    #[inline]
    pub fn load_rt(&self) -> ChannelStatus {
        ChannelStatus::from_u8(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn load_ui(&self) -> ChannelStatus {
        ChannelStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store_rt(&self, status: ChannelStatus) {
        self.0.store(status.to_u8(), Ordering::Release);
    }
}

/// Stable per-process channel identifier. `0` is reserved as the broadcast
/// id for events (§4.5: "0 = broadcast").
pub type ChannelId = u64;

pub type WaveId = u64;

pub const BROADCAST_CHANNEL: ChannelId = 0;

pub const MASTER_OUT_ID: ChannelId = 1;
pub const MASTER_IN_ID: ChannelId = 2;
pub const PREVIEW_ID: ChannelId = 3;
/// First id handed out to a user-created channel.
pub const FIRST_USER_ID: ChannelId = 16;

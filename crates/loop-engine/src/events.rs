//! The two single-producer/single-consumer event queues that feed the
//! mixer callback, and the `Event` type they carry.
//!
//! `UiEvents` is fed by the UI thread (press/release/kill from keyboard or
//! on-screen grid); `MidiEvents` is fed by the MIDI thread. Both are plain
//! `ringbuf` heap ring buffers — push never blocks or allocates, and a full
//! queue drops the event rather than stalling the producer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::warn;
use loop_rt::{QueueLane, RtEvent};
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

use crate::types::{ChannelId, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Press,
    Release,
    Kill,
    /// Delivered by the mixer when the clock crosses a bar boundary.
    OnBar,
    /// Delivered by the mixer when the clock crosses the first beat of a
    /// bar.
    OnFirstBeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiData {
    pub status: u8,
    pub note: u8,
    pub velocity: u8,
    /// Ticks since the previous message on this lane, as reported by the
    /// MIDI device when it pushes the event onto the queue (§6).
    pub delta: Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Frame offset within the current block at which this event takes
    /// effect. `0` for events synthesized by the clock (they always land
    /// exactly on the boundary frame, which the mixer supplies).
    pub local_frame: Frame,
    /// `0` broadcasts to every channel; otherwise the event is routed only
    /// to the channel with this id.
    pub channel_id: ChannelId,
    pub midi: Option<MidiData>,
}

impl Event {
    pub fn press(channel_id: ChannelId, local_frame: Frame) -> Self {
        Self {
            kind: EventKind::Press,
            local_frame,
            channel_id,
            midi: None,
        }
    }

    pub fn release(channel_id: ChannelId, local_frame: Frame) -> Self {
        Self {
            kind: EventKind::Release,
            local_frame,
            channel_id,
            midi: None,
        }
    }

    pub fn kill(channel_id: ChannelId, local_frame: Frame) -> Self {
        Self {
            kind: EventKind::Kill,
            local_frame,
            channel_id,
            midi: None,
        }
    }

    pub fn on_bar(local_frame: Frame) -> Self {
        Self {
            kind: EventKind::OnBar,
            local_frame,
            channel_id: crate::types::BROADCAST_CHANNEL,
            midi: None,
        }
    }

    pub fn on_first_beat(local_frame: Frame) -> Self {
        Self {
            kind: EventKind::OnFirstBeat,
            local_frame,
            channel_id: crate::types::BROADCAST_CHANNEL,
            midi: None,
        }
    }

    /// Whether this event should be dispatched to a channel with the given
    /// id: channel 0 is a broadcast target, an exact id match otherwise.
    #[inline]
    pub fn targets(&self, channel_id: ChannelId) -> bool {
        self.channel_id == crate::types::BROADCAST_CHANNEL || self.channel_id == channel_id
    }
}

/// One direction of a fixed-capacity SPSC event queue. The producer half is
/// handed to the UI or MIDI thread; the consumer half lives on the audio
/// thread and is drained once per block.
pub struct EventProducer {
    inner: HeapProducer<Event>,
    lane: QueueLane,
    dropped: Arc<AtomicU64>,
}

pub struct EventConsumer {
    inner: HeapConsumer<Event>,
}

impl EventProducer {
    /// Attempts to enqueue `event`. Returns `false` and logs a warning if
    /// the queue is full — per §4.7/§4.12, a full queue drops the event
    /// rather than blocking the producer thread.
    pub fn push(&mut self, event: Event) -> bool {
        match self.inner.push(event) {
            Ok(()) => true,
            Err(_dropped) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                let rt_event = RtEvent::QueueFull { lane: self.lane };
                warn!(
                    "{:?} event queue full, dropping event (kind {}, {} dropped so far)",
                    self.lane,
                    rt_event.kind_id(),
                    total
                );
                false
            }
        }
    }

    /// Total events dropped on this lane since construction. Exposed so
    /// the UI can surface queue-pressure telemetry without touching the
    /// audio thread.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventConsumer {
    pub fn pop(&mut self) -> Option<Event> {
        self.inner.pop()
    }

    /// Drains every currently-queued event into `out`, preserving enqueue
    /// order.
    pub fn drain_into(&mut self, out: &mut Vec<Event>) {
        while let Some(event) = self.inner.pop() {
            out.push(event);
        }
    }
}

/// Builds one SPSC lane with the given fixed capacity.
pub fn event_queue(capacity: usize, lane: QueueLane) -> (EventProducer, EventConsumer) {
    let rb = HeapRb::<Event>::new(capacity);
    let (producer, consumer) = rb.split();
    (
        EventProducer {
            inner: producer,
            lane,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        EventConsumer { inner: consumer },
    )
}

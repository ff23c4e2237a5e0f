#![cfg_attr(not(test), warn(clippy::pedantic))]

//! Realtime telemetry events the audio thread can report without allocating
//! or blocking. The audio thread pushes these into a lock-free queue; a
//! non-realtime consumer (UI, logger) drains and reports them.

#[derive(Copy, Clone, Debug)]
pub enum RtEvent {
    /// A producer dropped an event because its queue was full.
    QueueFull { lane: QueueLane },
    /// The audio callback observed a device-level error and closed the stream.
    DeviceError,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueueLane {
    Ui,
    Midi,
}

impl RtEvent {
    #[inline]
    pub fn kind_id(&self) -> u8 {
        match self {
            RtEvent::QueueFull { .. } => 1,
            RtEvent::DeviceError => 2,
        }
    }
}

//! Collaborator traits
//!
//! The radio transceiver and the climate sensor are hardware drivers that
//! live outside this crate. These traits are the seams they plug into.
//! Keep them simple - embedded drivers don't need complex abstractions.

use crate::constants::radio::MAX_FRAME_SIZE;
use crate::measurement::Measurement;
use crate::time::Timestamp;

/// Received frame, bounded like everything else on the air
pub type RxBuf = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// Half-duplex packet radio
///
/// CRC and physical framing belong to the driver; implementations hand over
/// only frames that passed them.
pub trait Radio {
    /// Transmit one frame; false if the driver could not send it
    fn send(&mut self, frame: &[u8]) -> bool;

    /// Wait up to `timeout_ms` for a frame
    fn receive(&mut self, timeout_ms: Timestamp) -> Option<RxBuf>;
}

impl<R: Radio + ?Sized> Radio for &mut R {
    fn send(&mut self, frame: &[u8]) -> bool {
        (**self).send(frame)
    }

    fn receive(&mut self, timeout_ms: Timestamp) -> Option<RxBuf> {
        (**self).receive(timeout_ms)
    }
}

/// Temperature / humidity / supply voltage sensor
pub trait SampleSource {
    /// Take one sample; `None` if the driver failed to read
    fn sample(&mut self) -> Option<Measurement>;
}

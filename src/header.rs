//! The frame-header contract that concrete formats implement.
//!
//! The stream layer never looks inside header bytes; everything it needs —
//! frame numbering, integer-second timestamps, sizes, validity — comes
//! through this trait. Concrete binary layouts live with their formats.

use std::io::{Read, Write};

use crate::Result;

/// One frame header of a baseband recording format.
///
/// Frame numbers count frames within an integer second and wrap to zero at
/// each second boundary; `seconds_since_epoch` is the integer-second part of
/// the frame's timestamp.
pub trait FrameHeader: Sized + Clone {
    /// Parse one header from the stream, leaving the position at the start
    /// of the payload.
    fn parse<R: Read>(reader: &mut R) -> Result<Self>;

    /// Write the header bytes.
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()>;

    /// Frame number within the current second.
    fn frame_number(&self) -> u32;

    /// Integer seconds since the format's epoch.
    fn seconds_since_epoch(&self) -> u64;

    /// Size of the payload following this header, in bytes.
    fn payload_size_bytes(&self) -> usize;

    /// Size of the whole frame (header plus payload), in bytes.
    fn frame_size_bytes(&self) -> usize;

    /// Whether the header passes the format's structural sanity checks
    /// (sync words, self-consistent sizes). Used when scanning raw bytes
    /// for frame boundaries.
    fn verify(&self) -> bool;

    /// Whether the frame carries real data. Padded frames written at
    /// close are structurally sound but marked invalid.
    fn is_valid(&self) -> bool;

    /// A copy of this header re-stamped for another frame.
    fn with_time(&self, seconds_since_epoch: u64, frame_number: u32) -> Self;

    /// Set or clear the invalid-data marker.
    fn set_valid(&mut self, valid: bool);

    /// Size of the header itself, in bytes.
    fn header_size_bytes(&self) -> usize {
        self.frame_size_bytes() - self.payload_size_bytes()
    }
}

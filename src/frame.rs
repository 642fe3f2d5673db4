//! A frame: one header and the payload it describes.

use std::io::{Read, Write};

use crate::header::FrameHeader;
use crate::payload::{Payload, SampleArray};
use crate::shape::SampleShape;
use crate::Result;

/// The atomic unit of file layout: a header followed by its payload bytes.
///
/// A recording is a plain concatenation of frames with no file-level
/// trailer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<H: FrameHeader> {
    pub header: H,
    pub payload: Payload,
}

impl<H: FrameHeader> Frame<H> {
    /// Parse a header, then read the payload it declares.
    pub fn read_from<R: Read>(
        reader: &mut R,
        bps: u32,
        sample_shape: SampleShape,
        complex: bool,
    ) -> Result<Self> {
        let header = H::parse(reader)?;
        let payload = Payload::from_reader(
            reader,
            header.payload_size_bytes(),
            bps,
            sample_shape,
            complex,
        )?;
        Ok(Self { header, payload })
    }

    /// Write header then payload.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.header.write_to(writer)?;
        self.payload.write_to(writer)
    }

    /// Number of complete samples in the payload.
    pub fn sample_count(&self) -> usize {
        self.payload.sample_count()
    }

    /// Whether the header marks this frame as carrying real data.
    pub fn is_valid(&self) -> bool {
        self.header.is_valid()
    }

    /// Decode the full payload.
    pub fn decode_all(&self) -> SampleArray {
        self.payload.decode_all()
    }
}

//! Frame-level (binary mode) file access.
//!
//! [`FileReader`] and [`FileWriter`] wrap a raw handle and move whole
//! frames. They expose exactly the I/O surface the stream layer needs
//! (read, write, seek); there is no catch-all delegation to the handle.

use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;

use crate::detect::detect_frame_rate;
use crate::frame::Frame;
use crate::header::FrameHeader;
use crate::shape::SampleShape;
use crate::{BasebandError, Result};

/// How many frame lengths back from end-of-file to search for the last
/// valid header.
const LAST_HEADER_SEARCH_FRAMES: u64 = 10;

/// Reads headers and frames from a raw byte stream.
#[derive(Debug)]
pub struct FileReader<H: FrameHeader, R: Read + Seek> {
    inner: R,
    _header: PhantomData<H>,
}

impl<H: FrameHeader, R: Read + Seek> FileReader<H, R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            _header: PhantomData,
        }
    }

    /// Parse the header at the current position, leaving the position at
    /// the start of its payload.
    pub fn read_header(&mut self) -> Result<H> {
        H::parse(&mut self.inner)
    }

    /// Read the frame at the current position.
    pub fn read_frame(
        &mut self,
        bps: u32,
        sample_shape: SampleShape,
        complex: bool,
    ) -> Result<Frame<H>> {
        Frame::read_from(&mut self.inner, bps, sample_shape, complex)
    }

    /// Infer frames per second by scanning from the current position.
    pub fn detect_frame_rate(&mut self) -> Result<u32> {
        detect_frame_rate::<H, R>(&mut self.inner)
    }

    /// Locate the last structurally valid header near end-of-file.
    ///
    /// Starting one frame length before the end, candidate positions are
    /// tried moving backward a byte at a time, up to ten frame lengths.
    /// The first header that parses, verifies, and matches the expected
    /// frame size wins — including one whose frame is marked as invalid
    /// data, since padded final frames still bound the file. The stream
    /// position is restored afterwards.
    pub fn find_last_header(&mut self, frame_size: usize) -> Result<H> {
        let original = self.inner.stream_position()?;
        let result = self.scan_backward(frame_size as u64);
        self.inner.seek(SeekFrom::Start(original))?;
        result
    }

    fn scan_backward(&mut self, frame_size: u64) -> Result<H> {
        let end = self.inner.seek(SeekFrom::End(0))?;
        let max_back = LAST_HEADER_SEARCH_FRAMES * frame_size;
        for back in 0..max_back {
            let Some(pos) = end.checked_sub(frame_size + back) else {
                break;
            };
            self.inner.seek(SeekFrom::Start(pos))?;
            if let Ok(header) = H::parse(&mut self.inner) {
                if header.verify()
                    && header.frame_size_bytes() as u64 == frame_size
                    && pos + frame_size <= end
                {
                    return Ok(header);
                }
            }
        }
        Err(BasebandError::CorruptStream {
            searched: max_back as usize,
        })
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }

    pub fn stream_position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Appends frames to a raw byte stream.
#[derive(Debug)]
pub struct FileWriter<H: FrameHeader, W: Write> {
    inner: W,
    _header: PhantomData<H>,
}

impl<H: FrameHeader, W: Write> FileWriter<H, W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            _header: PhantomData,
        }
    }

    /// Write one frame (header plus payload).
    pub fn write_frame(&mut self, frame: &Frame<H>) -> Result<()> {
        frame.write_to(&mut self.inner)
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::testing::{TestHeader, HEADER_SIZE};
    use crate::payload::{Payload, SampleArray};
    use std::io::Cursor;

    const PAYLOAD_BYTES: usize = 16;
    const FRAME_SIZE: usize = HEADER_SIZE + PAYLOAD_BYTES;

    fn frame(seconds: u32, frame_nr: u32, fill: f32) -> Frame<TestHeader> {
        let data = SampleArray::from_real(vec![fill; PAYLOAD_BYTES], &[PAYLOAD_BYTES]).unwrap();
        let payload = Payload::from_data(&data, 8).unwrap();
        Frame {
            header: TestHeader::new(seconds, frame_nr, PAYLOAD_BYTES as u16),
            payload,
        }
    }

    fn file_of(frames: &[Frame<TestHeader>]) -> Vec<u8> {
        let mut writer = FileWriter::new(Vec::new());
        for f in frames {
            writer.write_frame(f).unwrap();
        }
        writer.into_inner()
    }

    #[test]
    fn test_write_then_read_frames() {
        let frames = vec![frame(100, 0, 1.0), frame(100, 1, -1.0)];
        let bytes = file_of(&frames);
        assert_eq!(bytes.len(), 2 * FRAME_SIZE);

        let mut reader = FileReader::<TestHeader, _>::new(Cursor::new(bytes));
        for expected in &frames {
            let got = reader
                .read_frame(8, SampleShape::scalar(), false)
                .unwrap();
            assert_eq!(&got, expected);
        }
    }

    #[test]
    fn test_find_last_header() {
        let frames = vec![frame(100, 0, 1.0), frame(100, 1, 3.0), frame(100, 2, 5.0)];
        let bytes = file_of(&frames);
        let mut reader = FileReader::<TestHeader, _>::new(Cursor::new(bytes));

        let last = reader.find_last_header(FRAME_SIZE).unwrap();
        assert_eq!(last.frame_number(), 2);
        // Position untouched.
        assert_eq!(reader.stream_position().unwrap(), 0);
    }

    #[test]
    fn test_find_last_header_skips_trailing_garbage() {
        let frames = vec![frame(100, 0, 1.0), frame(100, 1, 3.0)];
        let mut bytes = file_of(&frames);
        // A torn final frame: half a frame of garbage.
        bytes.extend(std::iter::repeat(0xAAu8).take(FRAME_SIZE / 2));

        let mut reader = FileReader::<TestHeader, _>::new(Cursor::new(bytes));
        let last = reader.find_last_header(FRAME_SIZE).unwrap();
        assert_eq!(last.frame_number(), 1);
    }

    #[test]
    fn test_find_last_header_corrupt_stream() {
        let bytes = vec![0xAAu8; FRAME_SIZE * 12];
        let mut reader = FileReader::<TestHeader, _>::new(Cursor::new(bytes));
        let err = reader.find_last_header(FRAME_SIZE).unwrap_err();
        assert!(matches!(err, BasebandError::CorruptStream { .. }));
    }
}

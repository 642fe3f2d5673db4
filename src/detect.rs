//! Frame-rate detection by scanning headers for a frame-number wrap.

use std::io::{Read, Seek, SeekFrom};

use tracing::warn;

use crate::header::FrameHeader;
use crate::{BasebandError, Result};

/// Infer the number of frames per second by scanning headers until the
/// frame number wraps back to zero at a second boundary.
///
/// Starting from the current position (which must be a frame boundary),
/// headers are parsed and their payloads skipped. The rate is the largest
/// frame number seen in the first full cycle, plus one. The stream position
/// is restored afterwards, whether detection succeeds or fails.
///
/// Fails with [`BasebandError::InsufficientDataForRateDetection`] when the
/// stream ends before a wrap is seen. Detection is best-effort: it assumes
/// frame numbers increase within a second and reset at the boundary, and
/// only warns (a possible gap in the data) when the integer-second counter
/// moves by more than one across the cycle.
pub fn detect_frame_rate<H, R>(reader: &mut R) -> Result<u32>
where
    H: FrameHeader,
    R: Read + Seek,
{
    let original = reader.stream_position()?;
    let result = scan::<H, R>(reader);
    reader.seek(SeekFrom::Start(original))?;
    result
}

fn scan<H, R>(reader: &mut R) -> Result<u32>
where
    H: FrameHeader,
    R: Read + Seek,
{
    let mut header = next_header::<H, R>(reader)?;
    let frame_nr0 = header.frame_number();
    let sec0 = header.seconds_since_epoch();

    // Skip past any repeats of the starting frame number (the scan may
    // begin mid-second).
    while header.frame_number() == frame_nr0 {
        reader.seek(SeekFrom::Current(header.payload_size_bytes() as i64))?;
        header = next_header::<H, R>(reader)?;
    }

    let mut max_frame = frame_nr0;
    while header.frame_number() > 0 {
        max_frame = max_frame.max(header.frame_number());
        reader.seek(SeekFrom::Current(header.payload_size_bytes() as i64))?;
        header = next_header::<H, R>(reader)?;
    }

    if header.seconds_since_epoch() != sec0 + 1 {
        warn!(
            start_second = sec0,
            wrap_second = header.seconds_since_epoch(),
            "header seconds moved by more than one across a frame-number wrap; \
             the stream may have a gap"
        );
    }

    Ok(max_frame + 1)
}

fn next_header<H, R>(reader: &mut R) -> Result<H>
where
    H: FrameHeader,
    R: Read + Seek,
{
    match H::parse(reader) {
        Err(BasebandError::TruncatedRead { .. }) => {
            Err(BasebandError::InsufficientDataForRateDetection)
        }
        Err(BasebandError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(BasebandError::InsufficientDataForRateDetection)
        }
        other => other,
    }
}

//! Sample-stream access to a recording: seek, tell, read, write.
//!
//! A [`StreamReader`] presents the concatenated frame payloads of a file as
//! one seekable sample stream with time-addressable offsets. When the
//! sample rate is not supplied it is inferred by scanning frame headers for
//! a frame-number wrap. A [`StreamWriter`] runs the same machinery in
//! reverse and guarantees every file it closes is frame-aligned.
//!
//! Offsets are always counted in canonical (unsqueezed) samples; squeezing
//! only changes the shape of the arrays handed to or taken from the caller.
//!
//! Stream objects are single-threaded: offset state and the lazily cached
//! end-of-file values are mutated without synchronization.

use std::io::{Read, Seek, SeekFrom, Write};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

use crate::file::{FileReader, FileWriter};
use crate::frame::Frame;
use crate::header::FrameHeader;
use crate::payload::{Payload, SampleArray};
use crate::shape::{SampleShape, SqueezedShape};
use crate::time::{unix_timestamp, StreamOffsetModel};
use crate::{BasebandError, Result};

/// Options accepted when opening a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    /// Complete samples per second. When `None`, a reader infers the rate
    /// by scanning frame headers.
    pub sample_rate: Option<f64>,
    /// Whether returned (and accepted) arrays have unit dimensions removed.
    pub squeeze: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            sample_rate: None,
            squeeze: true,
        }
    }
}

/// What a seek offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

/// A seek destination: a sample count, an elapsed duration, or an absolute
/// time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    Sample(i64),
    Duration(TimeDelta),
    Time(DateTime<Utc>),
}

impl From<i64> for SeekTarget {
    fn from(samples: i64) -> Self {
        Self::Sample(samples)
    }
}

impl From<TimeDelta> for SeekTarget {
    fn from(duration: TimeDelta) -> Self {
        Self::Duration(duration)
    }
}

impl From<DateTime<Utc>> for SeekTarget {
    fn from(time: DateTime<Utc>) -> Self {
        Self::Time(time)
    }
}

/// Sample geometry shared by the reader and writer.
#[derive(Debug, Clone)]
struct StreamLayout {
    bps: u32,
    complex: bool,
    sample_shape: SampleShape,
    squeezed: SqueezedShape,
    squeeze: bool,
    samples_per_frame: usize,
}

impl StreamLayout {
    fn new(
        header0: &impl FrameHeader,
        bps: u32,
        sample_shape: SampleShape,
        complex: bool,
        squeeze: bool,
    ) -> Result<Self> {
        let components = if complex { 2 } else { 1 };
        let bpfs = bps as u64 * components * sample_shape.sample_size() as u64;
        let payload_bits = header0.payload_size_bytes() as u64 * 8;
        if bpfs == 0 || !payload_bits.is_multiple_of(bpfs) {
            return Err(BasebandError::MalformedBuffer {
                reason: format!(
                    "payload of {payload_bits} bits does not hold whole {bpfs}-bit samples"
                ),
            });
        }
        let squeezed = sample_shape.squeeze();
        Ok(Self {
            bps,
            complex,
            sample_shape,
            squeezed,
            squeeze,
            samples_per_frame: (payload_bits / bpfs) as usize,
        })
    }

    /// Canonical array shape for `n` samples.
    fn data_shape(&self, n: usize) -> Vec<usize> {
        let mut shape = vec![n];
        shape.extend(self.sample_shape.sizes());
        shape
    }

    /// Squeeze the canonical array if squeezing is enabled.
    fn maybe_squeeze(&self, data: SampleArray) -> Result<SampleArray> {
        if self.squeeze {
            let collapsed = self.squeezed.collapse_data_shape(data.shape());
            data.reshaped(&collapsed)
        } else {
            Ok(data)
        }
    }
}

/// Reads a recording as a seekable stream of samples.
#[derive(Debug)]
pub struct StreamReader<H: FrameHeader, R: Read + Seek> {
    fh: FileReader<H, R>,
    header0: H,
    layout: StreamLayout,
    model: StreamOffsetModel,
    data_start: u64,
    offset: i64,
    /// Decoded payload of the most recently visited frame.
    cache: Option<(i64, SampleArray)>,
    last_header: Option<H>,
    stop_time: Option<DateTime<Utc>>,
    size: Option<i64>,
}

impl<H: FrameHeader, R: Read + Seek> StreamReader<H, R> {
    /// Open a stream over an already-open handle positioned at the first
    /// frame.
    pub fn new(
        inner: R,
        bps: u32,
        sample_shape: SampleShape,
        complex: bool,
        options: StreamOptions,
    ) -> Result<Self> {
        let mut fh = FileReader::new(inner);
        let data_start = fh.stream_position()?;
        let header0: H = fh.read_header()?;
        fh.seek(SeekFrom::Start(data_start))?;

        let layout = StreamLayout::new(&header0, bps, sample_shape, complex, options.squeeze)?;
        let sample_rate = match options.sample_rate {
            Some(rate) => rate,
            None => fh.detect_frame_rate()? as f64 * layout.samples_per_frame as f64,
        };

        let epoch_model =
            StreamOffsetModel::new(sample_rate, unix_timestamp(header0.seconds_since_epoch())?)?;
        let start_time = epoch_model
            .time_at(header0.frame_number() as i64 * layout.samples_per_frame as i64);
        let model = StreamOffsetModel::new(sample_rate, start_time)?;

        Ok(Self {
            fh,
            header0,
            layout,
            model,
            data_start,
            offset: 0,
            cache: None,
            last_header: None,
            stop_time: None,
            size: None,
        })
    }

    /// The first header of the file.
    pub fn header0(&self) -> &H {
        &self.header0
    }

    pub fn bps(&self) -> u32 {
        self.layout.bps
    }

    pub fn is_complex(&self) -> bool {
        self.layout.complex
    }

    /// The canonical (unsqueezed) sample shape.
    pub fn sample_shape(&self) -> &SampleShape {
        &self.layout.sample_shape
    }

    pub fn samples_per_frame(&self) -> usize {
        self.layout.samples_per_frame
    }

    /// Complete samples per second.
    pub fn sample_rate(&self) -> f64 {
        self.model.sample_rate()
    }

    /// Time of the first sample.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.model.start_time()
    }

    /// Current offset, in canonical samples.
    pub fn tell(&self) -> i64 {
        self.offset
    }

    /// Elapsed time from the first sample to the current offset.
    pub fn elapsed(&self) -> TimeDelta {
        self.model.duration_at(self.offset)
    }

    /// Absolute time of the current offset.
    pub fn time(&self) -> DateTime<Utc> {
        self.model.time_at(self.offset)
    }

    /// Change the stream position, in samples.
    ///
    /// A [`SeekTarget::Time`] is converted to an offset and measured from
    /// the start regardless of `whence`. No bounds are enforced here; a
    /// position outside the file only fails once it is read from.
    pub fn seek(&mut self, target: impl Into<SeekTarget>, whence: Whence) -> Result<i64> {
        let (delta, whence) = match target.into() {
            SeekTarget::Sample(n) => (n, whence),
            SeekTarget::Duration(d) => (self.model.offset_for(d), whence),
            SeekTarget::Time(t) => (self.model.offset_at(t), Whence::Start),
        };
        self.offset = match whence {
            Whence::Start => delta,
            Whence::Current => self.offset + delta,
            Whence::End => self.size()? + delta,
        };
        Ok(self.offset)
    }

    /// The last valid header of the file, located on first use.
    pub fn last_header(&mut self) -> Result<H> {
        if self.last_header.is_none() {
            let header = self
                .fh
                .find_last_header(self.header0.frame_size_bytes())?;
            self.last_header = Some(header);
        }
        match &self.last_header {
            Some(h) => Ok(h.clone()),
            None => unreachable!(),
        }
    }

    /// Time just after the last sample, computed once and cached.
    pub fn stop_time(&mut self) -> Result<DateTime<Utc>> {
        if let Some(t) = self.stop_time {
            return Ok(t);
        }
        let last = self.last_header()?;
        let t = self.header_time(&last)
            + self.model.duration_at(self.layout.samples_per_frame as i64);
        self.stop_time = Some(t);
        Ok(t)
    }

    /// Total number of samples in the file, computed once and cached.
    pub fn size(&mut self) -> Result<i64> {
        if let Some(n) = self.size {
            return Ok(n);
        }
        let stop = self.stop_time()?;
        let n = self.model.offset_at(stop);
        self.size = Some(n);
        Ok(n)
    }

    /// Absolute time of a header's first sample.
    fn header_time(&self, header: &H) -> DateTime<Utc> {
        match unix_timestamp(header.seconds_since_epoch()) {
            Ok(t) => {
                t + self
                    .model
                    .duration_at(header.frame_number() as i64 * self.layout.samples_per_frame as i64)
            }
            // Header seconds validated when the stream was opened.
            Err(_) => self.model.start_time(),
        }
    }

    /// Read up to `count` samples from the current offset into one
    /// contiguous array, advancing the offset by the number returned.
    ///
    /// Returns fewer than `count` samples at the end of the file, and an
    /// empty array once the stream is exhausted.
    pub fn read(&mut self, count: usize) -> Result<SampleArray> {
        let size = self.size()?;
        if self.offset < 0 {
            return Err(BasebandError::IndexOutOfRange {
                index: self.offset,
                len: size.max(0) as usize,
            });
        }
        let remaining = (size - self.offset).max(0) as usize;
        let count = count.min(remaining);

        let spf = self.layout.samples_per_frame;
        let mut out = SampleArray::zeros(&self.layout.data_shape(count), self.layout.complex);
        let mut filled = 0usize;
        while filled < count {
            let sample = self.offset + filled as i64;
            let frame_idx = sample / spf as i64;
            let within = (sample % spf as i64) as usize;
            let take = (spf - within).min(count - filled);
            let data = self.frame_data(frame_idx)?;
            out.assign_samples(filled..filled + take, data, within..within + take)?;
            filled += take;
        }

        self.offset += count as i64;
        self.layout.maybe_squeeze(out)
    }

    /// Decode (or fetch from cache) the payload of frame `frame_idx`.
    fn frame_data(&mut self, frame_idx: i64) -> Result<&SampleArray> {
        let hit = matches!(&self.cache, Some((idx, _)) if *idx == frame_idx);
        if !hit {
            let frame_size = self.header0.frame_size_bytes() as u64;
            let pos = self.data_start + frame_idx as u64 * frame_size;
            self.fh.seek(SeekFrom::Start(pos))?;
            let frame = self.fh.read_frame(
                self.layout.bps,
                self.layout.sample_shape.clone(),
                self.layout.complex,
            )?;
            self.cache = Some((frame_idx, frame.decode_all()));
        }
        match &self.cache {
            Some((_, data)) => Ok(data),
            None => unreachable!(),
        }
    }

    /// Give back the underlying handle.
    pub fn into_inner(self) -> R {
        self.fh.into_inner()
    }
}

/// Writes samples as successive frames.
///
/// Closing (explicitly or on drop) pads any trailing partial frame with
/// zero-valued samples marked as invalid data, so the persisted file is
/// always a whole number of frames.
#[derive(Debug)]
pub struct StreamWriter<H: FrameHeader, W: Write> {
    fh: FileWriter<H, W>,
    header0: H,
    layout: StreamLayout,
    frames_per_second: u64,
    offset: i64,
    /// Frame under construction, canonical shape.
    current: SampleArray,
    closed: bool,
}

impl<H: FrameHeader, W: Write> StreamWriter<H, W> {
    /// Open a writer over an already-open handle.
    ///
    /// `header0` is the template for the first frame; its frame number and
    /// seconds stamp the start of the stream. The sample rate must be
    /// explicit — there are no frames to scan yet.
    pub fn new(
        inner: W,
        header0: H,
        bps: u32,
        sample_shape: SampleShape,
        complex: bool,
        sample_rate: f64,
        squeeze: bool,
    ) -> Result<Self> {
        let layout = StreamLayout::new(&header0, bps, sample_shape, complex, squeeze)?;
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(BasebandError::InvalidSampleRate { rate: sample_rate });
        }
        let frames_per_second = (sample_rate / layout.samples_per_frame as f64).round() as u64;
        if frames_per_second == 0 {
            return Err(BasebandError::InvalidSampleRate { rate: sample_rate });
        }
        let current = SampleArray::zeros(
            &layout.data_shape(layout.samples_per_frame),
            layout.complex,
        );
        Ok(Self {
            fh: FileWriter::new(inner),
            header0,
            layout,
            frames_per_second,
            offset: 0,
            current,
            closed: false,
        })
    }

    pub fn samples_per_frame(&self) -> usize {
        self.layout.samples_per_frame
    }

    /// Current offset, in canonical samples.
    pub fn tell(&self) -> i64 {
        self.offset
    }

    /// Append samples.
    ///
    /// The array's trailing dimensions must match the stream's sample
    /// shape — squeezed when squeezing is enabled, canonical otherwise.
    pub fn write(&mut self, data: &SampleArray) -> Result<()> {
        if data.is_complex() != self.layout.complex {
            return Err(BasebandError::DataMismatch {
                reason: "cannot mix real and complex sample data".into(),
            });
        }
        let expected: Vec<usize> = if self.layout.squeeze {
            self.layout.squeezed.sizes()
        } else {
            self.layout.sample_shape.sizes()
        };
        if data.shape().len() != expected.len() + 1 || data.shape()[1..] != expected[..] {
            return Err(BasebandError::DataMismatch {
                reason: format!(
                    "expected sample dimensions {:?}, got {:?}",
                    expected,
                    &data.shape().get(1..).unwrap_or(&[])
                ),
            });
        }

        if self.layout.squeeze {
            let full = self.layout.squeezed.expand_data_shape(data.shape());
            let canonical = data.clone().reshaped(&full)?;
            self.write_canonical(&canonical, true)
        } else {
            self.write_canonical(data, true)
        }
    }

    fn write_canonical(&mut self, data: &SampleArray, valid: bool) -> Result<()> {
        let spf = self.layout.samples_per_frame;
        let n = data.sample_count();
        let mut written = 0usize;
        while written < n {
            let within = (self.offset % spf as i64) as usize;
            let take = (spf - within).min(n - written);
            self.current
                .assign_samples(within..within + take, data, written..written + take)?;
            self.offset += take as i64;
            written += take;
            if within + take == spf {
                self.flush_frame(valid)?;
            }
        }
        Ok(())
    }

    /// Encode and emit the completed frame under construction.
    fn flush_frame(&mut self, valid: bool) -> Result<()> {
        let payload = Payload::from_data(&self.current, self.layout.bps)?;
        let frame_index = self.offset / self.layout.samples_per_frame as i64 - 1;
        let abs_frame = self.header0.frame_number() as u64 + frame_index as u64;
        let seconds =
            self.header0.seconds_since_epoch() + abs_frame / self.frames_per_second;
        let frame_nr = (abs_frame % self.frames_per_second) as u32;
        let mut header = self.header0.with_time(seconds, frame_nr);
        header.set_valid(valid);
        self.fh.write_frame(&Frame { header, payload })
    }

    /// Flush any trailing partial frame (zero-padded, marked invalid) and
    /// the underlying handle.
    ///
    /// Idempotent; called automatically on drop.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let spf = self.layout.samples_per_frame;
        let extra = (self.offset % spf as i64) as usize;
        if extra != 0 {
            warn!(
                padding = spf - extra,
                "closing with a partial frame remaining; writing a padded frame marked invalid"
            );
            let pad =
                SampleArray::zeros(&self.layout.data_shape(spf - extra), self.layout.complex);
            self.write_canonical(&pad, false)?;
        }
        self.fh.flush()?;
        self.closed = true;
        Ok(())
    }
}

impl<H: FrameHeader, W: Write> Drop for StreamWriter<H, W> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                tracing::error!(error = %e, "failed to flush stream writer on drop");
            }
        }
    }
}

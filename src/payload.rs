//! Frame payloads: word buffers with enough metadata to decode them.
//!
//! A [`Payload`] owns the packed 32-bit words of one frame plus the bits per
//! sample, sample shape, and complex flag needed to interpret them. Random
//! access by sample index or range decodes only the words covering the
//! request; in-place partial writes re-encode only the covering word range,
//! so bits outside the addressed samples are never disturbed.

use std::io::{Read, Write};

use ndarray::{ArrayD, IxDyn, SliceInfoElem};
use num_complex::Complex32;

use crate::codec::{BitCodec, CodecRegistry, BITS_PER_WORD};
use crate::shape::SampleShape;
use crate::{BasebandError, Result};

/// Decoded sample data: a dynamic-dimension array of real or complex values.
///
/// The leading axis is the sample axis; trailing axes follow the sample
/// shape.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleArray {
    Real(ArrayD<f32>),
    Complex(ArrayD<Complex32>),
}

impl SampleArray {
    /// An all-zero array of the given shape.
    pub fn zeros(shape: &[usize], complex: bool) -> Self {
        if complex {
            Self::Complex(ArrayD::zeros(IxDyn(shape)))
        } else {
            Self::Real(ArrayD::zeros(IxDyn(shape)))
        }
    }

    /// Build a real array from flat values and a shape.
    pub fn from_real(values: Vec<f32>, shape: &[usize]) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(Self::Real)
            .map_err(|e| BasebandError::DataMismatch {
                reason: e.to_string(),
            })
    }

    /// Build a complex array from flat values and a shape.
    pub fn from_complex(values: Vec<Complex32>, shape: &[usize]) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(Self::Complex)
            .map_err(|e| BasebandError::DataMismatch {
                reason: e.to_string(),
            })
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Real(a) => a.shape(),
            Self::Complex(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Length of the leading (sample) axis; 0 for a zero-dimensional array.
    pub fn sample_count(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Real(a) => a.len(),
            Self::Complex(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten to interleaved real components (re, im, re, im, ... for
    /// complex data), in row-major order.
    pub fn components(&self) -> Vec<f32> {
        match self {
            Self::Real(a) => a.iter().copied().collect(),
            Self::Complex(a) => a.iter().flat_map(|c| [c.re, c.im]).collect(),
        }
    }

    /// Return the same data with a new shape (element count must match).
    pub fn reshaped(self, shape: &[usize]) -> Result<Self> {
        let map_err = |e: ndarray::ShapeError| BasebandError::DataMismatch {
            reason: e.to_string(),
        };
        match self {
            Self::Real(a) => a
                .into_shape_with_order(IxDyn(shape))
                .map(Self::Real)
                .map_err(map_err),
            Self::Complex(a) => a
                .into_shape_with_order(IxDyn(shape))
                .map(Self::Complex)
                .map_err(map_err),
        }
    }

    /// Copy the samples `src[src_range]` into `self[dst_range]` along the
    /// sample axis. Both arrays must have the same dtype and trailing shape.
    pub(crate) fn assign_samples(
        &mut self,
        dst_range: std::ops::Range<usize>,
        src: &SampleArray,
        src_range: std::ops::Range<usize>,
    ) -> Result<()> {
        use ndarray::{Axis, Slice};
        match (self, src) {
            (Self::Real(dst), Self::Real(src)) => {
                dst.slice_axis_mut(Axis(0), Slice::from(dst_range))
                    .assign(&src.slice_axis(Axis(0), Slice::from(src_range)));
                Ok(())
            }
            (Self::Complex(dst), Self::Complex(src)) => {
                dst.slice_axis_mut(Axis(0), Slice::from(dst_range))
                    .assign(&src.slice_axis(Axis(0), Slice::from(src_range)));
                Ok(())
            }
            _ => Err(BasebandError::DataMismatch {
                reason: "cannot mix real and complex sample data".into(),
            }),
        }
    }
}

/// Selection along one axis: a single index or a start/stop/step range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Select {
    /// One index; negative values count from the end.
    At(i64),
    /// A half-open range with step; `None` bounds mean "from the start" /
    /// "to the end". Negative bounds count from the end; the step must be
    /// positive.
    Range {
        start: Option<i64>,
        stop: Option<i64>,
        step: i64,
    },
}

impl Select {
    /// Everything along the axis.
    pub fn all() -> Self {
        Self::Range {
            start: None,
            stop: None,
            step: 1,
        }
    }
}

impl From<i64> for Select {
    fn from(index: i64) -> Self {
        Self::At(index)
    }
}

impl From<std::ops::Range<i64>> for Select {
    fn from(r: std::ops::Range<i64>) -> Self {
        Self::Range {
            start: Some(r.start),
            stop: Some(r.end),
            step: 1,
        }
    }
}

impl From<std::ops::RangeFull> for Select {
    fn from(_: std::ops::RangeFull) -> Self {
        Self::all()
    }
}

/// A sample-axis selection with optional trailing per-dimension selections,
/// the equivalent of `payload[a:b:s, i, j]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    sample: Select,
    axes: Vec<Select>,
}

impl Selector {
    /// Select every sample.
    pub fn all() -> Self {
        Self {
            sample: Select::all(),
            axes: Vec::new(),
        }
    }

    /// Select a single sample (negative counts from the end).
    pub fn at(index: i64) -> Self {
        Self {
            sample: Select::At(index),
            axes: Vec::new(),
        }
    }

    /// Select a contiguous sample range.
    pub fn samples(range: std::ops::Range<i64>) -> Self {
        Self {
            sample: range.into(),
            axes: Vec::new(),
        }
    }

    /// Apply a step to the sample range.
    pub fn step_by(mut self, step: i64) -> Self {
        if let Select::Range { step: s, .. } = &mut self.sample {
            *s = step;
        }
        self
    }

    /// Append a selection for the next sample-shape dimension.
    pub fn axis(mut self, sel: impl Into<Select>) -> Self {
        self.axes.push(sel.into());
        self
    }
}

impl From<Select> for Selector {
    fn from(sample: Select) -> Self {
        Self {
            sample,
            axes: Vec::new(),
        }
    }
}

impl From<i64> for Selector {
    fn from(index: i64) -> Self {
        Select::At(index).into()
    }
}

impl From<std::ops::Range<i64>> for Selector {
    fn from(range: std::ops::Range<i64>) -> Self {
        Select::from(range).into()
    }
}

impl From<std::ops::RangeFull> for Selector {
    fn from(_: std::ops::RangeFull) -> Self {
        Select::all().into()
    }
}

/// Resolved sample-axis selection relative to a decoded word range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataSlice {
    /// Take a single sample, removing the sample axis.
    Index(usize),
    /// Take `start..stop` with `step`.
    Slice {
        start: usize,
        stop: usize,
        step: usize,
    },
}

/// Resolved selection: the words to decode and what to take from them.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedSlices {
    words: std::ops::Range<usize>,
    data: DataSlice,
}

/// The packed words of one frame, with decode metadata.
#[derive(Debug, Clone)]
pub struct Payload {
    words: Vec<u32>,
    bps: u32,
    sample_shape: SampleShape,
    complex: bool,
    codec: BitCodec,
    /// Bits per full sample: all components of all dimensions.
    bpfs: u32,
}

impl Payload {
    /// Wrap a word buffer, using the standard codec table.
    ///
    /// Fails fast when no codec covers `bps`, when neither of the
    /// full-sample size and the word width divides the other, or when the
    /// buffer does not hold a whole number of samples.
    pub fn new(words: Vec<u32>, bps: u32, sample_shape: SampleShape, complex: bool) -> Result<Self> {
        Self::with_registry(words, bps, sample_shape, complex, CodecRegistry::standard())
    }

    /// Wrap a word buffer, resolving the codec from an explicit registry.
    pub fn with_registry(
        words: Vec<u32>,
        bps: u32,
        sample_shape: SampleShape,
        complex: bool,
        registry: &CodecRegistry,
    ) -> Result<Self> {
        let codec = *registry.get(bps)?;
        let components = if complex { 2 } else { 1 };
        let bpfs = bps * components * sample_shape.sample_size() as u32;
        if !bpfs.is_multiple_of(BITS_PER_WORD) && !BITS_PER_WORD.is_multiple_of(bpfs) {
            return Err(BasebandError::UnsupportedLayout {
                bits_per_sample: bpfs,
                bits_per_word: BITS_PER_WORD,
            });
        }
        let total_bits = words.len() as u64 * BITS_PER_WORD as u64;
        if !total_bits.is_multiple_of(bpfs as u64) {
            return Err(BasebandError::MalformedBuffer {
                reason: format!(
                    "{total_bits} buffer bits do not hold a whole number of {bpfs}-bit samples"
                ),
            });
        }
        Ok(Self {
            words,
            bps,
            sample_shape,
            complex,
            codec,
            bpfs,
        })
    }

    /// Read `nbytes` of packed little-endian words from `reader`.
    pub fn from_reader<R: Read>(
        reader: &mut R,
        nbytes: usize,
        bps: u32,
        sample_shape: SampleShape,
        complex: bool,
    ) -> Result<Self> {
        if !nbytes.is_multiple_of(4) {
            return Err(BasebandError::MalformedBuffer {
                reason: format!("payload size {nbytes} is not a multiple of the 4-byte word"),
            });
        }
        let mut buf = vec![0u8; nbytes];
        read_full(reader, &mut buf)?;
        let words = buf
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Self::new(words, bps, sample_shape, complex)
    }

    /// Encode a sample array into a new payload.
    ///
    /// The trailing dimensions of `data` become the sample shape; the dtype
    /// sets the complex flag. The data must fill a whole number of words.
    pub fn from_data(data: &SampleArray, bps: u32) -> Result<Self> {
        let sample_shape = SampleShape::new(&data.shape()[1..])?;
        let complex = data.is_complex();
        let codec = *CodecRegistry::standard().get(bps)?;
        let words = codec.encode(&data.components())?;
        Self::new(words, bps, sample_shape, complex)
    }

    /// Write the packed words little-endian.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for word in &self.words {
            writer.write_all(&word.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Payload size in bytes.
    pub fn nbytes(&self) -> usize {
        self.words.len() * 4
    }

    pub fn bps(&self) -> u32 {
        self.bps
    }

    pub fn is_complex(&self) -> bool {
        self.complex
    }

    pub fn sample_shape(&self) -> &SampleShape {
        &self.sample_shape
    }

    /// Bits per full sample (all components of all dimensions).
    pub fn bits_per_full_sample(&self) -> u32 {
        self.bpfs
    }

    /// Number of complete samples in the buffer.
    pub fn sample_count(&self) -> usize {
        (self.words.len() as u64 * BITS_PER_WORD as u64 / self.bpfs as u64) as usize
    }

    /// Shape of the fully decoded array: `(sample_count, dims...)`.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = vec![self.sample_count()];
        shape.extend(self.sample_shape.sizes());
        shape
    }

    /// Decode the entire buffer.
    pub fn decode_all(&self) -> SampleArray {
        self.decode_words(&self.words)
            .reshaped(&self.shape())
            .expect("decoded length matches payload shape")
    }

    fn decode_words(&self, words: &[u32]) -> SampleArray {
        let components = self.codec.decode(words);
        if self.complex {
            let values: Vec<Complex32> = components
                .chunks_exact(2)
                .map(|p| Complex32::new(p[0], p[1]))
                .collect();
            let len = values.len();
            SampleArray::Complex(
                ArrayD::from_shape_vec(IxDyn(&[len]), values).expect("component count matches"),
            )
        } else {
            let len = components.len();
            SampleArray::Real(
                ArrayD::from_shape_vec(IxDyn(&[len]), components).expect("component count matches"),
            )
        }
    }

    /// Map a sample-axis selection to the word range that must be decoded
    /// and the slice of the decoded result that yields the request.
    fn item_to_slices(&self, sel: &Select) -> Result<ResolvedSlices> {
        let nsample = self.sample_count();
        let (start, stop, step, is_index) = match *sel {
            Select::At(index) => {
                let resolved = if index < 0 {
                    index + nsample as i64
                } else {
                    index
                };
                if resolved < 0 || resolved >= nsample as i64 {
                    return Err(BasebandError::IndexOutOfRange {
                        index,
                        len: nsample,
                    });
                }
                (resolved as usize, resolved as usize + 1, 1, true)
            }
            Select::Range { start, stop, step } => {
                if step < 1 {
                    return Err(BasebandError::InvalidSelector {
                        reason: format!("step must be positive, got {step}"),
                    });
                }
                let resolve = |bound: Option<i64>, default: usize| -> usize {
                    match bound {
                        None => default,
                        Some(b) => {
                            let b = if b < 0 { b + nsample as i64 } else { b };
                            b.clamp(0, nsample as i64) as usize
                        }
                    }
                };
                let start = resolve(start, 0);
                let stop = resolve(stop, nsample).max(start);
                (start, stop, step as usize, false)
            }
        };

        let n = stop - start;
        if n == nsample {
            // Whole buffer; nothing to narrow.
            return Ok(ResolvedSlices {
                words: 0..self.words.len(),
                data: if is_index {
                    DataSlice::Index(0)
                } else {
                    DataSlice::Slice { start: 0, stop: n, step }
                },
            });
        }

        let bpw = BITS_PER_WORD;
        let bpfs = self.bpfs;
        if bpfs.is_multiple_of(bpw) {
            // Each full sample spans one or more whole words.
            let wpfs = (bpfs / bpw) as usize;
            Ok(ResolvedSlices {
                words: start * wpfs..stop * wpfs,
                data: if is_index {
                    DataSlice::Index(0)
                } else {
                    DataSlice::Slice { start: 0, stop: n, step }
                },
            })
        } else if bpw.is_multiple_of(bpfs) {
            // Multiple samples are packed into each word.
            let fspw = (bpw / bpfs) as usize;
            let (w_start, o_start) = (start / fspw, start % fspw);
            let (w_stop, o_stop) = (stop / fspw, stop % fspw);
            Ok(ResolvedSlices {
                words: w_start..if o_stop != 0 { w_stop + 1 } else { w_stop },
                data: if is_index {
                    DataSlice::Index(o_start)
                } else {
                    DataSlice::Slice {
                        start: o_start,
                        stop: o_start + n,
                        step,
                    }
                },
            })
        } else {
            // Ruled out at construction; kept as a guard.
            Err(BasebandError::UnsupportedLayout {
                bits_per_sample: bpfs,
                bits_per_word: bpw,
            })
        }
    }

    /// Resolve a trailing axis selection against a dimension size.
    fn resolve_axis(sel: &Select, len: usize) -> Result<SliceInfoElem> {
        match *sel {
            Select::At(index) => {
                let resolved = if index < 0 { index + len as i64 } else { index };
                if resolved < 0 || resolved >= len as i64 {
                    return Err(BasebandError::IndexOutOfRange { index, len });
                }
                Ok(SliceInfoElem::Index(resolved as isize))
            }
            Select::Range { start, stop, step } => {
                if step < 1 {
                    return Err(BasebandError::InvalidSelector {
                        reason: format!("step must be positive, got {step}"),
                    });
                }
                let resolve = |bound: Option<i64>, default: usize| -> isize {
                    match bound {
                        None => default as isize,
                        Some(b) => {
                            let b = if b < 0 { b + len as i64 } else { b };
                            b.clamp(0, len as i64) as isize
                        }
                    }
                };
                Ok(SliceInfoElem::Slice {
                    start: resolve(start, 0),
                    end: Some(resolve(stop, len)),
                    step: step as isize,
                })
            }
        }
    }

    /// Decode the samples addressed by `sel`, touching only the words that
    /// cover them.
    pub fn get(&self, sel: impl Into<Selector>) -> Result<SampleArray> {
        let sel = sel.into();
        let resolved = self.item_to_slices(&sel.sample)?;
        if sel.axes.len() > self.sample_shape.ndim() {
            return Err(BasebandError::InvalidSelector {
                reason: format!(
                    "{} trailing selectors for {} sample dimensions",
                    sel.axes.len(),
                    self.sample_shape.ndim()
                ),
            });
        }

        let decoded = self.decode_range(&resolved.words);
        let ndim = decoded.ndim();
        let mut info: Vec<SliceInfoElem> = Vec::with_capacity(ndim);
        info.push(match resolved.data {
            DataSlice::Index(i) => SliceInfoElem::Index(i as isize),
            DataSlice::Slice { start, stop, step } => SliceInfoElem::Slice {
                start: start as isize,
                end: Some(stop as isize),
                step: step as isize,
            },
        });
        for (sel, &len) in sel.axes.iter().zip(self.sample_shape.sizes().iter()) {
            info.push(Self::resolve_axis(sel, len)?);
        }
        while info.len() < ndim {
            info.push(SliceInfoElem::Slice {
                start: 0,
                end: None,
                step: 1,
            });
        }

        Ok(match decoded {
            SampleArray::Real(a) => SampleArray::Real(a.slice(info.as_slice()).to_owned()),
            SampleArray::Complex(a) => SampleArray::Complex(a.slice(info.as_slice()).to_owned()),
        })
    }

    /// Decode `words[range]` and shape it as `(-1, dims...)`.
    fn decode_range(&self, range: &std::ops::Range<usize>) -> SampleArray {
        let words = &self.words[range.clone()];
        let decoded = self.decode_words(words);
        let n = decoded.len() / self.sample_shape.sample_size();
        let mut shape = vec![n];
        shape.extend(self.sample_shape.sizes());
        decoded
            .reshaped(&shape)
            .expect("decoded length is a whole number of samples")
    }

    /// Overwrite the samples addressed by `sel` with `values`.
    ///
    /// When the assignment exactly covers whole words with matching shape
    /// and dtype, the values are encoded directly over the word range.
    /// Otherwise the covering words are decoded, modified, re-encoded, and
    /// written back, so samples outside the selection are preserved.
    pub fn set(&mut self, sel: impl Into<Selector>, values: &SampleArray) -> Result<()> {
        let sel = sel.into();
        if values.is_complex() != self.complex {
            return Err(BasebandError::DataMismatch {
                reason: "cannot mix real and complex sample data".into(),
            });
        }
        let resolved = self.item_to_slices(&sel.sample)?;

        let covers_whole_words = sel.axes.is_empty()
            && matches!(
                resolved.data,
                DataSlice::Slice { start: 0, stop, step: 1 }
                    if stop * self.sample_shape.sample_size()
                        == self.decoded_len(&resolved.words)
            );
        let mut expected_shape =
            vec![self.decoded_len(&resolved.words) / self.sample_shape.sample_size()];
        expected_shape.extend(self.sample_shape.sizes());

        let encoded = if covers_whole_words && values.shape() == expected_shape.as_slice() {
            // Fast path: no decode needed.
            self.codec.encode(&values.components())?
        } else {
            let mut current = self.decode_range(&resolved.words);
            let ndim = current.ndim();
            let mut info: Vec<SliceInfoElem> = Vec::with_capacity(ndim);
            info.push(match resolved.data {
                DataSlice::Index(i) => SliceInfoElem::Index(i as isize),
                DataSlice::Slice { start, stop, step } => SliceInfoElem::Slice {
                    start: start as isize,
                    end: Some(stop as isize),
                    step: step as isize,
                },
            });
            for (sel, &len) in sel.axes.iter().zip(self.sample_shape.sizes().iter()) {
                info.push(Self::resolve_axis(sel, len)?);
            }
            while info.len() < ndim {
                info.push(SliceInfoElem::Slice {
                    start: 0,
                    end: None,
                    step: 1,
                });
            }
            match (&mut current, values) {
                (SampleArray::Real(cur), SampleArray::Real(vals)) => {
                    let mut target = cur.slice_mut(info.as_slice());
                    if target.shape() != vals.shape() {
                        return Err(BasebandError::DataMismatch {
                            reason: format!(
                                "cannot assign shape {:?} into a selection of shape {:?}",
                                vals.shape(),
                                target.shape()
                            ),
                        });
                    }
                    target.assign(vals);
                }
                (SampleArray::Complex(cur), SampleArray::Complex(vals)) => {
                    let mut target = cur.slice_mut(info.as_slice());
                    if target.shape() != vals.shape() {
                        return Err(BasebandError::DataMismatch {
                            reason: format!(
                                "cannot assign shape {:?} into a selection of shape {:?}",
                                vals.shape(),
                                target.shape()
                            ),
                        });
                    }
                    target.assign(vals);
                }
                _ => unreachable!("dtype checked above"),
            }
            self.codec.encode(&current.components())?
        };

        self.words[resolved.words].copy_from_slice(&encoded);
        Ok(())
    }

    fn decoded_len(&self, range: &std::ops::Range<usize>) -> usize {
        let components = range.len() * self.codec.components_per_word();
        if self.complex {
            components / 2
        } else {
            components
        }
    }
}

impl PartialEq for Payload {
    /// Payloads are equal when they decode identically: same shape, same
    /// dtype, bit-identical words.
    fn eq(&self, other: &Self) -> bool {
        self.bps == other.bps
            && self.complex == other.complex
            && self.sample_shape == other.sample_shape
            && (std::ptr::eq(self.words.as_ptr(), other.words.as_ptr())
                && self.words.len() == other.words.len()
                || self.words == other.words)
    }
}

/// Fill `buf` from `reader`, reporting how far it got on a short read.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(BasebandError::TruncatedRead {
                    expected: buf.len(),
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

//! Pure Rust codec and stream layer for bit-packed baseband recordings.
//!
//! Radio-telescope baseband formats store samples as small bit fields
//! packed into 32-bit little-endian words, chunked into frames of
//! header + payload. This crate provides the two parts that take real
//! design work: the payload codec (encode/decode at 1, 2, 4, or 8 bits per
//! sample, real or complex, with sub-buffer random access) and the stream
//! engine (time-addressable seek/tell, frame-rate auto-detection,
//! end-of-file discovery, writer padding on close). Concrete header
//! layouts stay outside, behind the [`FrameHeader`] trait.
//!
//! # Coding and slicing a payload
//!
//! ```
//! use baseband_rs::{Payload, SampleArray, Selector};
//!
//! // 32 scalar samples on the 2-bit quantizer levels {-3, -1, 1, 3}.
//! let values: Vec<f32> = (0..32).map(|i| if i % 2 == 0 { 1.0 } else { -3.0 }).collect();
//! let data = SampleArray::from_real(values, &[32]).unwrap();
//!
//! let payload = Payload::from_data(&data, 2).unwrap();
//! assert_eq!(payload.sample_count(), 32);
//! assert_eq!(payload.nbytes(), 8);
//! assert_eq!(payload.decode_all(), data);
//!
//! // Random access decodes only the words covering the request.
//! let tail = payload.get(Selector::samples(24..32)).unwrap();
//! assert_eq!(tail.sample_count(), 8);
//! ```
//!
//! # In-place partial writes
//!
//! ```
//! use baseband_rs::{Payload, SampleArray, Selector};
//!
//! let data = SampleArray::from_real(vec![1.0; 16], &[16]).unwrap();
//! let mut payload = Payload::from_data(&data, 4).unwrap();
//!
//! // Overwrite two samples mid-word; the neighbours are untouched.
//! let patch = SampleArray::from_real(vec![-7.0, 7.0], &[2]).unwrap();
//! payload.set(Selector::samples(5..7), &patch).unwrap();
//!
//! let decoded = payload.decode_all();
//! assert_eq!(decoded.shape(), &[16]);
//! ```
//!
//! # Time addressing
//!
//! ```
//! use baseband_rs::{unix_timestamp, StreamOffsetModel};
//! use chrono::TimeDelta;
//!
//! let start = unix_timestamp(1_600_000_000).unwrap();
//! let model = StreamOffsetModel::new(32_000.0, start).unwrap();
//!
//! assert_eq!(model.offset_for(TimeDelta::seconds(2)), 64_000);
//! assert_eq!(model.time_at(16_000), start + TimeDelta::milliseconds(500));
//! ```
//!
//! Reading a recording goes through [`StreamReader`] (or [`Opener`] for
//! path-based opens): it parses the first header, infers the sample rate
//! from a frame-number wrap when one is not given, and then serves
//! arbitrary sample ranges, reassembled across frame boundaries.

pub mod codec;
pub mod detect;
pub mod error;
pub mod file;
pub mod frame;
pub mod header;
pub mod open;
pub mod payload;
pub mod shape;
pub mod stream;
pub mod time;

pub use codec::{BitCodec, CodecRegistry, BITS_PER_WORD};
pub use detect::detect_frame_rate;
pub use error::{BasebandError, Result};
pub use file::{FileReader, FileWriter};
pub use frame::Frame;
pub use header::FrameHeader;
pub use open::{FormatSpec, Mode, Opened, Opener};
pub use payload::{Payload, SampleArray, Select, Selector};
pub use shape::{Dim, SampleShape, SqueezedShape};
pub use stream::{SeekTarget, StreamOptions, StreamReader, StreamWriter, Whence};
pub use time::{unix_timestamp, StreamOffsetModel};

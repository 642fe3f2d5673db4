//! Opening recordings by path and mode string.
//!
//! The mode combines a direction with an access level, as in `"rb"` /
//! `"wb"` (binary: whole frames) and `"rs"` / `"ws"` (stream: samples).
//! Binary modes accept no stream configuration. For already-open handles,
//! use the reader and writer constructors directly — the opener only owns
//! the path-based case, where the file it opened is closed again (by drop)
//! if construction fails.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::str::FromStr;

use crate::file::{FileReader, FileWriter};
use crate::header::FrameHeader;
use crate::shape::SampleShape;
use crate::stream::{StreamOptions, StreamReader, StreamWriter};
use crate::{BasebandError, Result};

/// Direction and access level of an open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Read whole frames (`"rb"`).
    BinaryRead,
    /// Write whole frames (`"wb"`).
    BinaryWrite,
    /// Read samples (`"rs"`).
    StreamRead,
    /// Write samples (`"ws"`).
    StreamWrite,
}

impl Mode {
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::StreamRead | Self::StreamWrite)
    }
}

impl FromStr for Mode {
    type Err = BasebandError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rb" => Ok(Self::BinaryRead),
            "wb" => Ok(Self::BinaryWrite),
            "rs" => Ok(Self::StreamRead),
            "ws" => Ok(Self::StreamWrite),
            other => Err(BasebandError::InvalidMode {
                reason: format!("unrecognized mode {other:?}; expected \"rb\", \"wb\", \"rs\", or \"ws\""),
            }),
        }
    }
}

/// The sample geometry of a format: how payload bits map to samples.
#[derive(Debug, Clone)]
pub struct FormatSpec {
    pub bps: u32,
    pub sample_shape: SampleShape,
    pub complex: bool,
}

/// What an open produced, depending on the mode.
#[derive(Debug)]
pub enum Opened<H: FrameHeader> {
    BinaryRead(FileReader<H, File>),
    BinaryWrite(FileWriter<H, File>),
    StreamRead(StreamReader<H, File>),
    StreamWrite(StreamWriter<H, File>),
}

/// Mode-dispatching opener for one format.
#[derive(Debug, Clone)]
pub struct Opener<H: FrameHeader> {
    spec: FormatSpec,
    options: StreamOptions,
    template: Option<H>,
}

impl<H: FrameHeader> Opener<H> {
    pub fn new(spec: FormatSpec) -> Self {
        Self {
            spec,
            options: StreamOptions::default(),
            template: None,
        }
    }

    /// Set an explicit sample rate (stream modes only).
    pub fn sample_rate(mut self, rate: f64) -> Self {
        self.options.sample_rate = Some(rate);
        self
    }

    /// Enable or disable squeezing (stream modes only; default on).
    pub fn squeeze(mut self, squeeze: bool) -> Self {
        self.options.squeeze = squeeze;
        self
    }

    /// Header template stamping the start of a written stream
    /// (stream write mode only).
    pub fn template(mut self, header: H) -> Self {
        self.template = Some(header);
        self
    }

    /// Open `path` in the given mode.
    pub fn open(&self, path: impl AsRef<Path>, mode: &str) -> Result<Opened<H>> {
        let mode: Mode = mode.parse()?;
        if !mode.is_stream()
            && (self.options != StreamOptions::default() || self.template.is_some())
        {
            return Err(BasebandError::InvalidMode {
                reason: "binary modes accept no stream configuration".into(),
            });
        }

        match mode {
            Mode::BinaryRead => Ok(Opened::BinaryRead(FileReader::new(File::open(path)?))),
            Mode::BinaryWrite => Ok(Opened::BinaryWrite(FileWriter::new(create(path)?))),
            Mode::StreamRead => {
                let file = File::open(path)?;
                // If construction fails, dropping `file` closes it before
                // the error propagates.
                let reader = StreamReader::new(
                    file,
                    self.spec.bps,
                    self.spec.sample_shape.clone(),
                    self.spec.complex,
                    self.options.clone(),
                )?;
                Ok(Opened::StreamRead(reader))
            }
            Mode::StreamWrite => {
                let template = self.template.clone().ok_or(BasebandError::InvalidMode {
                    reason: "stream write mode requires a header template".into(),
                })?;
                let sample_rate =
                    self.options.sample_rate.ok_or(BasebandError::InvalidMode {
                        reason: "stream write mode requires an explicit sample rate".into(),
                    })?;
                let file = create(path)?;
                let writer = StreamWriter::new(
                    file,
                    template,
                    self.spec.bps,
                    self.spec.sample_shape.clone(),
                    self.spec.complex,
                    sample_rate,
                    self.options.squeeze,
                )?;
                Ok(Opened::StreamWrite(writer))
            }
        }
    }
}

fn create(path: impl AsRef<Path>) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}

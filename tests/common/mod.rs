//! A minimal concrete format for end-to-end tests, built only on the
//! public trait surface.

use std::io::{Read, Write};

use baseband_rs::{BasebandError, FrameHeader, Result};

pub const MAGIC: u32 = 0x4442_4631; // "DBF1"
pub const HEADER_SIZE: usize = 16;

/// 16-byte little-endian header: magic, integer seconds, frame number,
/// payload length, flags (bit 0 = invalid data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoHeader {
    pub magic: u32,
    pub seconds: u32,
    pub frame_nr: u32,
    pub payload_bytes: u16,
    pub flags: u16,
}

impl DemoHeader {
    pub fn new(seconds: u32, frame_nr: u32, payload_bytes: u16) -> Self {
        Self {
            magic: MAGIC,
            seconds,
            frame_nr,
            payload_bytes,
            flags: 0,
        }
    }
}

impl FrameHeader for DemoHeader {
    fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                BasebandError::TruncatedRead {
                    expected: HEADER_SIZE,
                    actual: 0,
                }
            } else {
                e.into()
            }
        })?;
        Ok(Self {
            magic: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            seconds: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            frame_nr: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            payload_bytes: u16::from_le_bytes(buf[12..14].try_into().unwrap()),
            flags: u16::from_le_bytes(buf[14..16].try_into().unwrap()),
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.magic.to_le_bytes())?;
        writer.write_all(&self.seconds.to_le_bytes())?;
        writer.write_all(&self.frame_nr.to_le_bytes())?;
        writer.write_all(&self.payload_bytes.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        Ok(())
    }

    fn frame_number(&self) -> u32 {
        self.frame_nr
    }

    fn seconds_since_epoch(&self) -> u64 {
        self.seconds as u64
    }

    fn payload_size_bytes(&self) -> usize {
        self.payload_bytes as usize
    }

    fn frame_size_bytes(&self) -> usize {
        HEADER_SIZE + self.payload_bytes as usize
    }

    fn verify(&self) -> bool {
        self.magic == MAGIC
    }

    fn is_valid(&self) -> bool {
        self.verify() && self.flags & 0x1 == 0
    }

    fn with_time(&self, seconds_since_epoch: u64, frame_number: u32) -> Self {
        Self {
            seconds: seconds_since_epoch as u32,
            frame_nr: frame_number,
            ..self.clone()
        }
    }

    fn set_valid(&mut self, valid: bool) {
        if valid {
            self.flags &= !0x1;
        } else {
            self.flags |= 0x1;
        }
    }
}

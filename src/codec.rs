//! Bit-packed sample coding at 1, 2, 4, and 8 bits per sample.
//!
//! Samples are stored as unsigned codes packed least-significant-bit first
//! into little-endian 32-bit words. A code `c` at `bps` bits represents the
//! level `2*c + 1 - 2^bps`, giving the symmetric odd-level ladders used by
//! baseband recorders (e.g. `{-3, -1, +1, +3}` at 2 bits). Encoding rounds
//! to the nearest level and clamps, so every representable level round-trips
//! exactly.
//!
//! The codec is shape-agnostic: it converts between flat component buffers
//! and words. Sample shapes and complex interleaving are applied by the
//! payload layer.

use std::sync::OnceLock;

use crate::{BasebandError, Result};

/// Width in bits of the canonical storage word.
pub const BITS_PER_WORD: u32 = 32;

/// Decoded value of the code `c` at `bps` bits.
#[inline]
fn level(code: u32, bps: u32) -> f32 {
    (2 * code as i32 + 1 - (1i32 << bps)) as f32
}

/// Nearest code for the value `x` at `bps` bits, clamped to the code range.
#[inline]
fn quantize(x: f32, bps: u32) -> u32 {
    let max_code = (1u32 << bps) - 1;
    let c = (x + max_code as f32) / 2.0;
    (c.round().clamp(0.0, max_code as f32)) as u32
}

fn lut_1bit() -> &'static [[f32; 8]; 256] {
    static LUT: OnceLock<[[f32; 8]; 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        let mut table = [[0.0f32; 8]; 256];
        for (byte, row) in table.iter_mut().enumerate() {
            for (bit, value) in row.iter_mut().enumerate() {
                *value = level((byte as u32 >> bit) & 0x1, 1);
            }
        }
        table
    })
}

fn lut_2bit() -> &'static [[f32; 4]; 256] {
    static LUT: OnceLock<[[f32; 4]; 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        let mut table = [[0.0f32; 4]; 256];
        for (byte, row) in table.iter_mut().enumerate() {
            for (pos, value) in row.iter_mut().enumerate() {
                *value = level((byte as u32 >> (pos * 2)) & 0x3, 2);
            }
        }
        table
    })
}

fn lut_4bit() -> &'static [[f32; 2]; 256] {
    static LUT: OnceLock<[[f32; 2]; 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        let mut table = [[0.0f32; 2]; 256];
        for (byte, row) in table.iter_mut().enumerate() {
            row[0] = level(byte as u32 & 0xF, 4);
            row[1] = level((byte as u32 >> 4) & 0xF, 4);
        }
        table
    })
}

fn decode_1bit(words: &[u32]) -> Vec<f32> {
    let lut = lut_1bit();
    let mut out = Vec::with_capacity(words.len() * 32);
    for word in words {
        for byte in word.to_le_bytes() {
            out.extend_from_slice(&lut[byte as usize]);
        }
    }
    out
}

fn decode_2bit(words: &[u32]) -> Vec<f32> {
    let lut = lut_2bit();
    let mut out = Vec::with_capacity(words.len() * 16);
    for word in words {
        for byte in word.to_le_bytes() {
            out.extend_from_slice(&lut[byte as usize]);
        }
    }
    out
}

fn decode_4bit(words: &[u32]) -> Vec<f32> {
    let lut = lut_4bit();
    let mut out = Vec::with_capacity(words.len() * 8);
    for word in words {
        for byte in word.to_le_bytes() {
            out.extend_from_slice(&lut[byte as usize]);
        }
    }
    out
}

fn decode_8bit(words: &[u32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(words.len() * 4);
    for word in words {
        for byte in word.to_le_bytes() {
            out.push(level(byte as u32, 8));
        }
    }
    out
}

fn encode_packed(data: &[f32], bps: u32) -> Result<Vec<u32>> {
    let per_word = (BITS_PER_WORD / bps) as usize;
    if !data.len().is_multiple_of(per_word) {
        return Err(BasebandError::MalformedBuffer {
            reason: format!(
                "{} components at {bps} bits do not fill whole {BITS_PER_WORD}-bit words",
                data.len()
            ),
        });
    }
    Ok(data
        .chunks_exact(per_word)
        .map(|chunk| {
            let mut word = 0u32;
            for (i, &x) in chunk.iter().enumerate() {
                word |= quantize(x, bps) << (i as u32 * bps);
            }
            word
        })
        .collect())
}

fn encode_1bit(data: &[f32]) -> Result<Vec<u32>> {
    encode_packed(data, 1)
}

fn encode_2bit(data: &[f32]) -> Result<Vec<u32>> {
    encode_packed(data, 2)
}

fn encode_4bit(data: &[f32]) -> Result<Vec<u32>> {
    encode_packed(data, 4)
}

fn encode_8bit(data: &[f32]) -> Result<Vec<u32>> {
    encode_packed(data, 8)
}

/// An encode/decode function pair for one bits-per-sample value.
#[derive(Clone, Copy)]
pub struct BitCodec {
    pub bps: u32,
    decode: fn(&[u32]) -> Vec<f32>,
    encode: fn(&[f32]) -> Result<Vec<u32>>,
}

impl BitCodec {
    /// Pair an encode and a decode function for one bit width.
    pub fn new(
        bps: u32,
        decode: fn(&[u32]) -> Vec<f32>,
        encode: fn(&[f32]) -> Result<Vec<u32>>,
    ) -> Self {
        Self { bps, decode, encode }
    }

    /// Decode packed words into sample components.
    pub fn decode(&self, words: &[u32]) -> Vec<f32> {
        (self.decode)(words)
    }

    /// Encode sample components into packed words.
    ///
    /// The component count must fill whole words.
    pub fn encode(&self, data: &[f32]) -> Result<Vec<u32>> {
        (self.encode)(data)
    }

    /// Components stored per 32-bit word.
    pub fn components_per_word(&self) -> usize {
        (BITS_PER_WORD / self.bps) as usize
    }
}

impl std::fmt::Debug for BitCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitCodec").field("bps", &self.bps).finish()
    }
}

/// Table of codecs keyed by bits per sample, validated when built.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: Vec<BitCodec>,
}

impl CodecRegistry {
    /// Build a registry from explicit codecs.
    ///
    /// Fails if a bps value is zero, does not divide the word width, or is
    /// registered twice.
    pub fn with_codecs(codecs: Vec<BitCodec>) -> Result<Self> {
        for (i, codec) in codecs.iter().enumerate() {
            if codec.bps == 0 || !BITS_PER_WORD.is_multiple_of(codec.bps) {
                return Err(BasebandError::UnsupportedBitWidth { bps: codec.bps });
            }
            if codecs[..i].iter().any(|c| c.bps == codec.bps) {
                return Err(BasebandError::MalformedBuffer {
                    reason: format!("duplicate codec for {} bits per sample", codec.bps),
                });
            }
        }
        Ok(Self { codecs })
    }

    /// The registry covering the standard 1, 2, 4, and 8 bit widths.
    pub fn standard() -> &'static CodecRegistry {
        static REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            CodecRegistry::with_codecs(vec![
                BitCodec {
                    bps: 1,
                    decode: decode_1bit,
                    encode: encode_1bit,
                },
                BitCodec {
                    bps: 2,
                    decode: decode_2bit,
                    encode: encode_2bit,
                },
                BitCodec {
                    bps: 4,
                    decode: decode_4bit,
                    encode: encode_4bit,
                },
                BitCodec {
                    bps: 8,
                    decode: decode_8bit,
                    encode: encode_8bit,
                },
            ])
            .expect("standard codec table is valid")
        })
    }

    /// Look up the codec for `bps`.
    pub fn get(&self, bps: u32) -> Result<&BitCodec> {
        self.codecs
            .iter()
            .find(|c| c.bps == bps)
            .ok_or(BasebandError::UnsupportedBitWidth { bps })
    }

    /// The registered bps values, in registration order.
    pub fn bit_widths(&self) -> Vec<u32> {
        self.codecs.iter().map(|c| c.bps).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shift/mask reference decoder, independent of the lookup tables.
    fn decode_reference(words: &[u32], bps: u32) -> Vec<f32> {
        let per_word = (BITS_PER_WORD / bps) as usize;
        let mask = (1u64 << bps) as u32 - 1;
        let mut out = Vec::with_capacity(words.len() * per_word);
        for &word in words {
            for i in 0..per_word {
                out.push(level((word >> (i as u32 * bps)) & mask, bps));
            }
        }
        out
    }

    #[test]
    fn test_levels_are_symmetric_odd() {
        assert_eq!(level(0, 2), -3.0);
        assert_eq!(level(1, 2), -1.0);
        assert_eq!(level(2, 2), 1.0);
        assert_eq!(level(3, 2), 3.0);
        assert_eq!(level(0, 1), -1.0);
        assert_eq!(level(1, 1), 1.0);
        assert_eq!(level(255, 8), 255.0);
    }

    #[test]
    fn test_lut_decode_matches_reference_all_bytes() {
        // Every byte value, at every supported width.
        let words: Vec<u32> = (0..256u32)
            .map(|b| b | (b << 8) | (b << 16) | (b << 24))
            .collect();
        for bps in [1, 2, 4, 8] {
            let codec = CodecRegistry::standard().get(bps).unwrap();
            assert_eq!(
                codec.decode(&words),
                decode_reference(&words, bps),
                "bps={bps}"
            );
        }
    }

    #[test]
    fn test_roundtrip_all_levels() {
        for bps in [1u32, 2, 4, 8] {
            let codec = CodecRegistry::standard().get(bps).unwrap();
            let per_word = codec.components_per_word();
            let n_codes = 1usize << bps;
            // All representable levels, padded to whole words.
            let mut data: Vec<f32> = (0..n_codes).map(|c| level(c as u32, bps)).collect();
            while !data.len().is_multiple_of(per_word) {
                data.push(level(0, bps));
            }
            let words = codec.encode(&data).unwrap();
            assert_eq!(codec.decode(&words), data, "bps={bps}");
        }
    }

    #[test]
    fn test_encode_clamps_out_of_range() {
        let codec = CodecRegistry::standard().get(2).unwrap();
        let data = vec![100.0, -100.0, 0.4, -0.4, 100.0, -100.0, 0.4, -0.4, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let words = codec.encode(&data).unwrap();
        let decoded = codec.decode(&words);
        assert_eq!(&decoded[..4], &[3.0, -3.0, 1.0, -1.0]);
    }

    #[test]
    fn test_encode_rejects_partial_word() {
        let codec = CodecRegistry::standard().get(2).unwrap();
        assert!(codec.encode(&[1.0; 15]).is_err());
    }

    #[test]
    fn test_unknown_bps_rejected() {
        let err = CodecRegistry::standard().get(3).unwrap_err();
        assert!(matches!(
            err,
            BasebandError::UnsupportedBitWidth { bps: 3 }
        ));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let codec = *CodecRegistry::standard().get(2).unwrap();
        assert!(CodecRegistry::with_codecs(vec![codec, codec]).is_err());
    }

    #[test]
    fn test_lsb_first_word_order() {
        // Code 1 (level -1) in the lowest two bits, code 3 (level +3)
        // in the next two: word = 0b1101.
        let codec = CodecRegistry::standard().get(2).unwrap();
        let decoded = codec.decode(&[0b1101]);
        assert_eq!(decoded[0], -1.0);
        assert_eq!(decoded[1], 3.0);
    }
}

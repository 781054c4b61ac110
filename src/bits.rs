//! Bit-level codec for the compact song string.
//!
//! Fields are packed MSB-first into a bit list, and the list is then spelled
//! out six bits per character in a URL-safe base64 alphabet. Small unbounded
//! integers use a "long tail" code: a unary prefix picks how many remainder
//! bits follow, so common small values stay short.

use crate::error::SongError;

pub const BASE64_INT_TO_CHAR: &[u8; 64] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_";

/// Marks bytes that are not part of the alphabet.
pub const INVALID_BASE64: u8 = 0xff;

/// Reverse lookup for [`BASE64_INT_TO_CHAR`]. `'.'` also decodes to 62, for
/// strings written before `'-'` took its place.
pub const BASE64_CHAR_TO_INT: [u8; 128] = {
    let mut table = [INVALID_BASE64; 128];
    let mut i = 0;
    while i < 64 {
        table[BASE64_INT_TO_CHAR[i] as usize] = i as u8;
        i += 1;
    }
    table[b'.' as usize] = 62;
    table
};

/// Decode one base64 symbol; invalid symbols read as 0.
#[inline]
pub fn base64_value(byte: u8) -> usize {
    match BASE64_CHAR_TO_INT.get(byte as usize) {
        Some(&v) if v != INVALID_BASE64 => v as usize,
        _ => 0,
    }
}

/// Append-only bit list.
#[derive(Debug, Clone, Default)]
pub struct BitFieldWriter {
    bits: Vec<bool>,
}

impl BitFieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the low `bit_count` bits of `value`, most significant first.
    pub fn write(&mut self, bit_count: u32, value: u32) {
        for shift in (0..bit_count).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
    }

    pub fn write_long_tail(&mut self, min: i64, min_bits: u32, value: i64) -> Result<(), SongError> {
        if value < min {
            return Err(SongError::LongTailUnderflow { value, min });
        }
        let mut value = (value - min) as u64;
        let mut num_bits = min_bits;
        while value >= 1u64 << num_bits {
            self.bits.push(true);
            value -= 1u64 << num_bits;
            num_bits += 1;
        }
        self.bits.push(false);
        for shift in (0..num_bits).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
        Ok(())
    }

    pub fn write_part_duration(&mut self, value: i64) -> Result<(), SongError> {
        self.write_long_tail(1, 2, value)
    }

    pub fn write_pin_count(&mut self, value: i64) -> Result<(), SongError> {
        self.write_long_tail(1, 0, value)
    }

    /// Sign bit (set for negative) followed by the magnitude.
    pub fn write_pitch_interval(&mut self, value: i64) -> Result<(), SongError> {
        if value < 0 {
            self.write(1, 1);
            self.write_long_tail(1, 3, -value)
        } else {
            self.write(1, 0);
            self.write_long_tail(1, 3, value)
        }
    }

    pub fn concat(&mut self, other: &BitFieldWriter) {
        self.bits.extend_from_slice(&other.bits);
    }

    pub fn clear(&mut self) {
        self.bits.clear();
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Characters [`encode_base64`](Self::encode_base64) will append.
    pub fn length_base64(&self) -> usize {
        self.bits.len().div_ceil(6)
    }

    /// Append the bits as base64 symbols, zero-padding the last one.
    pub fn encode_base64(&self, out: &mut Vec<u8>) {
        for chunk in self.bits.chunks(6) {
            let mut value = 0usize;
            for i in 0..6 {
                value <<= 1;
                if chunk.get(i).copied().unwrap_or(false) {
                    value |= 1;
                }
            }
            out.push(BASE64_INT_TO_CHAR[value]);
        }
    }

    /// The raw bits as a `0`/`1` string; handy as a map key.
    pub fn to_bit_string(&self) -> String {
        self.bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
    }
}

/// Sequential reader over a base64 substring.
///
/// Reading past the end yields zero bits, so truncated input decodes to
/// small default values instead of failing.
#[derive(Debug, Clone)]
pub struct BitFieldReader {
    bits: Vec<bool>,
    read_index: usize,
}

impl BitFieldReader {
    pub fn new(lookup: &[u8; 128], source: &[u8], start: usize, stop: usize) -> Self {
        let stop = stop.min(source.len());
        let start = start.min(stop);
        let mut bits = Vec::with_capacity((stop - start) * 6);
        for &byte in &source[start..stop] {
            let value = match lookup.get(byte as usize) {
                Some(&v) if v != INVALID_BASE64 => v,
                _ => 0,
            };
            for shift in (0..6).rev() {
                bits.push((value >> shift) & 1 == 1);
            }
        }
        Self { bits, read_index: 0 }
    }

    #[inline]
    fn next_bit(&mut self) -> bool {
        let bit = self.bits.get(self.read_index).copied().unwrap_or(false);
        self.read_index += 1;
        bit
    }

    pub fn read(&mut self, bit_count: u32) -> u32 {
        let mut result = 0u32;
        for _ in 0..bit_count {
            result = (result << 1) | self.next_bit() as u32;
        }
        result
    }

    pub fn read_long_tail(&mut self, min: i64, min_bits: u32) -> i64 {
        let mut result = min;
        let mut num_bits = min_bits;
        while num_bits < 31 && self.next_bit() {
            result += 1i64 << num_bits;
            num_bits += 1;
        }
        if num_bits > 0 {
            result += self.read(num_bits) as i64;
        }
        result
    }

    pub fn read_part_duration(&mut self) -> i64 {
        self.read_long_tail(1, 2)
    }

    pub fn read_pin_count(&mut self) -> i64 {
        self.read_long_tail(1, 0)
    }

    pub fn read_pitch_interval(&mut self) -> i64 {
        if self.read(1) == 1 {
            -self.read_long_tail(1, 3)
        } else {
            self.read_long_tail(1, 3)
        }
    }

    pub fn remaining(&self) -> usize {
        self.bits.len().saturating_sub(self.read_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_for(writer: &BitFieldWriter) -> BitFieldReader {
        let mut encoded = Vec::new();
        writer.encode_base64(&mut encoded);
        BitFieldReader::new(&BASE64_CHAR_TO_INT, &encoded, 0, encoded.len())
    }

    #[test]
    fn alphabet_round_trips() {
        for (i, &c) in BASE64_INT_TO_CHAR.iter().enumerate() {
            assert_eq!(base64_value(c), i);
        }
        assert_eq!(base64_value(b'.'), 62);
        assert_eq!(base64_value(b'!'), 0);
        assert_eq!(base64_value(200), 0);
    }

    #[test]
    fn fixed_width_fields_are_msb_first() {
        let mut w = BitFieldWriter::new();
        w.write(6, 0b100001);
        let mut out = Vec::new();
        w.encode_base64(&mut out);
        assert_eq!(out, vec![BASE64_INT_TO_CHAR[33]]);
    }

    #[test]
    fn last_symbol_is_zero_padded() {
        let mut w = BitFieldWriter::new();
        w.write(2, 0b11);
        assert_eq!(w.length_base64(), 1);
        let mut out = Vec::new();
        w.encode_base64(&mut out);
        assert_eq!(out, vec![BASE64_INT_TO_CHAR[0b110000]]);
    }

    #[test]
    fn long_tail_inverse_law() {
        let cases: &[(i64, u32)] = &[(0, 0), (1, 0), (1, 2), (1, 3), (3, 5)];
        for &(min, min_bits) in cases {
            let mut w = BitFieldWriter::new();
            for value in min..min + 300 {
                w.write_long_tail(min, min_bits, value).unwrap();
            }
            let mut r = reader_for(&w);
            for value in min..min + 300 {
                assert_eq!(r.read_long_tail(min, min_bits), value, "min {min} bits {min_bits}");
            }
        }
    }

    #[test]
    fn long_tail_known_encoding() {
        // 1 with min 1 and 2 min bits is a zero prefix plus two zero bits.
        let mut w = BitFieldWriter::new();
        w.write_part_duration(1).unwrap();
        assert_eq!(w.to_bit_string(), "000");
        w.clear();
        w.write_part_duration(5).unwrap();
        assert_eq!(w.to_bit_string(), "10000");
    }

    #[test]
    fn long_tail_rejects_values_below_minimum() {
        let mut w = BitFieldWriter::new();
        let err = w.write_pin_count(0).unwrap_err();
        assert!(matches!(err, SongError::LongTailUnderflow { value: 0, min: 1 }));
    }

    #[test]
    fn pitch_intervals_carry_sign() {
        let mut w = BitFieldWriter::new();
        for v in [1i64, -1, 7, -13, 40] {
            w.write_pitch_interval(v).unwrap();
        }
        let mut r = reader_for(&w);
        for v in [1i64, -1, 7, -13, 40] {
            assert_eq!(r.read_pitch_interval(), v);
        }
    }

    #[test]
    fn concatenation_preserves_order() {
        let mut a = BitFieldWriter::new();
        a.write(3, 0b101);
        let mut b = BitFieldWriter::new();
        b.write(3, 0b011);
        a.concat(&b);
        assert_eq!(a.to_bit_string(), "101011");
    }

    #[test]
    fn reads_past_the_end_are_zero() {
        let mut r = BitFieldReader::new(&BASE64_CHAR_TO_INT, b"_", 0, 1);
        assert_eq!(r.read(6), 63);
        assert_eq!(r.read(6), 0);
        assert_eq!(r.read_part_duration(), 1);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn reader_honours_substring_bounds() {
        let src = b"xx_yy";
        let mut r = BitFieldReader::new(&BASE64_CHAR_TO_INT, src, 2, 3);
        assert_eq!(r.read(6), 63);
        assert_eq!(r.remaining(), 0);
        let empty = BitFieldReader::new(&BASE64_CHAR_TO_INT, src, 9, 12);
        assert_eq!(empty.remaining(), 0);
    }
}

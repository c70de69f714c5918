//! Low-level wire helpers shared by the section and column encoders.

use byteorder::{BigEndian, ByteOrder};

/// Append a protocol VarInt (7 bits per byte, little-endian groups).
pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        let mut temp = (value & 0b0111_1111) as u8;
        value >>= 7;
        if value != 0 {
            temp |= 0b1000_0000;
        }
        buf.push(temp);
        if value == 0 {
            break;
        }
    }
}

/// Pack `values` at `bits` bits each into `word_count` 64-bit words.
///
/// Value `i` starts at bit `(i * bits) % 64` of word `(i * bits) / 64`. A value
/// that straddles a word boundary keeps its low bits in the earlier word and
/// spills its high bits into the start of the next one.
pub fn pack_words(values: impl Iterator<Item = u64>, bits: u8, word_count: usize) -> Vec<u64> {
    let bits = bits as usize;
    let mask = (1u64 << bits) - 1;
    let mut words = vec![0u64; word_count];

    for (i, value) in values.enumerate() {
        let value = value & mask;
        let bit = i * bits;
        let word = bit / 64;
        let offset = bit % 64;

        words[word] |= value << offset;
        if offset + bits > 64 {
            words[word + 1] |= value >> (64 - offset);
        }
    }
    words
}

/// Append `words` as big-endian longs.
pub fn write_words(buf: &mut Vec<u8>, words: &[u64]) {
    let start = buf.len();
    buf.resize(start + words.len() * 8, 0);
    BigEndian::write_u64_into(words, &mut buf[start..]);
}

/// Append one byte per pair of nibbles; the first of each pair goes in the high nibble.
pub fn write_nibble_pairs(buf: &mut Vec<u8>, nibbles: impl Iterator<Item = u8>) {
    let mut high: Option<u8> = None;
    for n in nibbles {
        match high.take() {
            None => high = Some(n & 0xF),
            Some(h) => buf.push((h << 4) | (n & 0xF)),
        }
    }
    if let Some(h) = high {
        buf.push(h << 4);
    }
}

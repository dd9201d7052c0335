//! Packed bit buffers, LSB-first within each byte.
//!
//! Bit `i` lives in byte `i / 8` at position `i % 8`. Every buffer handed to
//! the codec (information words, masks, codewords, decisions) uses this order.

use rand::Rng;
use rand::seq::index::sample;

/// Number of bytes needed to hold `bits` packed bits.
pub const fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(8)
}

#[inline]
pub fn get_bit(buffer: &[u8], index: usize) -> u8 {
    (buffer[index / 8] >> (index % 8)) & 0x01
}

#[inline]
pub fn set_bit(buffer: &mut [u8], index: usize, bit: u8) {
    let byte = &mut buffer[index / 8];
    let shift = index % 8;
    *byte &= !(0x01 << shift);
    *byte |= (bit & 0x01) << shift;
}

/// XORs the first `bit_count` bits of `a` and `b` into a new buffer.
///
/// Bits past `bit_count` in the final byte are left zero.
pub fn xor_bits(a: &[u8], b: &[u8], bit_count: usize) -> Vec<u8> {
    let mut out = vec![0u8; bytes_for_bits(bit_count)];
    let whole = bit_count / 8;
    for (dst, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())).take(whole) {
        *dst = x ^ y;
    }
    for index in whole * 8..bit_count {
        set_bit(&mut out, index, get_bit(a, index) ^ get_bit(b, index));
    }
    out
}

/// Copies bits `start..end` of `buffer` into a new buffer starting at bit 0.
///
/// Returns `None` when the range is reversed or reaches past the buffer.
pub fn copy_bit_range(buffer: &[u8], start: usize, end: usize) -> Option<Vec<u8>> {
    if start > end || end > buffer.len() * 8 {
        return None;
    }
    let mut out = vec![0u8; bytes_for_bits(end - start)];
    for (offset, index) in (start..end).enumerate() {
        set_bit(&mut out, offset, get_bit(buffer, index));
    }
    Some(out)
}

/// Number of set bits among the first `bit_count` bits.
pub fn count_ones(buffer: &[u8], bit_count: usize) -> usize {
    (0..bit_count).filter(|&i| get_bit(buffer, i) == 1).count()
}

/// Flips `count` distinct, uniformly chosen bits among the first `bit_len`.
///
/// Used to emulate a noisy re-measurement of a fingerprint.
pub fn flip_random_bits<R: Rng + ?Sized>(
    buffer: &mut [u8],
    bit_len: usize,
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    let count = count.min(bit_len);
    let mut flipped = sample(rng, bit_len, count).into_vec();
    flipped.sort_unstable();
    for &index in &flipped {
        set_bit(buffer, index, get_bit(buffer, index) ^ 1);
    }
    flipped
}

//! Polar encoder: the Kronecker-power butterfly applied in place on a packed
//! N-bit word.

use log::trace;

use crate::bits::{copy_bit_range, get_bit, set_bit, xor_bits};
use crate::error::PolarError;
use crate::params::PolarParams;

/// Encodes the information positions of `info_word` into an N-bit codeword.
///
/// Only the first N bits of `info_word` are read, and only where `mask` marks
/// an information position; frozen positions enter the transform as zero.
pub fn encode(params: &PolarParams, info_word: &[u8], mask: &[u8]) -> Result<Vec<u8>, PolarError> {
    check_word(params, info_word, "information word")?;
    check_mask(params, mask)?;

    let n = params.code_length();
    let mut work = vec![0u8; params.code_bytes()];
    for index in 0..n {
        if get_bit(mask, index) == 1 {
            set_bit(&mut work, index, get_bit(info_word, index));
        }
    }

    let mut half = 1;
    while half < n {
        for start in (0..n).step_by(2 * half) {
            butterfly(&mut work, start, half);
        }
        trace!("encode stage half={} done", half);
        half *= 2;
    }
    Ok(work)
}

/// `work[start..start+half) ^= work[start+half..start+2*half)`; the upper half
/// is left as it is.
fn butterfly(work: &mut [u8], start: usize, half: usize) {
    let (Some(upper), Some(lower)) = (
        copy_bit_range(work, start, start + half),
        copy_bit_range(work, start + half, start + 2 * half),
    ) else {
        return;
    };
    let combined = xor_bits(&upper, &lower, half);
    for offset in 0..half {
        set_bit(work, start + offset, get_bit(&combined, offset));
    }
}

pub(crate) fn check_word(
    params: &PolarParams,
    word: &[u8],
    context: &'static str,
) -> Result<(), PolarError> {
    if word.len() < params.code_bytes() {
        return Err(PolarError::BufferTooShort {
            context,
            expected: params.code_bytes(),
            found: word.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_mask(params: &PolarParams, mask: &[u8]) -> Result<(), PolarError> {
    if mask.len() != params.code_bytes() {
        return Err(PolarError::MaskLengthMismatch {
            expected: params.code_bytes(),
            found: mask.len(),
        });
    }
    Ok(())
}

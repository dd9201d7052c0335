//! Per-path belief storage and the two combining rules of successive
//! cancellation decoding.
//!
//! A [`BeliefTree`] holds `depth + 1` levels of N log-likelihood ratios and N
//! packed decision bits. Level 0 is the channel level (the received word);
//! level `depth` is the bit level whose decisions form the decoded word. A
//! node `(level, node)` covers the index range
//! `node * 2^(depth - level) .. (node + 1) * 2^(depth - level)` of its level.

use crate::bits::{copy_bit_range, get_bit, set_bit, xor_bits};
use crate::error::PolarError;
use crate::params::PolarParams;

/// Integer LLR in the BPSK domain; positive favours bit 0.
pub type Llr = i32;

/// Maps a bit to the BPSK domain: 0 -> +1, 1 -> -1.
#[inline]
pub fn to_bpsk(bit: u8) -> Llr {
    if bit & 0x01 == 0 { 1 } else { -1 }
}

/// Min-sum approximation of the check-node update ("f").
#[inline]
pub fn min_sum(a: Llr, b: Llr) -> Llr {
    let magnitude = a.abs().min(b.abs());
    if (a < 0) != (b < 0) {
        -magnitude
    } else {
        magnitude
    }
}

/// Variable-node update ("g") given the decided left sibling bit.
#[inline]
pub fn g(a: Llr, b: Llr, decision: u8) -> Llr {
    if decision & 0x01 == 0 { b + a } else { b - a }
}

#[derive(Debug, PartialEq, Eq)]
pub struct BeliefTree {
    code_length: usize,
    depth: usize,
    llrs: Vec<Llr>,
    decisions: Vec<u8>,
}

impl BeliefTree {
    /// Allocates zeroed storage, reporting allocation failure instead of aborting.
    pub fn try_new(params: &PolarParams) -> Result<Self, PolarError> {
        let code_length = params.code_length();
        let depth = params.depth();
        let levels = depth + 1;
        let llrs = try_zeroed::<Llr>(levels * code_length)?;
        let decisions = try_zeroed::<u8>(levels * params.code_bytes())?;
        Ok(Self {
            code_length,
            depth,
            llrs,
            decisions,
        })
    }

    /// Deep copy with the same failure reporting as [`BeliefTree::try_new`].
    pub fn try_clone(&self) -> Result<Self, PolarError> {
        let mut llrs = try_with_capacity::<Llr>(self.llrs.len())?;
        llrs.extend_from_slice(&self.llrs);
        let mut decisions = try_with_capacity::<u8>(self.decisions.len())?;
        decisions.extend_from_slice(&self.decisions);
        Ok(Self {
            code_length: self.code_length,
            depth: self.depth,
            llrs,
            decisions,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Loads the channel level from the first N bits of `received`.
    pub fn seed_channel(&mut self, received: &[u8]) {
        for (index, llr) in self.llrs[..self.code_length].iter_mut().enumerate() {
            *llr = to_bpsk(get_bit(received, index));
        }
    }

    pub fn llr(&self, level: usize, index: usize) -> Llr {
        self.llrs[level * self.code_length + index]
    }

    pub fn decision(&self, level: usize, index: usize) -> u8 {
        get_bit(self.decision_row(level), index)
    }

    pub fn set_decision(&mut self, level: usize, index: usize, bit: u8) {
        let row_bytes = self.code_length / 8;
        let row = &mut self.decisions[level * row_bytes..(level + 1) * row_bytes];
        set_bit(row, index, bit);
    }

    /// "L" step: beliefs for the left child of `(level, node)` via min-sum.
    pub fn propagate_left(&mut self, level: usize, node: usize) {
        let (start, half) = self.span(level, node);
        let n = self.code_length;
        let (upper, lower) = self.llrs.split_at_mut((level + 1) * n);
        let parent = &upper[level * n..];
        let child = &mut lower[..n];
        for j in 0..half {
            child[start + j] = min_sum(parent[start + j], parent[start + half + j]);
        }
    }

    /// "R" step: beliefs for the right child of `(level, node)` via `g`, using
    /// the decisions already taken by the left child.
    pub fn propagate_right(&mut self, level: usize, node: usize) {
        let (start, half) = self.span(level, node);
        let n = self.code_length;
        let row_bytes = n / 8;
        let left_decisions =
            &self.decisions[(level + 1) * row_bytes..(level + 2) * row_bytes];
        let (upper, lower) = self.llrs.split_at_mut((level + 1) * n);
        let parent = &upper[level * n..];
        let child = &mut lower[..n];
        for j in 0..half {
            let decision = get_bit(left_decisions, start + j);
            child[start + half + j] = g(parent[start + j], parent[start + half + j], decision);
        }
    }

    /// "U" step: re-encode the children's decisions into this node's range,
    /// `left ^ right` followed by `right`.
    pub fn combine_up(&mut self, level: usize, node: usize) {
        let (start, half) = self.span(level, node);
        let child_row = self.decision_row(level + 1);
        let (Some(left), Some(right)) = (
            copy_bit_range(child_row, start, start + half),
            copy_bit_range(child_row, start + half, start + 2 * half),
        ) else {
            return;
        };
        let combined = xor_bits(&left, &right, half);
        for j in 0..half {
            self.set_decision(level, start + j, get_bit(&combined, j));
            self.set_decision(level, start + half + j, get_bit(&right, j));
        }
    }

    /// Decisions at the bit level: the decoded word.
    pub fn decoded_word(&self) -> Vec<u8> {
        self.decision_row(self.depth).to_vec()
    }

    fn decision_row(&self, level: usize) -> &[u8] {
        let row_bytes = self.code_length / 8;
        &self.decisions[level * row_bytes..(level + 1) * row_bytes]
    }

    /// Start index and half-width of the range covered by `(level, node)`.
    fn span(&self, level: usize, node: usize) -> (usize, usize) {
        let len = self.code_length >> level;
        (node * len, len / 2)
    }
}

fn try_with_capacity<T>(len: usize) -> Result<Vec<T>, PolarError> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| PolarError::ResourceExhausted {
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    Ok(values)
}

fn try_zeroed<T: Copy + Default>(len: usize) -> Result<Vec<T>, PolarError> {
    let mut values = try_with_capacity(len)?;
    values.resize(len, T::default());
    Ok(values)
}

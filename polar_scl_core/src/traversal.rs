//! Successive cancellation list decoding as an explicit walk over the
//! decoding tree.
//!
//! The walk keeps a cursor `(level, node)` and a per-node state table instead
//! of recursing. An interior node moves through
//! `Untouched -> LeftVisited -> RightVisited -> Done`: the first visit pushes
//! beliefs to the left child, the second to the right child, the third
//! re-encodes the children's decisions and climbs. Leaves are bit decisions,
//! handled by the path pool.

use log::debug;

use crate::bits::get_bit;
use crate::encoder::{check_mask, check_word};
use crate::error::PolarError;
use crate::params::PolarParams;
use crate::pool::{DecodedPath, PathMetric, PathPool, PoolStats};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum NodeState {
    #[default]
    Untouched,
    LeftVisited,
    RightVisited,
    Done,
}

/// One state per interior or leaf node, level by level from the root.
struct NodeStates {
    states: Vec<NodeState>,
}

impl NodeStates {
    fn new(depth: usize) -> Self {
        Self {
            states: vec![NodeState::Untouched; (1 << (depth + 1)) - 1],
        }
    }

    fn index(level: usize, node: usize) -> usize {
        (1 << level) + node - 1
    }

    fn get(&self, level: usize, node: usize) -> NodeState {
        self.states[Self::index(level, node)]
    }

    fn set(&mut self, level: usize, node: usize, state: NodeState) {
        self.states[Self::index(level, node)] = state;
    }
}

/// Everything a decode produced, including pool bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeReport {
    /// One entry per list slot; `None` marks a slot without a surviving path.
    pub paths: Vec<Option<DecodedPath>>,
    pub stats: PoolStats,
    pub information_leaves: usize,
    pub frozen_leaves: usize,
}

impl DecodeReport {
    pub fn into_words(self) -> Vec<Option<Vec<u8>>> {
        self.paths
            .into_iter()
            .map(|path| path.map(|path| path.word))
            .collect()
    }

    pub fn active_paths(&self) -> usize {
        self.paths.iter().filter(|path| path.is_some()).count()
    }

    pub fn best_metric(&self) -> Option<PathMetric> {
        self.paths.iter().flatten().map(|path| path.metric).min()
    }
}

/// Decodes `received` (N bits) under `mask`, returning L slots of candidate
/// information words. Surviving paths occupy the leading slots; the rest
/// are `None`.
pub fn decode(
    params: &PolarParams,
    received: &[u8],
    mask: &[u8],
) -> Result<Vec<Option<Vec<u8>>>, PolarError> {
    decode_with_report(params, received, mask).map(DecodeReport::into_words)
}

/// [`decode`] with path metrics and pool statistics attached.
pub fn decode_with_report(
    params: &PolarParams,
    received: &[u8],
    mask: &[u8],
) -> Result<DecodeReport, PolarError> {
    check_word(params, received, "received word")?;
    check_mask(params, mask)?;

    let mut traversal = SclTraversal::new(params, received)?;
    traversal.run(mask)?;
    let report = traversal.finish();
    debug!(
        "scl decode N={} K={} L={}: {} survivors, best metric {:?}, {} splits, {} duplications, {} prunes",
        params.code_length(),
        params.info_length(),
        params.list_size(),
        report.active_paths(),
        report.best_metric(),
        report.stats.splits,
        report.stats.duplications,
        report.stats.prunes
    );
    Ok(report)
}

struct SclTraversal {
    pool: PathPool,
    states: NodeStates,
    depth: usize,
    information_leaves: usize,
    frozen_leaves: usize,
}

impl SclTraversal {
    fn new(params: &PolarParams, received: &[u8]) -> Result<Self, PolarError> {
        Ok(Self {
            pool: PathPool::create_initial(params, received)?,
            states: NodeStates::new(params.depth()),
            depth: params.depth(),
            information_leaves: 0,
            frozen_leaves: 0,
        })
    }

    fn run(&mut self, mask: &[u8]) -> Result<(), PolarError> {
        let mut level = 0;
        let mut node = 0;
        loop {
            if level == self.depth {
                if get_bit(mask, node) == 1 {
                    self.pool.split_at_information_bit(level, node)?;
                    self.information_leaves += 1;
                } else {
                    self.pool.apply_frozen_bit(level, node);
                    self.frozen_leaves += 1;
                }
                self.states.set(level, node, NodeState::Done);
                node /= 2;
                level -= 1;
                continue;
            }

            match self.states.get(level, node) {
                NodeState::Untouched => {
                    for tree in self.pool.trees_mut() {
                        tree.propagate_left(level, node);
                    }
                    self.states.set(level, node, NodeState::LeftVisited);
                    node *= 2;
                    level += 1;
                }
                NodeState::LeftVisited => {
                    for tree in self.pool.trees_mut() {
                        tree.propagate_right(level, node);
                    }
                    self.states.set(level, node, NodeState::RightVisited);
                    node = 2 * node + 1;
                    level += 1;
                }
                NodeState::RightVisited => {
                    for tree in self.pool.trees_mut() {
                        tree.combine_up(level, node);
                    }
                    self.states.set(level, node, NodeState::Done);
                }
                NodeState::Done => {}
            }

            if self.states.get(level, node) == NodeState::Done {
                if level == 0 {
                    return Ok(());
                }
                node /= 2;
                level -= 1;
            }
        }
    }

    fn finish(self) -> DecodeReport {
        DecodeReport {
            stats: self.pool.stats(),
            paths: self.pool.into_decoded(),
            information_leaves: self.information_leaves,
            frozen_leaves: self.frozen_leaves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;
    use crate::mask::FrozenMask;
    use crate::params::profile_tiny;
    use crate::rng::derive_rng;
    use proptest::prelude::*;
    use rand::Rng;

    const MASK: [u8; 2] = [0x6A, 0x96];
    const CODEWORD: [u8; 2] = [0x42, 0x14];

    fn tiny(list_size: usize) -> PolarParams {
        profile_tiny().with_list_size(list_size).unwrap()
    }

    fn listing(report: &DecodeReport) -> Vec<Option<(String, i32)>> {
        report
            .paths
            .iter()
            .map(|path| path.as_ref().map(|p| (hex::encode(&p.word), p.metric)))
            .collect()
    }

    fn some(word: &str, metric: i32) -> Option<(String, i32)> {
        Some((word.to_string(), metric))
    }

    #[test]
    fn node_state_indexing() {
        assert_eq!(NodeStates::index(0, 0), 0);
        assert_eq!(NodeStates::index(1, 1), 2);
        assert_eq!(NodeStates::index(4, 15), 30);
        assert_eq!(NodeStates::new(4).states.len(), 31);
    }

    #[test]
    fn noiseless_worked_example() {
        let report = decode_with_report(&tiny(4), &CODEWORD, &MASK).unwrap();
        assert_eq!(
            listing(&report),
            vec![
                some("4214", 0),
                some("4014", 2),
                some("6014", 2),
                some("4814", 2)
            ]
        );
        assert_eq!(report.information_leaves, 8);
        assert_eq!(report.frozen_leaves, 8);
        assert_eq!(report.stats.splits, 8);
    }

    #[test]
    fn single_bit_error_is_listed() {
        let mut received = CODEWORD;
        received[0] ^= 0x04;
        let report = decode_with_report(&tiny(4), &received, &MASK).unwrap();
        assert_eq!(
            listing(&report),
            vec![
                some("4814", 1),
                some("4214", 1),
                some("4804", 5),
                some("0010", 7)
            ]
        );
    }

    #[test]
    fn list_of_one_is_successive_cancellation() {
        let mut received = CODEWORD;
        received[0] ^= 0x04;
        let report = decode_with_report(&tiny(1), &received, &MASK).unwrap();
        assert_eq!(listing(&report), vec![some("4814", 1)]);
        let words = decode(&tiny(2), &CODEWORD, &MASK).unwrap();
        assert_eq!(words, vec![Some(vec![0x42, 0x14]), Some(vec![0x40, 0x14])]);
    }

    #[test]
    fn all_frozen_never_branches() {
        let params = PolarParams::new(16, 0, 4).unwrap();
        let report = decode_with_report(&params, &[0x5A, 0x01], &[0x00, 0x00]).unwrap();
        assert_eq!(listing(&report), vec![some("0000", 5), None, None, None]);
        assert_eq!(report.stats.splits, 0);
    }

    #[test]
    fn all_information_recovers_the_transform() {
        let params = PolarParams::new(16, 16, 4).unwrap();
        let received = [0x5A, 0x01];
        let words = decode(&params, &received, &[0xFF, 0xFF]).unwrap();
        let best = words[0].as_ref().unwrap();
        assert_eq!(best, &vec![0x49, 0x01]);
        assert_eq!(encode(&params, best, &[0xFF, 0xFF]).unwrap(), received);
    }

    #[test]
    fn rejects_bad_buffers_before_decoding() {
        let err = decode(&tiny(4), &[0x42], &MASK).unwrap_err();
        assert!(matches!(err, PolarError::BufferTooShort { expected: 2, found: 1, .. }));
        let err = decode(&tiny(4), &CODEWORD, &[0x6A]).unwrap_err();
        assert_eq!(err, PolarError::MaskLengthMismatch { expected: 2, found: 1 });
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn noiseless_codeword_decodes_first(
            seed in any::<u64>(),
            list_size in prop::sample::select(vec![1usize, 2, 4, 8]),
            k in 1usize..=64,
        ) {
            let params = PolarParams::new(64, k, list_size).unwrap();
            let mut rng = derive_rng(b"scl-noiseless", seed);
            let mask = FrozenMask::random(&params, &mut rng);
            let message: Vec<u8> = (0..params.info_bytes()).map(|_| rng.r#gen()).collect();
            let info_word = mask.embed(&message);
            let codeword = encode(&params, &info_word, mask.as_bytes()).unwrap();

            let report = decode_with_report(&params, &codeword, mask.as_bytes()).unwrap();
            let best = report.paths[0].as_ref().unwrap();
            prop_assert_eq!(&best.word, &info_word);
            prop_assert_eq!(best.metric, 0);
        }

        #[test]
        fn pool_stays_bounded_and_frozen_bits_hold(
            seed in any::<u64>(),
            list_size in prop::sample::select(vec![1usize, 2, 4, 8]),
            k in 0usize..=32,
        ) {
            let params = PolarParams::new(32, k, list_size).unwrap();
            let mut rng = derive_rng(b"scl-bounds", seed);
            let mask = FrozenMask::random(&params, &mut rng);
            let received: Vec<u8> = (0..params.code_bytes()).map(|_| rng.r#gen()).collect();

            let report = decode_with_report(&params, &received, mask.as_bytes()).unwrap();
            prop_assert_eq!(report.paths.len(), list_size);
            prop_assert!(report.stats.min_active >= 1);
            prop_assert!(report.stats.max_active <= list_size);
            prop_assert_eq!(report.information_leaves, k);
            let active = report.active_paths();
            for (slot, path) in report.paths.iter().enumerate() {
                prop_assert_eq!(path.is_some(), slot < active);
                if let Some(path) = path {
                    prop_assert_eq!(mask.restrict(&path.word), path.word.clone());
                }
            }
        }
    }
}

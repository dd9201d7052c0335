//! Bounded pool of list-decoder paths.
//!
//! The pool is an arena of L slots, each either empty or owning one path
//! (a [`BeliefTree`] plus its accumulated metric). Duplication clones a path
//! into an empty slot and pruning drops a path and frees its slot, so at most
//! L belief trees are alive at any time.

use log::trace;

use crate::belief::{BeliefTree, Llr};
use crate::error::PolarError;
use crate::params::PolarParams;

/// Accumulated path cost; lower means more likely.
pub type PathMetric = i32;

#[derive(Debug)]
struct DecoderPath {
    tree: BeliefTree,
    metric: PathMetric,
}

/// One hypothesis for an information bit: which path it extends, the bit
/// value, and the metric the path would carry afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub slot: usize,
    pub bit: u8,
    pub metric: PathMetric,
}

/// A surviving path after decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPath {
    pub word: Vec<u8>,
    pub metric: PathMetric,
}

/// Bookkeeping counters gathered while the pool evolves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub splits: usize,
    pub duplications: usize,
    pub prunes: usize,
    pub min_active: usize,
    pub max_active: usize,
}

#[derive(Debug)]
pub struct PathPool {
    slots: Vec<Option<DecoderPath>>,
    stats: PoolStats,
}

impl PathPool {
    /// One path in slot 0 seeded from `received`; every other slot empty.
    pub fn create_initial(params: &PolarParams, received: &[u8]) -> Result<Self, PolarError> {
        let mut tree = BeliefTree::try_new(params)?;
        tree.seed_channel(received);
        let mut slots = Vec::with_capacity(params.list_size());
        slots.push(Some(DecoderPath { tree, metric: 0 }));
        slots.resize_with(params.list_size(), || None);
        Ok(Self {
            slots,
            stats: PoolStats {
                min_active: 1,
                max_active: 1,
                ..PoolStats::default()
            },
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(Option::is_some)
    }

    pub fn metric(&self, slot: usize) -> Option<PathMetric> {
        self.slots.get(slot)?.as_ref().map(|path| path.metric)
    }

    pub fn tree(&self, slot: usize) -> Option<&BeliefTree> {
        self.slots.get(slot)?.as_ref().map(|path| &path.tree)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Mutable access to every live belief tree, in slot order.
    pub fn trees_mut(&mut self) -> impl Iterator<Item = &mut BeliefTree> + '_ {
        self.slots.iter_mut().flatten().map(|path| &mut path.tree)
    }

    /// Deep-copies the path in `slot` into the lowest empty slot.
    pub fn duplicate(&mut self, slot: usize) -> Result<usize, PolarError> {
        let capacity = self.capacity();
        let target = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(PolarError::PoolExhausted { capacity })?;
        let source = self.slots[slot]
            .as_ref()
            .ok_or(PolarError::PoolExhausted { capacity })?;
        let copy = DecoderPath {
            tree: source.tree.try_clone()?,
            metric: source.metric,
        };
        self.slots[target] = Some(copy);
        self.stats.duplications += 1;
        Ok(target)
    }

    pub fn prune(&mut self, slot: usize) {
        if self.slots[slot].take().is_some() {
            self.stats.prunes += 1;
        }
    }

    /// Frozen leaf: every path decides 0 and pays `|llr|` when its belief
    /// pointed at 1.
    pub fn apply_frozen_bit(&mut self, level: usize, node: usize) {
        for path in self.slots.iter_mut().flatten() {
            let llr = path.tree.llr(level, node);
            path.tree.set_decision(level, node, 0);
            if llr < 0 {
                path.metric += llr.abs();
            }
        }
    }

    /// Information leaf: fork every path on both bit values and keep the L
    /// cheapest hypotheses.
    pub fn split_at_information_bit(&mut self, level: usize, node: usize) -> Result<(), PolarError> {
        let before = self.active_count();
        let candidates = self.candidates(level, node);
        let capacity = self.capacity();
        let ranked = rank_candidates(&candidates);
        let kept = ranked.len().min(capacity);

        // Walk the ranking from the worst entry up. Every path losing both
        // hypotheses is pruned before the first survivor is reached, so each
        // duplication below finds the slots freed in this round.
        let mut seen = vec![0u8; capacity];
        for (rank, candidate) in ranked.iter().enumerate().rev() {
            let slot = candidate.slot;
            seen[slot] += 1;
            if rank >= kept {
                if seen[slot] == 2 {
                    self.prune(slot);
                }
            } else if seen[slot] == 1 {
                // Sibling hypothesis ranks higher and survives too.
                let copy = self.duplicate(slot)?;
                self.assign(copy, level, node, candidate);
            } else {
                self.assign(slot, level, node, candidate);
            }
        }

        let after = self.active_count();
        if after > capacity {
            return Err(PolarError::PoolOverflow {
                active: after,
                capacity,
            });
        }
        self.record_split(after);
        trace!(
            "split level={} node={} active {} -> {} (candidates={})",
            level,
            node,
            before,
            after,
            candidates.len()
        );
        Ok(())
    }

    /// Consumes the pool, yielding each slot's bit-level decisions.
    pub fn into_decoded(self) -> Vec<Option<DecodedPath>> {
        self.slots
            .into_iter()
            .map(|slot| {
                slot.map(|path| DecodedPath {
                    word: path.tree.decoded_word(),
                    metric: path.metric,
                })
            })
            .collect()
    }

    /// Preferred hypotheses of every active path in slot order, then the
    /// opposing hypotheses in the same order.
    fn candidates(&self, level: usize, node: usize) -> Vec<Candidate> {
        let active: Vec<(usize, &DecoderPath)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, path)| path.as_ref().map(|path| (slot, path)))
            .collect();
        let mut candidates = Vec::with_capacity(2 * active.len());
        for &(slot, path) in &active {
            let llr = path.tree.llr(level, node);
            candidates.push(Candidate {
                slot,
                bit: preferred_bit(llr),
                metric: path.metric,
            });
        }
        for &(slot, path) in &active {
            let llr = path.tree.llr(level, node);
            candidates.push(Candidate {
                slot,
                bit: preferred_bit(llr) ^ 1,
                metric: path.metric + llr.abs(),
            });
        }
        candidates
    }

    fn assign(&mut self, slot: usize, level: usize, node: usize, candidate: &Candidate) {
        if let Some(path) = self.slots[slot].as_mut() {
            path.tree.set_decision(level, node, candidate.bit);
            path.metric = candidate.metric;
        }
    }

    fn record_split(&mut self, active: usize) {
        self.stats.splits += 1;
        self.stats.min_active = self.stats.min_active.min(active);
        self.stats.max_active = self.stats.max_active.max(active);
    }
}

/// The `min(candidates.len(), capacity)` cheapest candidates, cheapest first;
/// equal metrics keep their input order.
pub fn select_survivors(candidates: &[Candidate], capacity: usize) -> Vec<Candidate> {
    let mut ranked = rank_candidates(candidates);
    ranked.truncate(capacity);
    ranked
}

fn rank_candidates(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut ranked = candidates.to_vec();
    // Stable: equal metrics keep candidate order.
    ranked.sort_by_key(|candidate| candidate.metric);
    ranked
}

#[inline]
fn preferred_bit(llr: Llr) -> u8 {
    u8::from(llr < 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::derive_rng;
    use proptest::prelude::*;
    use rand::Rng;

    fn pool(code_length: usize, list_size: usize, received: &[u8]) -> PathPool {
        let params = PolarParams::new(code_length, code_length, list_size).unwrap();
        PathPool::create_initial(&params, received).unwrap()
    }

    fn decisions(pool: &PathPool, slot: usize, count: usize) -> Vec<u8> {
        let tree = pool.tree(slot).unwrap();
        (0..count).map(|i| tree.decision(0, i)).collect()
    }

    #[test]
    fn initial_pool_has_one_path() {
        let pool = pool(16, 4, &[0x00, 0x00]);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.active_count(), 1);
        assert!(pool.is_occupied(0));
        assert!(!pool.is_occupied(1));
        assert_eq!(pool.metric(0), Some(0));
        assert_eq!(pool.metric(3), None);
    }

    #[test]
    fn duplicate_fills_lowest_free_slot() {
        let mut pool = pool(8, 3, &[0xF0]);
        assert_eq!(pool.duplicate(0).unwrap(), 1);
        assert_eq!(pool.duplicate(0).unwrap(), 2);
        assert_eq!(pool.tree(2), pool.tree(0));
        pool.prune(1);
        assert_eq!(pool.duplicate(2).unwrap(), 1);
        assert_eq!(pool.stats().duplications, 3);
        assert_eq!(pool.stats().prunes, 1);
    }

    #[test]
    fn duplicate_into_full_pool_fails() {
        let mut pool = pool(8, 1, &[0x00]);
        assert_eq!(
            pool.duplicate(0).unwrap_err(),
            PolarError::PoolExhausted { capacity: 1 }
        );
    }

    #[test]
    fn frozen_bit_charges_disagreeing_paths() {
        let mut pool = pool(8, 2, &[0b0000_1000]);
        pool.apply_frozen_bit(0, 2);
        assert_eq!(pool.metric(0), Some(0));
        pool.apply_frozen_bit(0, 3);
        assert_eq!(pool.metric(0), Some(1));
        assert_eq!(decisions(&pool, 0, 4), vec![0, 0, 0, 0]);
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn splits_grow_then_prune() {
        let mut pool = pool(8, 4, &[0x00]);

        pool.split_at_information_bit(0, 0).unwrap();
        assert_eq!(pool.active_count(), 2);
        assert_eq!(decisions(&pool, 0, 1), vec![0]);
        assert_eq!(decisions(&pool, 1, 1), vec![1]);
        assert_eq!((pool.metric(0), pool.metric(1)), (Some(0), Some(1)));

        pool.split_at_information_bit(0, 1).unwrap();
        assert_eq!(pool.active_count(), 4);
        assert_eq!(decisions(&pool, 0, 2), vec![0, 0]);
        assert_eq!(decisions(&pool, 1, 2), vec![1, 0]);
        assert_eq!(decisions(&pool, 2, 2), vec![1, 1]);
        assert_eq!(decisions(&pool, 3, 2), vec![0, 1]);
        let metrics: Vec<_> = (0..4).map(|s| pool.metric(s).unwrap()).collect();
        assert_eq!(metrics, vec![0, 1, 2, 1]);

        pool.split_at_information_bit(0, 2).unwrap();
        assert_eq!(pool.active_count(), 4);
        assert_eq!(decisions(&pool, 0, 3), vec![0, 0, 0]);
        assert_eq!(decisions(&pool, 1, 3), vec![1, 0, 0]);
        assert_eq!(decisions(&pool, 2, 3), vec![0, 0, 1]);
        assert_eq!(decisions(&pool, 3, 3), vec![0, 1, 0]);
        let metrics: Vec<_> = (0..4).map(|s| pool.metric(s).unwrap()).collect();
        assert_eq!(metrics, vec![0, 1, 1, 1]);

        let stats = pool.stats();
        assert_eq!(stats.splits, 3);
        assert_eq!(stats.duplications, 4);
        assert_eq!(stats.prunes, 1);
        assert_eq!((stats.min_active, stats.max_active), (1, 4));
    }

    #[test]
    fn single_path_list_keeps_preferred_bit() {
        let mut pool = pool(8, 1, &[0b0000_0010]);
        pool.split_at_information_bit(0, 0).unwrap();
        pool.split_at_information_bit(0, 1).unwrap();
        assert_eq!(pool.active_count(), 1);
        assert_eq!(decisions(&pool, 0, 2), vec![0, 1]);
        assert_eq!(pool.metric(0), Some(0));
        assert_eq!(pool.stats().duplications, 0);
    }

    #[test]
    fn into_decoded_reports_empty_slots() {
        let pool = pool(8, 3, &[0x00]);
        let decoded = pool.into_decoded();
        assert_eq!(decoded.len(), 3);
        assert_eq!(
            decoded[0],
            Some(DecodedPath {
                word: vec![0x00],
                metric: 0
            })
        );
        assert!(decoded[1].is_none() && decoded[2].is_none());
    }

    /// Repeatedly removes the cheapest candidate, earliest first on ties.
    fn brute_force_survivors(candidates: &[Candidate], capacity: usize) -> Vec<Candidate> {
        let mut remaining: Vec<(usize, Candidate)> =
            candidates.iter().copied().enumerate().collect();
        let mut chosen = Vec::new();
        while chosen.len() < capacity && !remaining.is_empty() {
            let mut best = 0;
            for (i, (order, candidate)) in remaining.iter().enumerate() {
                let (best_order, best_candidate) = remaining[best];
                if candidate.metric < best_candidate.metric
                    || (candidate.metric == best_candidate.metric && *order < best_order)
                {
                    best = i;
                }
            }
            chosen.push(remaining.remove(best).1);
        }
        chosen
    }

    proptest! {
        #[test]
        fn survivors_match_brute_force(
            metrics in prop::collection::vec(0i32..6, 2..=16),
            capacity in 1usize..=8,
        ) {
            let candidates: Vec<Candidate> = metrics
                .iter()
                .enumerate()
                .map(|(i, &metric)| Candidate { slot: i % 8, bit: (i % 2) as u8, metric })
                .collect();
            let survivors = select_survivors(&candidates, capacity);
            prop_assert_eq!(survivors.len(), candidates.len().min(capacity));
            prop_assert_eq!(survivors, brute_force_survivors(&candidates, capacity));
        }

        #[test]
        fn active_paths_stay_within_capacity(seed in any::<u64>(), list_size in 1usize..=8) {
            let mut rng = derive_rng(b"pool-bounds", seed);
            let received: Vec<u8> = (0..4).map(|_| rng.r#gen()).collect();
            let mut pool = pool(32, list_size, &received);
            for node in 0..32 {
                if rng.gen_bool(0.6) {
                    pool.split_at_information_bit(0, node).unwrap();
                } else {
                    pool.apply_frozen_bit(0, node);
                }
                let active = pool.active_count();
                prop_assert!((1..=list_size).contains(&active));
                // Live paths always occupy a prefix of the slots.
                for slot in 0..list_size {
                    prop_assert_eq!(pool.is_occupied(slot), slot < active);
                }
            }
        }
    }
}

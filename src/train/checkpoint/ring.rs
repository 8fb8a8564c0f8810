//! Bounded retention of checkpoint steps

use std::collections::VecDeque;

/// FIFO of retained checkpoint steps, at most `keep` long
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRing {
    keep: usize,
    steps: VecDeque<u64>,
}

impl CheckpointRing {
    pub fn new(keep: usize) -> Self {
        Self { keep: keep.max(1), steps: VecDeque::new() }
    }

    /// Ring seeded with checkpoints already on disk, oldest first
    pub fn with_existing(keep: usize, mut existing: Vec<u64>) -> Self {
        existing.sort_unstable();
        existing.dedup();
        Self { keep: keep.max(1), steps: existing.into() }
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn latest(&self) -> Option<u64> {
        self.steps.back().copied()
    }

    pub fn steps(&self) -> Vec<u64> {
        self.steps.iter().copied().collect()
    }

    /// Record a new checkpoint and return the steps to evict, oldest first
    pub fn push(&mut self, step: u64) -> Vec<u64> {
        self.steps.retain(|&s| s != step);
        self.steps.push_back(step);
        let excess = self.steps.len().saturating_sub(self.keep);
        self.steps.drain(..excess).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut ring = CheckpointRing::new(2);
        assert!(ring.push(5).is_empty());
        assert!(ring.push(10).is_empty());
        assert_eq!(ring.push(15), vec![5]);
        assert_eq!(ring.steps(), vec![10, 15]);
        assert_eq!(ring.latest(), Some(15));
    }

    #[test]
    fn test_existing_over_capacity_trims_on_next_push() {
        let mut ring = CheckpointRing::with_existing(2, vec![30, 10, 20]);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.push(40), vec![10, 20]);
        assert_eq!(ring.steps(), vec![30, 40]);
    }

    #[test]
    fn test_resave_same_step_is_not_duplicated() {
        let mut ring = CheckpointRing::new(3);
        ring.push(5);
        ring.push(5);
        assert_eq!(ring.steps(), vec![5]);
    }

    #[test]
    fn test_keep_zero_treated_as_one() {
        let mut ring = CheckpointRing::new(0);
        ring.push(1);
        assert_eq!(ring.push(2), vec![1]);
    }
}

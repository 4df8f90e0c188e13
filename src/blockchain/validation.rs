use chrono::Utc;
use log::{debug, info};

use super::{
    BLOCK_GENERATION_INTERVAL_SECS, Block, DIFFICULTY_ADJUSTMENT_INTERVAL,
    TIMESTAMP_TOLERANCE_SECS,
};
use crate::error::{NodeError, Result};
use crate::hashing::hash_satisfies_difficulty;

fn is_hash(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

/// Shape of the header fields. Genesis is the only block allowed an
/// empty previous hash.
pub fn validate_block_structure(block: &Block) -> Result<()> {
    if !is_hash(&block.hash) {
        return Err(NodeError::structural(format!(
            "block {} hash {:?} is not a sha256 hex digest",
            block.index, block.hash
        )));
    }
    let previous_ok = if block.index == 0 {
        block.previous_hash.is_empty()
    } else {
        is_hash(&block.previous_hash)
    };
    if !previous_ok {
        return Err(NodeError::structural(format!(
            "block {} has malformed previous hash {:?}",
            block.index, block.previous_hash
        )));
    }
    if block.balances.iter().any(|b| b.wallet.is_empty()) {
        return Err(NodeError::structural(format!(
            "block {} carries a balance without wallet",
            block.index
        )));
    }
    Ok(())
}

/// Candidate must be no older than a minute before its predecessor and
/// no more than a minute ahead of `now`.
fn validate_timestamp(candidate: &Block, previous: &Block, now: i64) -> Result<()> {
    if previous.timestamp - TIMESTAMP_TOLERANCE_SECS < candidate.timestamp
        && candidate.timestamp - TIMESTAMP_TOLERANCE_SECS < now
    {
        Ok(())
    } else {
        Err(NodeError::consensus(format!(
            "block {} timestamp {} out of range (previous {}, now {now})",
            candidate.index, candidate.timestamp, previous.timestamp
        )))
    }
}

fn validate_hash(block: &Block) -> Result<()> {
    let expected = block.compute_hash();
    if expected != block.hash {
        return Err(NodeError::consensus(format!(
            "block {} hash {} does not match content hash {expected}",
            block.index, block.hash
        )));
    }
    if !hash_satisfies_difficulty(&block.hash, block.difficulty) {
        return Err(NodeError::consensus(format!(
            "block {} hash {} does not satisfy difficulty {}",
            block.index, block.hash, block.difficulty
        )));
    }
    Ok(())
}

/// Check that `candidate` can directly follow `previous`.
pub fn validate_new_block(candidate: &Block, previous: &Block) -> Result<()> {
    validate_new_block_at(candidate, previous, Utc::now().timestamp())
}

pub(crate) fn validate_new_block_at(candidate: &Block, previous: &Block, now: i64) -> Result<()> {
    validate_block_structure(candidate)?;
    if previous.index + 1 != candidate.index {
        return Err(NodeError::consensus(format!(
            "invalid index {}, expected {}",
            candidate.index,
            previous.index + 1
        )));
    }
    if previous.hash != candidate.previous_hash {
        return Err(NodeError::consensus(format!(
            "block {} previous hash {} does not match {}",
            candidate.index, candidate.previous_hash, previous.hash
        )));
    }
    validate_timestamp(candidate, previous, now)?;
    validate_hash(candidate)
}

/// Fork-choice weight: sum of 2^difficulty over all blocks.
pub fn accumulated_work(chain: &[Block]) -> u128 {
    chain
        .iter()
        .fold(0u128, |acc, block| acc.saturating_add(block.work()))
}

/// Difficulty required for the block following the head of `chain`.
///
/// Retargets whenever the head index is a positive multiple of the
/// adjustment interval, otherwise keeps the head's difficulty.
pub fn difficulty_for(chain: &[Block]) -> u32 {
    let Some(latest) = chain.last() else {
        return 0;
    };
    if latest.index != 0 && latest.index % DIFFICULTY_ADJUSTMENT_INTERVAL == 0 {
        adjusted_difficulty(chain, latest)
    } else {
        latest.difficulty
    }
}

/// Compare the time taken by the last window against the expected time.
/// The block one window back supplies both the start timestamp and the
/// base difficulty; the result moves by at most one step.
fn adjusted_difficulty(chain: &[Block], latest: &Block) -> u32 {
    let window = DIFFICULTY_ADJUSTMENT_INTERVAL as usize;
    if chain.len() <= window {
        return latest.difficulty;
    }
    let anchor = &chain[chain.len() - 1 - window];
    let expected = BLOCK_GENERATION_INTERVAL_SECS * DIFFICULTY_ADJUSTMENT_INTERVAL as i64;
    let actual = latest.timestamp - anchor.timestamp;

    let next = if actual < expected / 2 {
        anchor.difficulty.saturating_add(1)
    } else if actual > expected * 2 {
        anchor.difficulty.saturating_sub(1)
    } else {
        anchor.difficulty
    };
    if next != anchor.difficulty {
        info!(
            "difficulty retarget at height {}: {} -> {next} (actual {actual}s, expected {expected}s)",
            latest.index, anchor.difficulty
        );
    } else {
        debug!("difficulty unchanged at height {}: {next}", latest.index);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::FundAuthority;

    /// Unvalidated blocks with given timestamps and difficulty.
    fn spaced_chain(count: u64, spacing: i64, difficulty: u32) -> Vec<Block> {
        let genesis = Block::genesis(&FundAuthority::default());
        (0..count)
            .map(|i| Block {
                index: i,
                timestamp: 1_000 + i as i64 * spacing,
                difficulty,
                ..genesis.clone()
            })
            .collect()
    }

    fn next_block(previous: &Block, timestamp: i64, difficulty: u32) -> Block {
        let mut t = previous.template();
        t.index = previous.index + 1;
        t.previous_hash = previous.hash.clone();
        t.timestamp = timestamp;
        t.difficulty = difficulty;
        t.mine()
    }

    #[test]
    fn retarget_boundary_at_half_expected_is_unchanged() {
        assert_eq!(difficulty_for(&spaced_chain(11, 5, 3)), 3);
    }

    #[test]
    fn retarget_increases_when_window_is_fast() {
        assert_eq!(difficulty_for(&spaced_chain(11, 4, 3)), 4);
    }

    #[test]
    fn retarget_decreases_when_window_is_slow() {
        assert_eq!(difficulty_for(&spaced_chain(11, 25, 3)), 2);
        assert_eq!(difficulty_for(&spaced_chain(11, 25, 0)), 0);
    }

    #[test]
    fn retarget_boundary_at_double_expected_is_unchanged() {
        assert_eq!(difficulty_for(&spaced_chain(11, 20, 3)), 3);
    }

    #[test]
    fn retarget_uses_anchor_difficulty() {
        let mut chain = spaced_chain(11, 1, 5);
        chain[0].difficulty = 2;
        assert_eq!(difficulty_for(&chain), 3);
    }

    #[test]
    fn no_retarget_between_windows() {
        assert_eq!(difficulty_for(&spaced_chain(10, 1, 3)), 3);
        assert_eq!(difficulty_for(&spaced_chain(12, 1, 3)), 3);
        assert_eq!(difficulty_for(&spaced_chain(1, 1, 0)), 0);
    }

    #[test]
    fn accumulated_work_sums_powers_of_two() {
        let mut chain = spaced_chain(3, 1, 0);
        chain[1].difficulty = 3;
        chain[2].difficulty = 5;
        assert_eq!(accumulated_work(&chain), 1 + 8 + 32);
        assert_eq!(accumulated_work(&[]), 0);
    }

    #[test]
    fn new_block_rules() {
        let genesis = Block::genesis(&FundAuthority::default());
        let now = genesis.timestamp + 100;
        let good = next_block(&genesis, genesis.timestamp + 5, 2);
        assert!(validate_new_block_at(&good, &genesis, now).is_ok());

        let mut wrong_index = good.clone();
        wrong_index.index = 2;
        assert!(validate_new_block_at(&wrong_index, &genesis, now).is_err());

        let mut wrong_link = good.clone();
        wrong_link.previous_hash = "ab".repeat(32);
        assert!(validate_new_block_at(&wrong_link, &genesis, now).is_err());

        let too_old = next_block(&genesis, genesis.timestamp - 60, 1);
        assert!(validate_new_block_at(&too_old, &genesis, now).is_err());
        let future = next_block(&genesis, now + 60, 1);
        assert!(validate_new_block_at(&future, &genesis, now).is_err());
        let slightly_late = next_block(&genesis, now + 59, 1);
        assert!(validate_new_block_at(&slightly_late, &genesis, now).is_ok());
    }

    #[test]
    fn stated_difficulty_must_be_met() {
        let genesis = Block::genesis(&FundAuthority::default());
        let now = genesis.timestamp + 100;
        let mut block = next_block(&genesis, genesis.timestamp + 5, 0);
        // find a nonce whose hash has a leading 1 bit, then claim difficulty 1
        let mut t = block.template();
        t.difficulty = 1;
        let nonce = (0..)
            .find(|n| t.hash_with_nonce(*n).starts_with(|c: char| c >= '8'))
            .unwrap();
        block.difficulty = 1;
        block.nonce = nonce;
        block.hash = block.compute_hash();
        let err = validate_new_block_at(&block, &genesis, now).unwrap_err();
        assert!(err.to_string().contains("difficulty"));
    }

    #[test]
    fn structure_rejects_bad_hashes() {
        let genesis = Block::genesis(&FundAuthority::default());
        assert!(validate_block_structure(&genesis).is_ok());
        let mut b = genesis.clone();
        b.hash = "XYZ".into();
        assert!(validate_block_structure(&b).is_err());
        let mut b = genesis.clone();
        b.index = 1;
        assert!(validate_block_structure(&b).is_err());
    }
}

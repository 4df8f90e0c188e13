use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::blockchain::Block;
use crate::error::Result;

/// JSON snapshot of the whole chain on disk.
///
/// Blocks are stored field for field so that re-hashing on load reproduces
/// every stored hash.
#[derive(Debug, Clone)]
pub struct ChainStore {
    path: PathBuf,
}

impl ChainStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no snapshot has been written yet.
    pub fn load(&self) -> Result<Option<Vec<Block>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let blocks: Vec<Block> = serde_json::from_str(&raw)?;
        debug!("loaded {} blocks from {}", blocks.len(), self.path.display());
        Ok(Some(blocks))
    }

    /// Write to a sibling temp file, then rename over the snapshot so a
    /// reader never sees a half-written chain.
    pub fn save(&self, blocks: &[Block]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(blocks)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("saved {} blocks to {}", blocks.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::BlockTemplate;
    use crate::error::NodeError;
    use crate::wallet::FundAuthority;

    #[test]
    fn missing_snapshot_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChainStore::new(dir.path().join("chain.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn saved_blocks_reload_with_identical_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChainStore::new(dir.path().join("nested").join("chain.json"));

        let genesis = Block::genesis(&FundAuthority::default());
        let next = BlockTemplate {
            index: 1,
            previous_hash: genesis.hash.clone(),
            timestamp: genesis.timestamp + 30,
            transactions: genesis.transactions.clone(),
            balances: genesis.balances.clone(),
            difficulty: 3,
        }
        .mine();
        let chain = vec![genesis, next];

        store.save(&chain).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, chain);
        assert!(loaded.iter().all(|b| b.hash == b.compute_hash()));
    }

    #[test]
    fn corrupt_snapshot_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        fs::write(&path, "{ not json").unwrap();
        let err = ChainStore::new(path).load().unwrap_err();
        assert!(matches!(err, NodeError::Storage(_)));
    }
}

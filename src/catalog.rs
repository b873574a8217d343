// File: src/catalog.rs
// Static block catalog and cached mint table readers

use std::collections::HashSet;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::data_models::{Block, BlockWithMint, CachedMintRecord};
use crate::error::CatalogError;

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Ordered 21e8 block catalog, addressable by `index`
#[derive(Debug, Clone)]
pub struct BlockCatalog {
    blocks: Vec<Block>,
}

impl BlockCatalog {
    /// Load and validate the catalog file
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let blocks: Vec<Block> = read_json(path).await?;
        tracing::debug!(target: "magic_mint::catalog", path = %path.display(), blocks = blocks.len(), "Loaded block catalog");
        Self::from_blocks(blocks)
    }

    /// Indices must be unique and hashes must be 32-byte hex
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(blocks.len());
        for block in &blocks {
            if !seen.insert(block.index) {
                return Err(CatalogError::DuplicateIndex(block.index));
            }
            let decoded = hex::decode(&block.hash).ok();
            if decoded.is_none_or(|bytes| bytes.len() != 32) {
                return Err(CatalogError::InvalidHash {
                    index: block.index,
                    hash: block.hash.clone(),
                });
            }
        }
        Ok(Self { blocks })
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        self.blocks.iter().find(|b| b.index == index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks ordered by height, newest first
    pub fn latest_first(&self) -> Vec<Block> {
        let mut blocks = self.blocks.clone();
        blocks.sort_by(|a, b| b.height.cmp(&a.height));
        blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

/// Precomputed first-mint snapshot, one record per catalog index
#[derive(Debug, Clone, Default)]
pub struct MintTable {
    records: Vec<CachedMintRecord>,
}

impl MintTable {
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let records: Vec<CachedMintRecord> = read_json(path).await?;
        tracing::debug!(target: "magic_mint::catalog", path = %path.display(), records = records.len(), "Loaded cached mint table");
        Ok(Self { records })
    }

    #[cfg(test)]
    pub fn from_records(records: Vec<CachedMintRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, index: u64) -> Option<&CachedMintRecord> {
        self.records.iter().find(|r| r.index == index)
    }

    /// Number of blocks with a located mint
    pub fn found_count(&self) -> usize {
        self.records.iter().filter(|r| r.found).count()
    }

    pub fn into_records(self) -> Vec<CachedMintRecord> {
        self.records
    }
}

/// Join every catalog block (newest first) with its cached record
pub fn join_blocks(catalog: &BlockCatalog, table: &MintTable) -> Vec<BlockWithMint> {
    catalog
        .latest_first()
        .into_iter()
        .map(|block| BlockWithMint {
            mint: table.get(block.index).cloned(),
            block,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Deterministic 64-char hex hash containing "21e8"
    pub fn hash_for(index: u64) -> String {
        format!("0000000000000000000{:05x}21e8{:036x}", index, index)
    }

    pub fn block(index: u64, height: u64) -> Block {
        Block {
            index,
            height,
            hash: hash_for(index),
            time: 1_700_000_000 + index * 600,
        }
    }

    pub fn found(index: u64, height: u64, inscription_id: &str) -> CachedMintRecord {
        CachedMintRecord {
            index,
            block_height: height,
            block_hash: hash_for(index),
            block_time: Some(1_700_000_000 + index * 600),
            found: true,
            inscription_id: Some(inscription_id.to_string()),
            inscription_number: Some(70_000_000 + index),
            transaction_id: Some(format!("tx{}", index)),
        }
    }

    pub fn missing(index: u64, height: u64) -> CachedMintRecord {
        CachedMintRecord {
            index,
            block_height: height,
            block_hash: hash_for(index),
            block_time: None,
            found: false,
            inscription_id: None,
            inscription_number: None,
            transaction_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_fixture_hash_is_valid() {
        let hash = hash_for(7);
        assert_eq!(hash.len(), 64);
        assert!(hash.contains("21e8"));
    }

    #[test]
    fn test_rejects_duplicate_index() {
        let result = BlockCatalog::from_blocks(vec![block(1, 100), block(1, 200)]);
        assert!(matches!(result, Err(CatalogError::DuplicateIndex(1))));
    }

    #[test]
    fn test_rejects_malformed_hash() {
        let mut bad = block(2, 100);
        bad.hash = "21e8".to_string();
        let result = BlockCatalog::from_blocks(vec![bad]);
        assert!(matches!(result, Err(CatalogError::InvalidHash { index: 2, .. })));
    }

    #[test]
    fn test_latest_first_and_lookup() {
        let catalog =
            BlockCatalog::from_blocks(vec![block(0, 100), block(1, 300), block(2, 200)]).unwrap();
        let heights: Vec<u64> = catalog.latest_first().iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![300, 200, 100]);
        assert_eq!(catalog.get(2).map(|b| b.height), Some(200));
        assert!(catalog.get(9).is_none());
    }

    #[test]
    fn test_join_blocks_attaches_records() {
        let catalog = BlockCatalog::from_blocks(vec![block(0, 100), block(1, 300)]).unwrap();
        let table = MintTable::from_records(vec![found(0, 100, "ai0")]);
        let joined = join_blocks(&catalog, &table);
        assert_eq!(joined[0].block.index, 1);
        assert!(joined[0].mint.is_none());
        assert_eq!(joined[1].mint.as_ref().and_then(|m| m.inscription_id.as_deref()), Some("ai0"));
        assert_eq!(table.found_count(), 1);
    }

    #[tokio::test]
    async fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let blocks_path = dir.path().join("blocks_with_21e8.json");
        let mints_path = dir.path().join("first_mints_per_index.json");
        std::fs::write(&blocks_path, serde_json::to_string(&vec![block(7, 850000)]).unwrap()).unwrap();
        std::fs::write(
            &mints_path,
            r#"[{"index": 7, "blockHeight": 850000, "blockHash": "", "blockTime": "1718000000", "found": true, "inscriptionId": "ai0", "inscriptionNumber": "123"}]"#,
        )
        .unwrap();

        let catalog = BlockCatalog::load(&blocks_path).await.unwrap();
        let table = MintTable::load(&mints_path).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(table.get(7).and_then(|r| r.inscription_number), Some(123));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = BlockCatalog::load(&dir.path().join("absent.json")).await;
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }
}

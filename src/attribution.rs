// File: src/attribution.rs
// Wallet-side attribution of magic mints against the cached mint table

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use crate::catalog::{BlockCatalog, MintTable};
use crate::data_models::{AppConfig, Block, CachedMintRecord, Holdings, WalletInscription};
use crate::error::SourceError;
use crate::indexers::{InscriptionSource, UnisatInscriptions};
use crate::source::HttpAdapter;

/// The four inputs attribution needs, fetched together
#[async_trait]
pub trait HoldingsSource: Send + Sync {
    async fn wallet_inscriptions(&self, address: &str) -> anyhow::Result<Vec<WalletInscription>>;
    /// Mint table used to recognize magic inscription ids
    async fn magic_mints(&self) -> anyhow::Result<Vec<CachedMintRecord>>;
    async fn blocks(&self) -> anyhow::Result<Vec<Block>>;
    /// Mint table handed back for per-block detail rendering
    async fn cached_mints(&self) -> anyhow::Result<Vec<CachedMintRecord>>;
}

/// Wallet listing from UniSat, catalogs from the static JSON files
pub struct WalletHoldings {
    inscriptions: Option<UnisatInscriptions>,
    blocks_path: PathBuf,
    mints_path: PathBuf,
}

impl WalletHoldings {
    pub fn from_config(config: &AppConfig, adapter: HttpAdapter) -> Self {
        let inscriptions = config
            .credentials
            .unisat_api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .map(|key| UnisatInscriptions::new(adapter, config.endpoints.unisat.clone(), key.clone()));
        Self {
            inscriptions,
            blocks_path: config.blocks_path.clone(),
            mints_path: config.mints_path.clone(),
        }
    }
}

#[async_trait]
impl HoldingsSource for WalletHoldings {
    async fn wallet_inscriptions(&self, address: &str) -> anyhow::Result<Vec<WalletInscription>> {
        let source = self.inscriptions.as_ref().ok_or_else(|| SourceError::NotConfigured {
            provider: "unisat",
            message: "UNISAT_API_KEY is not set".to_string(),
        })?;
        Ok(source.inscriptions_for_address(address).await?)
    }

    async fn magic_mints(&self) -> anyhow::Result<Vec<CachedMintRecord>> {
        Ok(MintTable::load(&self.mints_path).await?.into_records())
    }

    async fn blocks(&self) -> anyhow::Result<Vec<Block>> {
        Ok(BlockCatalog::load(&self.blocks_path).await?.into_blocks())
    }

    async fn cached_mints(&self) -> anyhow::Result<Vec<CachedMintRecord>> {
        Ok(MintTable::load(&self.mints_path).await?.into_records())
    }
}

/// Match a wallet's inscriptions against the known magic mints.
///
/// `count` is the number of matched inscriptions. `blocks` is the catalog
/// filtered to the blocks those mints belong to, newest first.
pub fn attribute_holdings(
    user_inscriptions: &[WalletInscription],
    magic_mints: &[CachedMintRecord],
    cached_mints: Vec<CachedMintRecord>,
    mut blocks: Vec<Block>,
) -> Holdings {
    let index_by_id: HashMap<&str, u64> = magic_mints
        .iter()
        .filter(|mint| mint.found)
        .filter_map(|mint| mint.inscription_id.as_deref().map(|id| (id, mint.index)))
        .collect();

    let held: Vec<&WalletInscription> = user_inscriptions
        .iter()
        .filter(|inscription| index_by_id.contains_key(inscription.inscription_id.as_str()))
        .collect();

    let held_indices: HashSet<u64> = held
        .iter()
        .filter_map(|inscription| index_by_id.get(inscription.inscription_id.as_str()).copied())
        .collect();

    blocks.retain(|block| held_indices.contains(&block.index));
    blocks.sort_by(|a, b| b.height.cmp(&a.height));

    Holdings {
        count: held.len(),
        blocks,
        cached_mints,
    }
}

/// Fetch all four inputs concurrently and attribute.
///
/// All-or-nothing: any failed fetch yields [`Holdings::empty`].
pub async fn fetch_holdings<S: HoldingsSource + ?Sized>(source: &S, address: &str) -> Holdings {
    let joined = futures::try_join!(
        async { source.wallet_inscriptions(address).await.context("wallet inscriptions") },
        async { source.magic_mints().await.context("magic mint table") },
        async { source.blocks().await.context("block catalog") },
        async { source.cached_mints().await.context("cached mint table") },
    );

    match joined {
        Ok((inscriptions, magic_mints, blocks, cached_mints)) => {
            let holdings = attribute_holdings(&inscriptions, &magic_mints, cached_mints, blocks);
            tracing::info!(
                target: "magic_mint::attribution",
                address,
                scanned = inscriptions.len(),
                held = holdings.count,
                "Attributed wallet holdings"
            );
            holdings
        }
        Err(e) => {
            tracing::warn!(target: "magic_mint::attribution", address, error = %format!("{:#}", e), "Attribution failed, returning empty holdings");
            Holdings::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{block, found, missing};

    fn inscription(id: &str) -> WalletInscription {
        WalletInscription {
            inscription_id: id.to_string(),
            inscription_number: 1,
            address: "bc1pholder".to_string(),
            content_type: "text/plain".to_string(),
            content_length: 0,
            timestamp: 0,
            utxo: None,
        }
    }

    struct StubHoldings {
        inscriptions: Vec<WalletInscription>,
        mints: Vec<CachedMintRecord>,
        blocks: Vec<Block>,
        fail_cached_mints: bool,
    }

    #[async_trait]
    impl HoldingsSource for StubHoldings {
        async fn wallet_inscriptions(&self, _address: &str) -> anyhow::Result<Vec<WalletInscription>> {
            Ok(self.inscriptions.clone())
        }

        async fn magic_mints(&self) -> anyhow::Result<Vec<CachedMintRecord>> {
            Ok(self.mints.clone())
        }

        async fn blocks(&self) -> anyhow::Result<Vec<Block>> {
            Ok(self.blocks.clone())
        }

        async fn cached_mints(&self) -> anyhow::Result<Vec<CachedMintRecord>> {
            if self.fail_cached_mints {
                anyhow::bail!("first_mints_per_index.json unavailable");
            }
            Ok(self.mints.clone())
        }
    }

    fn stub(fail_cached_mints: bool) -> StubHoldings {
        StubHoldings {
            inscriptions: vec![inscription("magic7i0"), inscription("unrelatedi0")],
            mints: vec![found(7, 850000, "magic7i0"), missing(8, 850100), found(9, 850200, "magic9i0")],
            blocks: vec![block(7, 850000), block(8, 850100), block(9, 850200)],
            fail_cached_mints,
        }
    }

    #[test]
    fn test_single_match_returns_its_block() {
        let source = stub(false);
        let holdings =
            attribute_holdings(&source.inscriptions, &source.mints, source.mints.clone(), source.blocks.clone());
        assert_eq!(holdings.count, 1);
        assert_eq!(holdings.blocks, vec![block(7, 850000)]);
        assert_eq!(holdings.cached_mints.len(), 3);
    }

    #[test]
    fn test_unfound_records_never_match() {
        let mut record = missing(8, 850100);
        record.inscription_id = Some("ghosti0".to_string());
        let holdings = attribute_holdings(
            &[inscription("ghosti0")],
            &[record],
            Vec::new(),
            vec![block(8, 850100)],
        );
        assert_eq!(holdings.count, 0);
        assert!(holdings.blocks.is_empty());
    }

    #[test]
    fn test_count_is_inscriptions_not_blocks() {
        // Two table rows naming the same index collapse to one block
        let mints = vec![found(7, 850000, "ai0"), found(7, 850000, "bi0")];
        let holdings = attribute_holdings(
            &[inscription("ai0"), inscription("bi0")],
            &mints,
            mints.clone(),
            vec![block(7, 850000), block(8, 850100)],
        );
        assert_eq!(holdings.count, 2);
        assert_eq!(holdings.blocks.len(), 1);
    }

    #[test]
    fn test_blocks_are_newest_first() {
        let mints = vec![found(7, 850000, "ai0"), found(9, 850200, "bi0")];
        let holdings = attribute_holdings(
            &[inscription("ai0"), inscription("bi0")],
            &mints,
            Vec::new(),
            vec![block(7, 850000), block(9, 850200)],
        );
        let indices: Vec<u64> = holdings.blocks.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![9, 7]);
    }

    #[tokio::test]
    async fn test_fetch_holdings_success() {
        let holdings = fetch_holdings(&stub(false), "bc1pholder").await;
        assert_eq!(holdings.count, 1);
        assert_eq!(holdings.blocks.len(), 1);
        assert_eq!(holdings.blocks[0].index, 7);
    }

    #[tokio::test]
    async fn test_cached_mint_failure_empties_everything() {
        let holdings = fetch_holdings(&stub(true), "bc1pholder").await;
        assert_eq!(holdings, Holdings::empty());
    }

    #[tokio::test]
    async fn test_missing_unisat_key_empties_everything() {
        let dir = tempfile::tempdir().unwrap();
        let blocks_path = dir.path().join("blocks.json");
        let mints_path = dir.path().join("mints.json");
        std::fs::write(&blocks_path, serde_json::to_string(&vec![block(7, 850000)]).unwrap()).unwrap();
        std::fs::write(&mints_path, serde_json::to_string(&vec![found(7, 850000, "ai0")]).unwrap()).unwrap();

        let source = WalletHoldings {
            inscriptions: None,
            blocks_path,
            mints_path,
        };
        assert!(source.blocks().await.is_ok());
        assert_eq!(fetch_holdings(&source, "bc1pholder").await, Holdings::empty());
    }
}

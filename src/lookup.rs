// File: src/lookup.rs
// Mint lookup orchestration: search, validate, resolve ownership, reconcile

use std::time::Duration;

use anyhow::Context;
use tokio::time::sleep;

use crate::catalog::BlockCatalog;
use crate::data_models::{ApiCredentials, AppConfig, MintCandidate, MintSearch, OwnerInfo, VerifiedMint};
use crate::error::LookupError;
use crate::fallback::{first_success, Provider};
use crate::indexers::{DetailSource, OrdinalsBotSearch, OrdiscanDetail, SearchSource};
use crate::pattern::{is_valid_mint, search_patterns};
use crate::reconcile::reconcile;
use crate::source::HttpAdapter;

/// Default pause between consecutive search-pattern queries
pub const DEFAULT_SEARCH_PACING: Duration = Duration::from_millis(100);

/// Finds the magic mints for a catalog block across the search and detail sources.
///
/// Each call is independent: nothing is cached between invocations.
pub struct LookupEngine<S, D> {
    credentials: ApiCredentials,
    search: S,
    detail: D,
    pacing: Duration,
}

impl LookupEngine<OrdinalsBotSearch, OrdiscanDetail> {
    /// Engine backed by OrdinalsBot search and Ordiscan detail.
    ///
    /// Missing keys are not rejected here; [`LookupEngine::find_mints_for_block`]
    /// reports them before it issues any request.
    pub fn from_config(config: &AppConfig, adapter: HttpAdapter) -> Self {
        let credentials = &config.credentials;
        let search = OrdinalsBotSearch::new(
            adapter.clone(),
            config.endpoints.ordinalsbot.clone(),
            credentials.ordinals_api_key.clone().unwrap_or_default(),
        );
        let detail = OrdiscanDetail::new(
            adapter,
            config.endpoints.ordiscan.clone(),
            credentials.ordiscan_api_key.clone().unwrap_or_default(),
        );
        Self::new(credentials.clone(), search, detail).with_pacing(config.search_pacing)
    }
}

impl<S: SearchSource, D: DetailSource> LookupEngine<S, D> {
    pub fn new(credentials: ApiCredentials, search: S, detail: D) -> Self {
        Self {
            credentials,
            search,
            detail,
            pacing: DEFAULT_SEARCH_PACING,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Look up every verified mint for the block at catalog `index`.
    ///
    /// Fails only for an unknown index or missing credentials, both before any
    /// network call. Search and detail failures degrade to fewer results.
    pub async fn find_mints_for_block(
        &self,
        catalog: &BlockCatalog,
        index: u64,
    ) -> Result<MintSearch, LookupError> {
        let block = catalog.get(index).cloned().ok_or(LookupError::NotFound(index))?;
        self.credentials.require_lookup()?;

        let patterns = search_patterns(block.height);
        tracing::info!(
            target: "magic_mint::lookup",
            index,
            height = block.height,
            ?patterns,
            "Searching for mints"
        );

        let mut verified: Vec<VerifiedMint> = Vec::new();
        for (i, pattern) in patterns.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                sleep(self.pacing).await;
            }

            let hits = match self.search.search(pattern).await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(target: "magic_mint::lookup", %pattern, error = %e, "Search failed, treating as no hits");
                    continue;
                }
            };
            tracing::debug!(target: "magic_mint::lookup", %pattern, hits = hits.len(), "Search returned");

            for candidate in hits {
                if !is_valid_mint(&candidate.raw_content, block.height) {
                    tracing::debug!(target: "magic_mint::lookup", inscription = %candidate.inscription_id, "Content does not match the mint pattern");
                    continue;
                }
                if verified.iter().any(|m| m.inscription_id == candidate.inscription_id) {
                    tracing::debug!(target: "magic_mint::lookup", inscription = %candidate.inscription_id, "Already verified under another pattern");
                    continue;
                }
                verified.push(self.verify(candidate, block.height).await);
            }
        }

        let mints = reconcile(verified);
        tracing::info!(target: "magic_mint::lookup", index, found = mints.len(), "Lookup complete");
        Ok(MintSearch::new(block, mints))
    }

    /// Resolve owners and the canonical number for an accepted candidate.
    ///
    /// The detail source is the first link of the number chain; its owner
    /// fields are kept whichever link supplies the number.
    async fn verify(&self, candidate: MintCandidate, block_height: u64) -> VerifiedMint {
        let mut owner = OwnerInfo::default();
        let inscription_id = candidate.inscription_id.as_str();

        let number = first_success(vec![
            Provider::new("detail", async {
                let info = self
                    .detail
                    .inscription(inscription_id)
                    .await
                    .with_context(|| format!("owner lookup for {}", inscription_id))?
                    .unwrap_or_default();
                let number = info.inscription_number;
                owner = info;
                Ok::<_, anyhow::Error>(number)
            }),
            Provider::ready("search", candidate.raw_number),
        ])
        .await;
        if let Some(resolved) = &number {
            tracing::debug!(
                target: "magic_mint::lookup",
                inscription = %candidate.inscription_id,
                number = resolved.value,
                source = resolved.provider,
                "Resolved inscription number"
            );
        }

        VerifiedMint {
            inscription_id: candidate.inscription_id,
            inscription_number: number.map(|n| n.value),
            block_height,
            txid: candidate.txid,
            current_owner: owner.current_owner,
            genesis_owner: owner.genesis_owner,
            content_str: Some(candidate.raw_content),
        }
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::SourceError;

    /// Search source answering from a fixed map of pattern → hits
    #[derive(Default)]
    pub struct MockSearch {
        pub hits: HashMap<String, Vec<MintCandidate>>,
        pub failing: Vec<String>,
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchSource for MockSearch {
        async fn search(&self, text: &str) -> Result<Vec<MintCandidate>, SourceError> {
            self.calls.lock().unwrap().push(text.to_string());
            if self.failing.iter().any(|p| p == text) {
                return Err(SourceError::Timeout(crate::source::REQUEST_TIMEOUT));
            }
            Ok(self.hits.get(text).cloned().unwrap_or_default())
        }
    }

    /// Detail source answering from a fixed map of id → owner info
    #[derive(Default)]
    pub struct MockDetail {
        pub owners: HashMap<String, OwnerInfo>,
        pub failing: bool,
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DetailSource for MockDetail {
        async fn inscription(&self, inscription_id: &str) -> Result<Option<OwnerInfo>, SourceError> {
            self.calls.lock().unwrap().push(inscription_id.to_string());
            if self.failing {
                return Err(SourceError::Rejected {
                    provider: "mock",
                    message: "unavailable".to_string(),
                });
            }
            Ok(self.owners.get(inscription_id).cloned())
        }
    }

    pub fn full_credentials() -> ApiCredentials {
        ApiCredentials {
            ordinals_api_key: Some("ordinals".to_string()),
            ordiscan_api_key: Some("ordiscan".to_string()),
            unisat_api_key: None,
        }
    }

    pub fn mint_content(height: u64) -> String {
        format!(
            r#"{{"p":"tap","op":"dmt-mint","dep":"cddb01f87428f8efa89664e08e248595e20c90432a28839e1c62b357afa756e1i0","tick":"magic","blk":"{}"}}"#,
            height
        )
    }

    pub fn candidate(id: &str, content: String, raw_number: Option<u64>) -> MintCandidate {
        MintCandidate {
            inscription_id: id.to_string(),
            raw_content: content,
            raw_number,
            txid: format!("tx-{}", id),
        }
    }
}

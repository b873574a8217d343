// File: src/data_models.rs
// Shared data structures and models for all interfaces

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LookupError;

/// Application configuration, built once in `main` and passed down explicitly
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub blocks_path: PathBuf,
    pub mints_path: PathBuf,
    pub credentials: ApiCredentials,
    pub endpoints: Endpoints,
    /// Delay between consecutive search-pattern queries
    pub search_pacing: Duration,
}

/// Static credentials for the third-party indexers
#[derive(Debug, Clone, Default)]
pub struct ApiCredentials {
    /// OrdinalsBot text search
    pub ordinals_api_key: Option<String>,
    /// Ordiscan per-inscription detail
    pub ordiscan_api_key: Option<String>,
    /// UniSat wallet inscription listing
    pub unisat_api_key: Option<String>,
}

impl ApiCredentials {
    /// Both lookup credentials must be present before any mint search starts.
    pub fn require_lookup(&self) -> Result<(), LookupError> {
        let missing: Vec<&str> = [
            ("ORDINALS_API_KEY", &self.ordinals_api_key),
            ("ORDISCAN_API_KEY", &self.ordiscan_api_key),
        ]
        .into_iter()
        .filter(|(_, key)| key.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LookupError::Configuration(missing.join(", ")))
        }
    }
}

/// Base URLs of the external sources
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub ordinalsbot: String,
    pub ordiscan: String,
    pub unisat: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            ordinalsbot: "https://api.ordinalsbot.com".to_string(),
            ordiscan: "https://api.ordiscan.com".to_string(),
            unisat: "https://open-api.unisat.io".to_string(),
        }
    }
}

/// One entry of the 21e8 block catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub height: u64,
    pub hash: String,
    pub time: u64,
}

impl Block {
    /// Byte offsets of every "21e8" occurrence in the hash (overlaps included)
    pub fn magic_positions(&self) -> Vec<usize> {
        (0..self.hash.len().saturating_sub(3))
            .filter(|&i| self.hash.get(i..i + 4) == Some("21e8"))
            .collect()
    }
}

/// Raw text-search hit, normalized from the search source's wire format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCandidate {
    pub inscription_id: String,
    pub raw_content: String,
    pub raw_number: Option<u64>,
    pub txid: String,
}

/// Ownership and numbering resolved from the detail source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerInfo {
    pub current_owner: Option<String>,
    pub genesis_owner: Option<String>,
    pub inscription_number: Option<u64>,
}

/// A candidate whose content passed the mint pattern for its target block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedMint {
    pub inscription_id: String,
    /// `None` when neither the detail source nor the search hit carried a number
    pub inscription_number: Option<u64>,
    pub block_height: u64,
    pub txid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_str: Option<String>,
}

/// Precomputed first-mint snapshot, one record per catalog index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedMintRecord {
    pub index: u64,
    pub block_height: u64,
    #[serde(default)]
    pub block_hash: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub block_time: Option<u64>,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inscription_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64", skip_serializing_if = "Option::is_none")]
    pub inscription_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// Inscription held by a wallet, as listed by the wallet indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInscription {
    pub inscription_id: String,
    /// Signed: cursed inscriptions carry negative numbers
    #[serde(default)]
    pub inscription_number: i64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_length: u64,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub utxo: Option<UtxoRef>,
}

/// Output currently holding an inscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoRef {
    pub txid: String,
    pub vout: u32,
    #[serde(default)]
    pub satoshi: u64,
    #[serde(default)]
    pub height: u64,
}

/// Lookup result for one catalog block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintSearch {
    pub block: Block,
    pub mints: Vec<VerifiedMint>,
    pub count: usize,
}

impl MintSearch {
    pub fn new(block: Block, mints: Vec<VerifiedMint>) -> Self {
        Self {
            count: mints.len(),
            block,
            mints,
        }
    }

    /// Canonical mint for the block: the lowest-numbered one
    pub fn first(&self) -> Option<&VerifiedMint> {
        self.mints.first()
    }
}

/// Magic mints attributed to one wallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holdings {
    /// Matched inscriptions, not matched blocks
    pub count: usize,
    pub blocks: Vec<Block>,
    pub cached_mints: Vec<CachedMintRecord>,
}

impl Holdings {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Catalog block joined with its cached mint record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockWithMint {
    #[serde(flatten)]
    pub block: Block,
    pub mint: Option<CachedMintRecord>,
}

/// BTC price and the market cap derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub btc_price_usd: f64,
    /// Provider that answered, or "fallback"
    pub source: String,
    pub floor_price_btc: f64,
    pub total_supply: u64,
    pub market_cap_usd: f64,
}

/// Numbers arrive as integers, floats or decimal strings depending on the source
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl LooseNumber {
    fn to_u64(&self) -> Option<u64> {
        match self {
            LooseNumber::Unsigned(n) => Some(*n),
            LooseNumber::Signed(n) => u64::try_from(*n).ok(),
            LooseNumber::Float(f) if *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64 => {
                Some(*f as u64)
            }
            LooseNumber::Float(_) => None,
            LooseNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Deserialize an optional non-negative integer from any of the loose forms.
/// Unparsable values read as absent instead of failing the whole record.
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(LooseNumber::to_u64))
}

// File: src/indexers.rs
// Search, detail and wallet sources, each normalizing its own wire schema

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::data_models::{lenient_u64, MintCandidate, OwnerInfo, WalletInscription};
use crate::error::SourceError;
use crate::source::{HttpAdapter, Payload};

/// Text search over inscription content
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(&self, text: &str) -> Result<Vec<MintCandidate>, SourceError>;
}

/// Per-inscription ownership and numbering
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// `Ok(None)` when the source has nothing usable for this id
    async fn inscription(&self, inscription_id: &str) -> Result<Option<OwnerInfo>, SourceError>;
}

/// Inscriptions currently held by an address
#[async_trait]
pub trait InscriptionSource: Send + Sync {
    async fn inscriptions_for_address(&self, address: &str) -> Result<Vec<WalletInscription>, SourceError>;
}

/// Append `segments` to `base` as percent-encoded path segments.
///
/// Caller-supplied values never change the path depth or the query.
fn endpoint(provider: &'static str, base: &str, segments: &[&str]) -> Result<Url, SourceError> {
    let invalid = |message: String| SourceError::NotConfigured { provider, message };
    let mut url = Url::parse(base).map_err(|e| invalid(format!("{}: {}", base, e)))?;
    if segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
        return Err(SourceError::InvalidInput {
            provider,
            message: format!("unusable path segment in {:?}", segments),
        });
    }
    url.path_segments_mut()
        .map_err(|_| invalid(format!("{} cannot carry a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Bitcoin addresses are base58 or bech32: ASCII letters and digits only
fn is_plausible_address(address: &str) -> bool {
    !address.is_empty() && address.len() <= 100 && address.chars().all(|c| c.is_ascii_alphanumeric())
}

// ---------------------------------------------------------------------------
// OrdinalsBot search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    inscriptionid: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    inscriptionnumber: Option<u64>,
    #[serde(default)]
    txid: String,
    #[serde(default)]
    contentstr: Option<String>,
}

impl SearchHit {
    fn into_candidate(self) -> Option<MintCandidate> {
        let raw_content = self.contentstr.filter(|c| !c.is_empty())?;
        Some(MintCandidate {
            inscription_id: self.inscriptionid,
            raw_content,
            raw_number: self.inscriptionnumber,
            txid: self.txid,
        })
    }
}

/// OrdinalsBot `/search?text=` client
pub struct OrdinalsBotSearch {
    adapter: HttpAdapter,
    base_url: String,
    api_key: String,
}

impl OrdinalsBotSearch {
    pub fn new(adapter: HttpAdapter, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            adapter,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

/// Hits without content, or that do not decode, are dropped here
fn parse_search_body(body: Value) -> Vec<MintCandidate> {
    let Ok(response) = serde_json::from_value::<SearchResponse>(body) else {
        return Vec::new();
    };
    response
        .results
        .into_iter()
        .filter_map(|hit| serde_json::from_value::<SearchHit>(hit).ok())
        .filter_map(SearchHit::into_candidate)
        .collect()
}

#[async_trait]
impl SearchSource for OrdinalsBotSearch {
    async fn search(&self, text: &str) -> Result<Vec<MintCandidate>, SourceError> {
        let mut url = endpoint("ordinalsbot", &self.base_url, &["search"])?;
        url.query_pairs_mut().append_pair("text", text);
        tracing::debug!(target: "magic_mint::indexers", %url, "Searching");

        let payload = self
            .adapter
            .request(
                url.as_str(),
                &[("x-api-key", self.api_key.as_str()), ("Accept", "application/json")],
            )
            .await?;

        match payload {
            Payload::Json(body) => Ok(parse_search_body(body)),
            Payload::Raw(_) => {
                tracing::debug!(target: "magic_mint::indexers", pattern = text, "Search returned a non-JSON body");
                Ok(Vec::new())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ordiscan inscription detail
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DetailResponse {
    data: Option<DetailData>,
}

#[derive(Debug, Deserialize)]
struct DetailData {
    owner_address: Option<String>,
    genesis_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    inscription_number: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    num: Option<u64>,
}

impl From<DetailData> for OwnerInfo {
    fn from(data: DetailData) -> Self {
        OwnerInfo {
            current_owner: data.owner_address,
            genesis_owner: data.genesis_address,
            inscription_number: data.inscription_number.or(data.num),
        }
    }
}

/// Ordiscan `/v1/inscription/{id}` client
pub struct OrdiscanDetail {
    adapter: HttpAdapter,
    base_url: String,
    api_key: String,
}

impl OrdiscanDetail {
    pub fn new(adapter: HttpAdapter, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            adapter,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl DetailSource for OrdiscanDetail {
    async fn inscription(&self, inscription_id: &str) -> Result<Option<OwnerInfo>, SourceError> {
        let url = endpoint("ordiscan", &self.base_url, &["v1", "inscription", inscription_id])?;
        let bearer = format!("Bearer {}", self.api_key);
        let payload = self
            .adapter
            .request(url.as_str(), &[("Authorization", bearer.as_str()), ("Accept", "application/json")])
            .await?;

        Ok(payload
            .decode::<DetailResponse>()
            .and_then(|response| response.data)
            .map(OwnerInfo::from))
    }
}

// ---------------------------------------------------------------------------
// UniSat wallet inscriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UnisatEnvelope {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<UnisatPage>,
}

#[derive(Debug, Deserialize)]
struct UnisatPage {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    inscription: Vec<WalletInscription>,
}

/// UniSat `/v1/indexer/address/{address}/inscription-data` client
pub struct UnisatInscriptions {
    adapter: HttpAdapter,
    base_url: String,
    api_key: String,
    page_size: usize,
    max_pages: usize,
}

impl UnisatInscriptions {
    pub fn new(adapter: HttpAdapter, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            adapter,
            base_url: base_url.into(),
            api_key: api_key.into(),
            page_size: 100,
            max_pages: 20,
        }
    }

    async fn fetch_page(&self, address: &str, cursor: usize) -> Result<UnisatPage, SourceError> {
        let mut url = endpoint(
            "unisat",
            &self.base_url,
            &["v1", "indexer", "address", address, "inscription-data"],
        )?;
        url.query_pairs_mut()
            .append_pair("cursor", &cursor.to_string())
            .append_pair("size", &self.page_size.to_string());
        let bearer = format!("Bearer {}", self.api_key);
        let payload = self
            .adapter
            .request(url.as_str(), &[("Authorization", bearer.as_str()), ("Accept", "application/json")])
            .await?;

        let envelope = payload.decode::<UnisatEnvelope>().ok_or_else(|| SourceError::Rejected {
            provider: "unisat",
            message: "unexpected response body".to_string(),
        })?;
        if envelope.code != 0 {
            return Err(SourceError::Rejected {
                provider: "unisat",
                message: envelope.msg,
            });
        }
        Ok(envelope.data.unwrap_or(UnisatPage {
            total: 0,
            inscription: Vec::new(),
        }))
    }
}

#[async_trait]
impl InscriptionSource for UnisatInscriptions {
    async fn inscriptions_for_address(&self, address: &str) -> Result<Vec<WalletInscription>, SourceError> {
        if !is_plausible_address(address) {
            return Err(SourceError::InvalidInput {
                provider: "unisat",
                message: format!("not a bitcoin address: {:?}", address),
            });
        }

        let mut collected = Vec::new();

        for _ in 0..self.max_pages {
            let page = self.fetch_page(address, collected.len()).await?;
            let received = page.inscription.len();
            collected.extend(page.inscription);

            if received == 0 || collected.len() as u64 >= page.total {
                return Ok(collected);
            }
        }

        tracing::warn!(
            target: "magic_mint::indexers",
            address,
            collected = collected.len(),
            "Stopped paging wallet inscriptions at the page cap"
        );
        Ok(collected)
    }
}

//! Baker list (BakingBad) and account (Tezos node RPC) client with rate
//! limiting, retries and an optional response cache.

use crate::chain::cache::{Cache, CacheError};
use crate::chain::decode::{
    decode_account, decode_validators, DecodeError, RawAccount, RawValidator, ValidationError,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_BAKERS_URL: &str = "https://api.baking-bad.org/v2/bakers";
pub const DEFAULT_RPC_URL: &str = "https://mainnet.api.tez.ie";
const RATE_LIMIT_MS: u64 = 200;
const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 500;
const CACHE_MAX_AGE_SECS: u64 = 300;
const REQUEST_TIMEOUT_SECS: u64 = 30;

const ENDPOINT_BAKERS: &str = "bakers";
const ENDPOINT_CONTRACT: &str = "contract";
const ENDPOINT_DELEGATE: &str = "delegate";

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub bakers_url: String,
    pub rpc_url: String,
    pub rate_limit_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub cache_max_age_secs: u64,
    pub offline: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            bakers_url: DEFAULT_BAKERS_URL.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            rate_limit_ms: RATE_LIMIT_MS,
            max_retries: MAX_RETRIES,
            retry_backoff_ms: RETRY_BACKOFF_MS,
            cache_max_age_secs: CACHE_MAX_AGE_SECS,
            offline: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("url: {0}")]
    Url(#[from] url::ParseError),
    #[error("cache: {0}")]
    Cache(#[from] CacheError),
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),
    #[error("api error: status {0} body {1}")]
    Api(u16, String),
    #[error("offline mode: no cached response for {0}")]
    OfflineMiss(String),
}

/// Fetcher with rate limiting and optional SQLite cache.
pub struct Fetcher {
    config: FetchConfig,
    client: Option<reqwest::Client>,
    cache: Option<Cache>,
    last_request: Mutex<Option<OffsetDateTime>>,
    request_count: AtomicU64,
}

impl Fetcher {
    pub fn new(config: FetchConfig, cache: Option<Cache>) -> Result<Self, FetchError> {
        Url::parse(&config.bakers_url)?;
        Url::parse(&config.rpc_url)?;
        let client = if config.offline {
            None
        } else {
            Some(
                reqwest::Client::builder()
                    .use_rustls_tls()
                    .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                    .build()?,
            )
        };
        Ok(Self {
            config,
            client,
            cache,
            last_request: Mutex::new(None),
            request_count: AtomicU64::new(0),
        })
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = (OffsetDateTime::now_utc() - prev).whole_milliseconds();
            let need = i128::from(self.config.rate_limit_ms);
            if elapsed < need {
                let wait = u64::try_from(need - elapsed).unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(wait)).await;
            }
        }
        *last = Some(OffsetDateTime::now_utc());
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(factor))
    }

    async fn get_bytes(
        &self,
        url: Url,
        endpoint: &str,
        params: &str,
    ) -> Result<Vec<u8>, FetchError> {
        let key = Cache::key_for(endpoint, params);
        if let Some(cache) = &self.cache {
            if self.config.offline {
                return match cache.get(&key)? {
                    Some(hit) => {
                        debug!(endpoint, params, "offline cache hit");
                        Ok(hit.body)
                    }
                    None => Err(FetchError::OfflineMiss(format!("{endpoint} {params}"))),
                };
            }
            let now = OffsetDateTime::now_utc();
            if let Some(body) = cache.get_fresh(&key, self.config.cache_max_age_secs, now)? {
                debug!(endpoint, params, "cache hit");
                return Ok(body);
            }
        }

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| FetchError::OfflineMiss(format!("{endpoint} {params}")))?;
        self.rate_limit().await;

        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            match client.get(url.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let body = resp.bytes().await?.to_vec();
                        self.request_count.fetch_add(1, Ordering::Relaxed);
                        if let Some(cache) = &self.cache {
                            let now = OffsetDateTime::now_utc();
                            if let Err(e) = cache.put(&key, endpoint, &body, now) {
                                warn!(error = %e, "cache write failed");
                            }
                        }
                        return Ok(body);
                    }
                    let text = resp.text().await.unwrap_or_default();
                    let retryable = status.is_server_error() || status.as_u16() == 429;
                    last_err = Some(FetchError::Api(status.as_u16(), text));
                    if !retryable {
                        break;
                    }
                }
                Err(e) => last_err = Some(FetchError::Request(e)),
            }
            if attempt < self.config.max_retries {
                let wait = self.backoff(attempt);
                warn!(attempt, ms = wait.as_millis() as u64, %url, "retry after error");
                tokio::time::sleep(wait).await;
            }
        }
        Err(last_err.unwrap_or_else(|| FetchError::Api(0, "unknown".to_string())))
    }

    fn rpc_url(&self, kind: &str, address: &str) -> Result<Url, FetchError> {
        let url = format!(
            "{}/chains/main/blocks/head/context/{}/{}",
            self.config.rpc_url.trim_end_matches('/'),
            kind,
            urlencoding::encode(address)
        );
        Ok(Url::parse(&url)?)
    }

    /// Current baker list.
    pub async fn bakers(&self) -> Result<Vec<RawValidator>, FetchError> {
        let url = Url::parse(&self.config.bakers_url)?;
        let body = self.get_bytes(url, ENDPOINT_BAKERS, "").await?;
        let bakers = decode_validators(&body)?;
        info!(count = bakers.len(), "fetched bakers");
        Ok(bakers)
    }

    /// Raw bytes of the baker list, for callers that decode themselves.
    pub async fn bakers_raw(&self) -> Result<Vec<u8>, FetchError> {
        let url = Url::parse(&self.config.bakers_url)?;
        self.get_bytes(url, ENDPOINT_BAKERS, "").await
    }

    /// Contract record (balance and delegate) for any account.
    pub async fn account(&self, address: &str) -> Result<RawAccount, FetchError> {
        let url = self.rpc_url("contracts", address)?;
        let body = self.get_bytes(url, ENDPOINT_CONTRACT, address).await?;
        Ok(decode_account(&body)?)
    }

    /// Delegate record (frozen balances, grace period) for a baker address.
    pub async fn delegate(&self, address: &str) -> Result<RawAccount, FetchError> {
        let url = self.rpc_url("delegates", address)?;
        let body = self.get_bytes(url, ENDPOINT_DELEGATE, address).await?;
        Ok(decode_account(&body)?)
    }

    pub async fn undelegated_balance(&self, address: &str) -> Result<String, FetchError> {
        let account = self.account(address).await?;
        Ok(crate::staking::undelegated_balance(&account)?)
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}

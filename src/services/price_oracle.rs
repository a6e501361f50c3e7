use anyhow::anyhow;
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use time::OffsetDateTime;
use tracing::{instrument, warn};

use crate::{
    config::{OracleConfig, OracleSource},
    error::{EngineError, Result},
    models::common::{GasPriceKind, Price},
};

/// Source of live gas prices. The engine only ever reads from it.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn current_price(&self, kind: GasPriceKind, at: OffsetDateTime) -> Result<Price>;
}

/// Oracle with a hard deadline on every quote.
///
/// Timeouts and failures both surface as `OracleUnavailable`; there is no
/// retry and no fallback to an older price.
pub struct BoundedOracle {
    inner: Arc<dyn PriceOracle>,
    timeout: Duration,
}

impl BoundedOracle {
    pub fn new(inner: Arc<dyn PriceOracle>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Build the oracle described by the `oracle` config section
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let inner: Arc<dyn PriceOracle> = match config.source {
            OracleSource::Fixed => Arc::new(FixedPriceOracle::new(
                config.fixed_reference_price,
                config.fixed_storage_price,
            )),
            OracleSource::Http => {
                let base_url = config.http_base_url.as_deref().ok_or_else(|| {
                    EngineError::Internal(anyhow!(
                        "oracle.http_base_url is required for the http oracle"
                    ))
                })?;
                Arc::new(HttpPriceOracle::new(base_url, config.request_timeout_ms)?)
            }
        };

        Ok(Self::new(
            inner,
            Duration::from_millis(config.request_timeout_ms),
        ))
    }

    #[instrument(skip(self))]
    pub async fn quote(&self, kind: GasPriceKind, at: OffsetDateTime) -> Result<Price> {
        match tokio::time::timeout(self.timeout, self.inner.current_price(kind, at)).await {
            Ok(Ok(price)) => Ok(price),
            Ok(Err(EngineError::OracleUnavailable(msg))) => {
                warn!(kind = kind.as_str(), "Price oracle failed: {}", msg);
                Err(EngineError::OracleUnavailable(msg))
            }
            Ok(Err(e)) => {
                warn!(kind = kind.as_str(), "Price oracle failed: {}", e);
                Err(EngineError::OracleUnavailable(e.to_string()))
            }
            Err(_) => {
                warn!(
                    kind = kind.as_str(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Price oracle timed out"
                );
                Err(EngineError::OracleUnavailable(format!(
                    "no {} price within {}ms",
                    kind.as_str(),
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

/// Oracle serving configured prices; they can be moved at runtime
pub struct FixedPriceOracle {
    prices: RwLock<(Price, Price)>,
}

impl FixedPriceOracle {
    pub fn new(reference: Price, storage: Price) -> Self {
        Self {
            prices: RwLock::new((reference, storage)),
        }
    }

    pub fn set_price(&self, kind: GasPriceKind, price: Price) {
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        match kind {
            GasPriceKind::Reference => prices.0 = price,
            GasPriceKind::Storage => prices.1 = price,
        }
    }

    fn price(&self, kind: GasPriceKind) -> Price {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        match kind {
            GasPriceKind::Reference => prices.0,
            GasPriceKind::Storage => prices.1,
        }
    }
}

#[async_trait]
impl PriceOracle for FixedPriceOracle {
    async fn current_price(&self, kind: GasPriceKind, _at: OffsetDateTime) -> Result<Price> {
        Ok(self.price(kind))
    }
}

#[derive(Debug, Deserialize)]
struct GasPriceResponse {
    price: Price,
}

/// Oracle backed by an external gas price feed over HTTP
pub struct HttpPriceOracle {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpPriceOracle {
    pub fn new(base_url: &str, request_timeout_ms: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| EngineError::Internal(e.into()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn current_price(&self, kind: GasPriceKind, at: OffsetDateTime) -> Result<Price> {
        let url = format!("{}/v1/gas-price", self.base_url);
        let timestamp = at.unix_timestamp().to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[("kind", kind.as_str()), ("at", timestamp.as_str())])
            .send()
            .await
            .map_err(|e| EngineError::OracleUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::OracleUnavailable(format!(
                "price feed returned {}",
                status
            )));
        }

        let body: GasPriceResponse = response
            .json()
            .await
            .map_err(|e| EngineError::OracleUnavailable(format!("malformed response: {}", e)))?;

        Ok(body.price)
    }
}

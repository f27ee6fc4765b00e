//! Thin asynchronous client for the CBR daily rates mirror.
//!
//! - Reads the USD→RUB rate from `daily_json.js`.
//! - Keeps the rate for the current Moscow day in memory and on disk, and
//!   falls back to the last stored rate when the mirror is unreachable.

use std::{path::PathBuf, sync::Arc, time::Duration};

use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::infra::cache::{
    day_key, default_cache_dir, load_rate_cache, save_rate_cache, ExchangeRateData,
};
use crate::util::version::user_agent;

pub const DEFAULT_BASE_URL: &str = "https://www.cbr-xml-daily.ru/";
const DAILY_PATH: &str = "daily_json.js";

/// How often a long-running caller should re-check the rate.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum CbrClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Cached,
    Stale,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RatePayload {
    pub data: ExchangeRateData,
    pub status: CacheStatus,
}

#[derive(Debug, Deserialize)]
struct DailyDto {
    #[serde(rename = "Date", default)]
    date: Option<String>,
    #[serde(rename = "Valute", default)]
    valute: Option<ValuteDto>,
}

#[derive(Debug, Deserialize)]
struct ValuteDto {
    #[serde(rename = "USD")]
    usd: Option<CurrencyDto>,
}

#[derive(Debug, Deserialize)]
struct CurrencyDto {
    #[serde(rename = "Value")]
    value: f64,
    #[serde(rename = "Nominal", default = "one")]
    nominal: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Clone)]
pub struct CbrClient {
    http: Client,
    base_url: Url,
    memory: Arc<Mutex<Option<ExchangeRateData>>>,
    cache_dir: Option<PathBuf>,
}

impl CbrClient {
    pub fn new() -> Result<Self, CbrClientError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base: &str) -> Result<Self, CbrClientError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            http,
            base_url,
            memory: Arc::new(Mutex::new(None)),
            cache_dir: Some(default_cache_dir()),
        })
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Keep the rate in memory only.
    pub fn without_disk_cache(mut self) -> Self {
        self.cache_dir = None;
        self
    }

    /// Rate for today, fetching only when nothing fresh is cached.
    pub async fn get_usd_rub(&self) -> Result<RatePayload, CbrClientError> {
        if let Some(data) = self.cached_usd_rub().await {
            return Ok(RatePayload {
                data,
                status: CacheStatus::Cached,
            });
        }

        match self.refresh_usd_rub().await {
            Ok(data) => Ok(RatePayload {
                data,
                status: CacheStatus::Fresh,
            }),
            Err(error) => {
                if let Some(data) = self.last_known().await {
                    warn!(
                        rate = data.rate,
                        day = %data.day_key,
                        "rate fetch failed ({error}); using last stored rate"
                    );
                    return Ok(RatePayload {
                        data,
                        status: CacheStatus::Stale,
                    });
                }
                Err(error)
            }
        }
    }

    /// Today's rate from memory or disk, without touching the network.
    pub async fn cached_usd_rub(&self) -> Option<ExchangeRateData> {
        let today = day_key(OffsetDateTime::now_utc());

        if let Some(data) = self
            .memory
            .lock()
            .await
            .as_ref()
            .filter(|data| data.is_fresh(&today))
        {
            debug!(rate = data.rate, "serving in-memory rate");
            return Some(data.clone());
        }

        // Read the file without holding the lock.
        let disk = self
            .cache_dir
            .as_deref()
            .and_then(load_rate_cache)
            .filter(|data| data.is_fresh(&today))?;
        info!(rate = disk.rate, day = %disk.day_key, "using rate cached on disk");
        *self.memory.lock().await = Some(disk.clone());
        Some(disk)
    }

    /// Fetch from the mirror regardless of cache state and store the result.
    pub async fn refresh_usd_rub(&self) -> Result<ExchangeRateData, CbrClientError> {
        let url = self.base_url.join(DAILY_PATH)?;
        info!(%url, "fetching USD/RUB rate");

        let daily: DailyDto = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let data = parse_daily(daily, OffsetDateTime::now_utc())?;

        if let Some(dir) = self.cache_dir.as_deref() {
            if let Err(e) = save_rate_cache(dir, &data) {
                warn!("failed to save rate cache: {e}");
            }
        }
        *self.memory.lock().await = Some(data.clone());
        Ok(data)
    }

    async fn last_known(&self) -> Option<ExchangeRateData> {
        if let Some(data) = self.memory.lock().await.clone() {
            return Some(data);
        }
        self.cache_dir.as_deref().and_then(load_rate_cache)
    }

    /// Re-check the rate every `every` and publish each successful value.
    ///
    /// The receiver starts at `initial`; failed refreshes keep the last value.
    /// The task ends once every receiver is dropped. Must be called inside a
    /// tokio runtime.
    pub fn watch_usd_rub(
        self,
        initial: f64,
        every: Duration,
    ) -> (watch::Receiver<f64>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(initial);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!("rate watcher dropped, stopping refresh");
                        break;
                    }
                    _ = ticker.tick() => {}
                }
                match self.get_usd_rub().await {
                    Ok(payload) => {
                        // A closed channel is picked up by the select above.
                        let _ = tx.send(payload.data.rate);
                    }
                    Err(e) => warn!("scheduled rate refresh failed: {e}"),
                }
            }
        });
        (rx, handle)
    }
}

fn parse_daily(daily: DailyDto, now: OffsetDateTime) -> Result<ExchangeRateData, CbrClientError> {
    let usd = daily
        .valute
        .and_then(|valute| valute.usd)
        .ok_or_else(|| CbrClientError::Api("response has no USD quote".into()))?;

    let rate = if usd.nominal > 0.0 {
        usd.value / usd.nominal
    } else {
        usd.value
    };
    if !rate.is_finite() || rate <= 0.0 {
        return Err(CbrClientError::Api(format!("invalid USD rate {rate}")));
    }

    Ok(ExchangeRateData::new(
        rate,
        daily.date.unwrap_or_default(),
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn daily(json: &str) -> DailyDto {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_usd_quote() {
        let dto = daily(
            r#"{"Date":"2025-08-30T11:30:00+03:00","Valute":{"USD":{"CharCode":"USD","Nominal":1,"Value":80.3316}}}"#,
        );
        let data = parse_daily(dto, datetime!(2025-08-30 09:00 UTC)).unwrap();
        assert_eq!(data.rate, 80.3316);
        assert_eq!(data.observed_date, "2025-08-30T11:30:00+03:00");
        assert_eq!(data.day_key, "20250830");
    }

    #[test]
    fn divides_by_nominal() {
        let dto = daily(r#"{"Valute":{"USD":{"Nominal":10,"Value":803.0}}}"#);
        let data = parse_daily(dto, datetime!(2025-08-30 09:00 UTC)).unwrap();
        assert!((data.rate - 80.3).abs() < 1e-9);
    }

    #[test]
    fn rejects_missing_or_bad_rate() {
        let missing = daily(r#"{"Valute":{}}"#);
        assert!(matches!(
            parse_daily(missing, OffsetDateTime::now_utc()),
            Err(CbrClientError::Api(_))
        ));

        let zero = daily(r#"{"Valute":{"USD":{"Value":0}}}"#);
        assert!(matches!(
            parse_daily(zero, OffsetDateTime::now_utc()),
            Err(CbrClientError::Api(_))
        ));
    }
}

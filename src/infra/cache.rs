//! On-disk cache for the daily USD→RUB rate.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};

const CACHE_FILENAME: &str = "usd_rub_rate_v1.json";
const APP_DIR: &str = "design-quote";

/// Rates are published per Moscow calendar day.
const MOSCOW_OFFSET_HOURS: i8 = 3;

/// A USD→RUB observation together with the day it was stored on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateData {
    /// Roubles per dollar.
    pub rate: f64,
    /// Publication date reported by the source, as sent.
    pub observed_date: String,
    /// RFC 3339 timestamp of when the rate was stored locally.
    pub stored_at: String,
    /// `YYYYMMDD` of the Moscow day the rate was stored on.
    pub day_key: String,
}

impl ExchangeRateData {
    pub fn new(rate: f64, observed_date: String, now: OffsetDateTime) -> Self {
        Self {
            rate,
            observed_date,
            stored_at: now.format(&Rfc3339).unwrap_or_default(),
            day_key: day_key(now),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.rate.is_finite() && self.rate > 0.0
    }

    /// Usable without refetching on the day identified by `today`.
    pub fn is_fresh(&self, today: &str) -> bool {
        self.is_valid() && self.day_key == today
    }

    /// Human-readable age relative to `now`, or `"?"` if the timestamp is unreadable.
    pub fn age_string(&self, now: OffsetDateTime) -> String {
        let Ok(stored) = OffsetDateTime::parse(&self.stored_at, &Rfc3339) else {
            return "?".to_string();
        };
        let secs = (now - stored).whole_seconds().max(0);
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }
}

/// `YYYYMMDD` of the Moscow calendar day containing `now`.
pub fn day_key(now: OffsetDateTime) -> String {
    let offset = UtcOffset::from_hms(MOSCOW_OFFSET_HOURS, 0, 0).unwrap_or(UtcOffset::UTC);
    let date = now.to_offset(offset).date();
    format!(
        "{:04}{:02}{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Platform data directory for the cache file.
pub fn default_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn cache_file(dir: &Path) -> PathBuf {
    dir.join(CACHE_FILENAME)
}

/// Load the cached rate from `dir`, if one was stored. Freshness is not checked here.
pub fn load_rate_cache(dir: &Path) -> Option<ExchangeRateData> {
    let path = cache_file(dir);

    if !path.exists() {
        debug!(path = %path.display(), "no rate cache found");
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str::<ExchangeRateData>(&content) {
            Ok(data) if data.is_valid() => {
                debug!(path = %path.display(), rate = data.rate, "loaded rate cache");
                Some(data)
            }
            Ok(data) => {
                warn!(rate = data.rate, "discarding rate cache with invalid rate");
                None
            }
            Err(e) => {
                warn!("failed to parse rate cache: {e}");
                None
            }
        },
        Err(e) => {
            warn!("failed to read rate cache: {e}");
            None
        }
    }
}

pub fn save_rate_cache(dir: &Path, data: &ExchangeRateData) -> Result<(), std::io::Error> {
    fs::create_dir_all(dir)?;
    let path = cache_file(dir);
    let content = serde_json::to_string_pretty(data)?;
    fs::write(&path, content)?;
    info!(
        rate = data.rate,
        day = %data.day_key,
        path = %path.display(),
        "saved rate cache"
    );
    Ok(())
}

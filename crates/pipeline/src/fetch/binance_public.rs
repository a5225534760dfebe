//! Daily aggTrades archives from the public Binance data bucket.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use tracing::debug;

use market_etl_core::error::FetchError;
use market_etl_core::time_grid::days_inclusive;
use market_etl_data::layout::{agg_trades_stem, agg_trades_zip_path, AGG_TRADES_PREFIX};

use super::download_to;

pub const DEFAULT_BASE_URL: &str = "https://data.binance.vision";

/// Per-symbol counters for one date range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeDownload {
    pub downloaded: usize,
    /// Already on disk.
    pub skipped: usize,
    /// Not published for that day.
    pub missing: usize,
    pub bytes: u64,
}

pub struct BinancePublicFetcher {
    http: Client,
    base_url: String,
    root: PathBuf,
}

impl BinancePublicFetcher {
    /// # Errors
    /// Returns [`FetchError::Network`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        root: impl Into<PathBuf>,
        request_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            root: root.into(),
        })
    }

    #[must_use]
    pub fn day_url(&self, symbol: &str, day: NaiveDate) -> String {
        format!(
            "{}/{AGG_TRADES_PREFIX}/{symbol}/{}.zip",
            self.base_url,
            agg_trades_stem(symbol, day)
        )
    }

    /// `{root}/data/futures/um/daily/aggTrades/{symbol}/{symbol}-aggTrades-{day}.zip`
    #[must_use]
    pub fn target_path(&self, symbol: &str, day: NaiveDate) -> PathBuf {
        agg_trades_zip_path(&self.root, symbol, day)
    }

    /// Downloads every day of `[start, end]` for `symbol`, skipping files
    /// already on disk.
    ///
    /// # Errors
    /// Returns [`FetchError`] on the first network, HTTP or IO failure other
    /// than a 404. Days completed before the failure stay on disk.
    pub async fn download_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RangeDownload, FetchError> {
        let mut result = RangeDownload::default();

        for day in days_inclusive(start, end) {
            let target = self.target_path(symbol, day);
            if target.is_file() {
                result.skipped += 1;
                continue;
            }

            let response = self
                .http
                .get(self.day_url(symbol, day))
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            match response.status() {
                StatusCode::NOT_FOUND => {
                    debug!(%symbol, %day, "Not published");
                    result.missing += 1;
                }
                status if status.is_success() => {
                    result.bytes += download_to(response, &target).await?;
                    result.downloaded += 1;
                }
                status => {
                    return Err(FetchError::Other(format!(
                        "{symbol} {day}: HTTP {status}"
                    )));
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, day).unwrap()
    }

    #[test]
    fn test_paths() {
        let fetcher =
            BinancePublicFetcher::new(DEFAULT_BASE_URL, "/opt/zip", Duration::from_secs(5)).unwrap();
        assert_eq!(
            fetcher.day_url("BTCUSDT", d(1)),
            "https://data.binance.vision/data/futures/um/daily/aggTrades/BTCUSDT/BTCUSDT-aggTrades-2025-02-01.zip"
        );
        assert_eq!(
            fetcher.target_path("BTCUSDT", d(1)),
            PathBuf::from("/opt/zip/data/futures/um/daily/aggTrades/BTCUSDT/BTCUSDT-aggTrades-2025-02-01.zip")
        );
    }

    #[tokio::test]
    async fn test_download_range_skips_and_misses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/futures/um/daily/aggTrades/XUSDT/XUSDT-aggTrades-2025-02-02.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zip".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/futures/um/daily/aggTrades/XUSDT/XUSDT-aggTrades-2025-02-03.zip"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher =
            BinancePublicFetcher::new(&server.uri(), dir.path(), Duration::from_secs(5)).unwrap();
        let existing = fetcher.target_path("XUSDT", d(1));
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, b"old").unwrap();

        let result = fetcher.download_range("XUSDT", d(1), d(3)).await.unwrap();
        assert_eq!(
            result,
            RangeDownload {
                downloaded: 1,
                skipped: 1,
                missing: 1,
                bytes: 3
            }
        );
        assert!(fetcher.target_path("XUSDT", d(2)).is_file());
    }

    #[tokio::test]
    async fn test_server_error_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let fetcher =
            BinancePublicFetcher::new(&server.uri(), dir.path(), Duration::from_secs(5)).unwrap();
        assert!(fetcher.download_range("XUSDT", d(1), d(1)).await.is_err());
    }
}

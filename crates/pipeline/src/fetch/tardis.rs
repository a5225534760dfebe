//! Tardis.dev datasets API fetcher.
//!
//! Files are served as
//! `{base_url}/v1/{exchange}/{data_type}/{YYYY}/{MM}/{DD}/{SYMBOL}.csv.gz`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use market_etl_core::config::TardisConfig;
use market_etl_core::error::FetchError;
use market_etl_core::traits::{Fetcher, SymbolFetch};
use market_etl_data::fetched_file_path;

use super::download_to;

pub struct TardisFetcher {
    http: Client,
    base_url: String,
    exchange: String,
    data_type: String,
    api_key: Option<SecretString>,
    download_root: PathBuf,
    concurrency: usize,
}

impl TardisFetcher {
    /// Creates a fetcher storing files below `download_root`.
    ///
    /// # Errors
    /// Returns [`FetchError::Network`] if the HTTP client cannot be built.
    pub fn new(
        config: &TardisConfig,
        download_root: impl Into<PathBuf>,
        concurrency: usize,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            exchange: config.exchange.clone(),
            data_type: config.data_type.clone(),
            api_key: config
                .api_key
                .as_ref()
                .map(|k| SecretString::from(k.expose_secret().to_string())),
            download_root: download_root.into(),
            concurrency: concurrency.max(1),
        })
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    #[must_use]
    pub fn file_url(&self, symbol: &str, day: NaiveDate) -> String {
        format!(
            "{}/v1/{}/{}/{}/{}.csv.gz",
            self.base_url,
            self.exchange,
            self.data_type,
            day.format("%Y/%m/%d"),
            symbol.to_uppercase()
        )
    }

    async fn fetch_symbol(&self, symbol: &str, day: NaiveDate) -> Result<SymbolFetch, FetchError> {
        let url = self.file_url(symbol, day);
        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                return Ok(SymbolFetch::Failed {
                    symbol: symbol.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(%symbol, %day, "No file on vendor");
                return Ok(SymbolFetch::NotFound {
                    symbol: symbol.to_string(),
                });
            }
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                return Err(FetchError::Unauthorized {
                    status_code: status.as_u16(),
                });
            }
            status if !status.is_success() => {
                return Ok(SymbolFetch::Failed {
                    symbol: symbol.to_string(),
                    reason: format!("HTTP {status}"),
                });
            }
            _ => {}
        }

        let target = fetched_file_path(&self.download_root, symbol, day);
        match download_to(response, &target).await {
            Ok(bytes) => Ok(SymbolFetch::Downloaded {
                symbol: symbol.to_string(),
                bytes,
            }),
            Err(e) => {
                warn!(%symbol, %day, "Download failed: {e}");
                Ok(SymbolFetch::Failed {
                    symbol: symbol.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl Fetcher for TardisFetcher {
    async fn fetch(
        &self,
        symbols: &[String],
        day: NaiveDate,
    ) -> Result<Vec<SymbolFetch>, FetchError> {
        let results: Vec<Result<SymbolFetch, FetchError>> = stream::iter(symbols.iter().cloned())
            .map(|symbol| async move { self.fetch_symbol(&symbol, day).await })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        results.into_iter().collect()
    }

    fn name(&self) -> &str {
        "tardis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn config(base_url: &str, key: Option<&str>) -> TardisConfig {
        TardisConfig {
            base_url: base_url.to_string(),
            api_key: key.map(|k| SecretString::from(k.to_string())),
            ..TardisConfig::default()
        }
    }

    #[test]
    fn test_file_url() {
        let fetcher = TardisFetcher::new(&config("https://datasets.tardis.dev/", None), "/tmp", 1)
            .unwrap();
        assert_eq!(
            fetcher.file_url("btcusdt", day()),
            "https://datasets.tardis.dev/v1/binance-futures/derivative_ticker/2025/06/01/BTCUSDT.csv.gz"
        );
    }

    #[tokio::test]
    async fn test_fetch_mixed_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/binance-futures/derivative_ticker/2025/06/01/AAA.csv.gz"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"gzdata".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/binance-futures/derivative_ticker/2025/06/01/BBB.csv.gz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/binance-futures/derivative_ticker/2025/06/01/CCC.csv.gz"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = TardisFetcher::new(&config(&server.uri(), Some("secret")), dir.path(), 3)
            .unwrap();
        let symbols = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
        let mut results = fetcher.fetch(&symbols, day()).await.unwrap();
        results.sort_by(|a, b| a.symbol().cmp(b.symbol()));

        assert_eq!(
            results[0],
            SymbolFetch::Downloaded {
                symbol: "AAA".into(),
                bytes: 6
            }
        );
        assert_eq!(results[1], SymbolFetch::NotFound { symbol: "BBB".into() });
        assert!(matches!(results[2], SymbolFetch::Failed { .. }));

        let stored = fetched_file_path(dir.path(), "AAA", day());
        assert_eq!(std::fs::read(&stored).unwrap(), b"gzdata");
        assert!(!fetched_file_path(dir.path(), "CCC", day()).exists());
    }

    #[tokio::test]
    async fn test_unauthorized_fails_whole_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = TardisFetcher::new(&config(&server.uri(), None), dir.path(), 2).unwrap();
        let err = fetcher
            .fetch(&["AAA".to_string()], day())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unauthorized { status_code: 401 }));
    }
}

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use market_etl_core::TardisConfig;
use market_etl_data::{CsvStorage, DataLayout};
use market_etl_pipeline::{DayPipeline, StageWarning, TardisFetcher};

fn gz(body: &str) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(body.as_bytes()).unwrap();
    enc.finish().unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[tokio::test]
async fn test_day_against_mock_vendor() {
    let server = MockServer::start().await;
    let body = "timestamp,funding_rate,mark_price,index_price,funding_timestamp\n\
                1748736000000000,0.0001,10,10,1748764800000000\n\
                1748818800000000,0.0003,12,12,1748822400000000\n";
    Mock::given(method("GET"))
        .and(path("/v1/binance-futures/derivative_ticker/2025/06/01/BTCUSDT.csv.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gz(body)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/binance-futures/derivative_ticker/2025/06/01/NEWUSDT.csv.gz"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    let config = TardisConfig {
        base_url: server.uri(),
        ..TardisConfig::default()
    };
    let fetcher = TardisFetcher::new(&config, layout.download_root(), 2).unwrap();
    let pipeline = DayPipeline::new(Arc::new(fetcher), layout.clone(), 2);

    let symbols = vec!["BTCUSDT".to_string(), "NEWUSDT".to_string()];
    let report = pipeline.run_day(day(), &symbols).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.fetch.downloaded, 1);
    assert_eq!(report.fetch.not_found, 1);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, StageWarning::FetchMiss { symbol, .. } if symbol == "NEWUSDT")));
    assert!(layout.archive_path(day()).is_file());
    assert!(!layout.fetched_path("BTCUSDT", day()).exists());
}

#[tokio::test]
async fn test_rejected_credentials_fail_the_day() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    let config = TardisConfig {
        base_url: server.uri(),
        ..TardisConfig::default()
    };
    let fetcher = TardisFetcher::new(&config, layout.download_root(), 1).unwrap();
    let pipeline = DayPipeline::new(Arc::new(fetcher), layout, 1);

    let err = pipeline
        .run_day(day(), &["BTCUSDT".to_string()])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("2025-06-01"));
    assert!(!err.is_run_fatal());
}

#[tokio::test]
async fn test_output_values_before_purge() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    let src = layout.extracted_path("BTCUSDT", day());
    std::fs::create_dir_all(src.parent().unwrap()).unwrap();
    std::fs::write(
        &src,
        "timestamp,funding_rate,mark_price,index_price,funding_timestamp\n\
         1748818800000000,0.0003,12,12,1748822400000000\n",
    )
    .unwrap();
    let dest = layout.output_path("BTCUSDT", day());
    market_etl_data::convert_file(&src, &dest, day()).unwrap();

    let records = CsvStorage::read_output_records(&dest).unwrap();
    assert_eq!(records.len(), 24);
    // 23:00 observation back-filled to every earlier hour
    assert!(records.iter().all(|r| r.last_funding_rate.to_string() == "0.0003"));
    assert_eq!(records[23].timestamp_ms, 1_748_818_800_000);
}

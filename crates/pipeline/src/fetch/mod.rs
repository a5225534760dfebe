//! Fetch collaborators.

pub mod binance_public;
pub mod tardis;

pub use binance_public::{BinancePublicFetcher, RangeDownload};
pub use tardis::TardisFetcher;

use std::path::{Path, PathBuf};

use reqwest::Response;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use market_etl_core::error::FetchError;

/// Streams a response body to `target` through `{target}.part`, renaming on
/// completion. Returns bytes written.
pub(crate) async fn download_to(mut response: Response, target: &Path) -> Result<u64, FetchError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }
    let part = part_path(target);

    let written = async {
        let mut file = fs::File::create(&part).await?;
        let mut bytes = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        Ok::<_, FetchError>(bytes)
    }
    .await;

    match written {
        Ok(bytes) => {
            fs::rename(&part, target).await?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&part).await;
            Err(e)
        }
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

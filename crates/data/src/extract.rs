use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::DataError;

/// Decompresses a gzip file to `dest`, creating parent directories.
///
/// Output goes to `{dest}.part` first and is renamed on success, so a failed
/// decompression never leaves a truncated file at `dest`. Returns bytes
/// written.
///
/// # Errors
/// Returns [`DataError::Io`] if `src` is missing or not valid gzip.
pub fn gunzip_file(src: &Path, dest: &Path) -> Result<u64, DataError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let part = part_path(dest);

    let result = (|| -> Result<u64, DataError> {
        let mut decoder = GzDecoder::new(BufReader::new(File::open(src)?));
        let mut out = BufWriter::new(File::create(&part)?);
        let bytes = io::copy(&mut decoder, &mut out)?;
        out.flush()?;
        Ok(bytes)
    })();

    match result {
        Ok(bytes) => {
            fs::rename(&part, dest)?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(e)
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

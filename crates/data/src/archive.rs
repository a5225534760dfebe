//! Day archives: one `tar.gz` per day bundling every symbol's output file.

use std::fs::{self, File};
use std::path::PathBuf;

use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, info};

use crate::error::DataError;
use crate::layout::{archive_entry_name, DataLayout};

pub struct ArchiveWriter<'a> {
    layout: &'a DataLayout,
}

impl<'a> ArchiveWriter<'a> {
    pub fn new(layout: &'a DataLayout) -> Self {
        Self { layout }
    }

    /// Bundles `output/{symbol}/{settlement_ms}.csv` for each symbol into
    /// `final/funding_rate_{day}.tar.gz` and returns how many were added.
    ///
    /// Symbols without an output file are skipped. When none exist no
    /// archive is created. The archive is assembled under a `.partial` name
    /// and renamed into place once finished.
    ///
    /// # Errors
    /// Returns [`DataError::Io`] if the archive cannot be written.
    pub fn archive_day(&self, day: NaiveDate, symbols: &[String]) -> Result<usize, DataError> {
        let members: Vec<(PathBuf, String)> = symbols
            .iter()
            .map(|s| (self.layout.output_path(s, day), archive_entry_name(s, day)))
            .filter(|(path, _)| path.is_file())
            .collect();

        if members.is_empty() {
            debug!(%day, "No output files to archive");
            return Ok(0);
        }

        let dest = self.layout.archive_path(day);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = dest.with_extension("gz.partial");

        let written = (|| -> Result<(), DataError> {
            let encoder = GzEncoder::new(File::create(&partial)?, Compression::default());
            let mut builder = tar::Builder::new(encoder);
            for (path, entry) in &members {
                builder.append_path_with_name(path, entry)?;
            }
            builder.into_inner()?.finish()?;
            Ok(())
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, &dest)?;

        info!(%day, files = members.len(), archive = %dest.display(), "Archived day");
        Ok(members.len())
    }
}

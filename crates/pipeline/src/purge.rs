use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, warn};

use market_etl_data::layout::{DataLayout, DATA_TYPE_DIR};

use crate::report::{PurgeOutcome, PurgeReport};

/// Deletes a day's fetched, extracted and converted files for `symbols`,
/// then removes `{symbol}/funding_rate` and `{symbol}` directories that are
/// left empty. Best effort: every result is recorded, nothing is returned as
/// an error.
pub fn purge_day(layout: &DataLayout, day: NaiveDate, symbols: &[String]) -> PurgeReport {
    let mut report = PurgeReport::default();

    for symbol in symbols {
        for path in [
            layout.fetched_path(symbol, day),
            layout.extracted_path(symbol, day),
            layout.output_path(symbol, day),
        ] {
            let outcome = remove_file(&path);
            if let PurgeOutcome::Failed(reason) = &outcome {
                warn!(path = %path.display(), "Purge failed: {reason}");
            }
            report.record(path, outcome);
        }
    }

    for root in layout.intermediate_roots() {
        for symbol in symbols {
            let symbol_dir = root.join(symbol);
            for dir in [symbol_dir.join(DATA_TYPE_DIR), symbol_dir] {
                if remove_empty_dir(&dir) {
                    report.dirs_removed += 1;
                }
            }
        }
    }

    debug!(
        %day,
        deleted = report.deleted(),
        absent = report.absent(),
        failed = report.failed(),
        dirs = report.dirs_removed,
        "Purge finished"
    );
    report
}

fn remove_file(path: &Path) -> PurgeOutcome {
    match fs::remove_file(path) {
        Ok(()) => PurgeOutcome::Deleted,
        Err(e) if e.kind() == ErrorKind::NotFound => PurgeOutcome::Absent,
        Err(e) => PurgeOutcome::Failed(e.to_string()),
    }
}

/// `remove_dir` only succeeds on empty directories.
fn remove_empty_dir(dir: &Path) -> bool {
    dir.is_dir() && fs::remove_dir(dir).is_ok()
}

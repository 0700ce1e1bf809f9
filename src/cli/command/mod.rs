pub mod fetch;
pub mod filter;
pub mod stations;

use std::path::{Path, PathBuf};

pub use fetch::fetch;
pub use filter::filter;
pub use stations::stations;

/// Sibling of `report` named `<stem>-filtered.<ext>`.
pub fn make_filtered_file_name(report: &Path) -> PathBuf {
    let stem = report
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());
    let file_name = match report.extension() {
        Some(ext) => format!("{}-filtered.{}", stem, ext.to_string_lossy()),
        None => format!("{}-filtered", stem),
    };

    report.with_file_name(file_name)
}

// -- Tests -------------------------------------------------------------------

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Name of the per-run log file kept next to the zone files.
pub const LOG_FILE_NAME: &str = "czds-dl.log";

const ZONE_FILE_SUFFIX: &str = ".zone.gz";
const TEMP_SUFFIX: &str = ".tmp";

/// `<root>/YYYY-MM-DD`
pub fn dated_directory(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(date.format("%Y-%m-%d").to_string())
}

/// Final location of a zone file: `<dir>/<zone>.zone.gz`.
pub fn zone_file_path(dir: &Path, zone: &str) -> PathBuf {
    dir.join(format!("{}{}", zone, ZONE_FILE_SUFFIX))
}

/// `<final>.tmp`, in the same directory so the rename stays on one filesystem.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut name: OsString = final_path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Create the dated directory if needed and clear partial downloads a
/// killed run may have left. Returns the number of temp files removed.
pub fn prepare_output_directory(dir: &Path) -> io::Result<usize> {
    std::fs::create_dir_all(dir)?;
    remove_stale_temp_files(dir)
}

/// Remove `*.zone.gz.tmp` files from `dir`. Other files are left alone.
pub fn remove_stale_temp_files(dir: &Path) -> io::Result<usize> {
    let suffix = format!("{}{}", ZONE_FILE_SUFFIX, TEMP_SUFFIX);
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.ends_with(&suffix) && entry.file_type()?.is_file() {
            tracing::warn!("Removing partial download {}", entry.path().display());
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

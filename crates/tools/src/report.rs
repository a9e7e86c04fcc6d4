use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// ISO timestamp with `:` and `.` swapped for `-`, safe in file names.
#[must_use]
pub fn artifact_stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Writes `<dir>/<prefix>-<stamp>.json`, creating `dir` as needed.
///
/// # Errors
///
/// Fails when the directory or file cannot be written.
pub fn write_json_report<T: Serialize>(
    dir: &Path,
    prefix: &str,
    at: DateTime<Utc>,
    report: &T,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{prefix}-{}.json", artifact_stamp(at)));
    let body = serde_json::to_string_pretty(report).context("encoding report")?;
    std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn stamp_has_no_colons_or_dots() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(artifact_stamp(at), "2026-03-04T05-06-07-000Z");
    }
}

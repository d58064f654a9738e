//! Source tree traversal.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use whisperflux_types::{MigrateError, WorkUnit};

use crate::{FilterConfig, Stats};

/// File suffix of whisper archives.
pub const ARCHIVE_SUFFIX: &str = ".wsp";

/// Outcome of a completed walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Units handed on.
    pub emitted: u64,
    /// Eligible units suppressed by the skip cursor.
    pub suppressed: u64,
    /// False if a skip cursor was configured and never seen.
    pub cursor_matched: bool,
    /// True if the walk stopped early because the consumer went away.
    pub interrupted: bool,
}

/// Returns true if `path` passes the suffix, exclude and include filters.
///
/// An empty include matches everything; an empty exclude matches nothing.
#[must_use]
pub fn is_candidate(path: &Path, is_dir: bool, filter: &FilterConfig) -> bool {
    if is_dir {
        return false;
    }
    let key = path.to_string_lossy();
    if !key.ends_with(ARCHIVE_SUFFIX) {
        return false;
    }
    let excluded = filter
        .exclude
        .as_deref()
        .is_some_and(|exclude| !exclude.is_empty() && key.contains(exclude));
    if excluded {
        return false;
    }
    filter
        .include
        .as_deref()
        .is_none_or(|include| key.contains(include))
}

/// Walks a whisper tree in a stable order and emits eligible units.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    filter: FilterConfig,
}

impl Discovery {
    /// Creates a walker over `root`.
    #[must_use]
    pub const fn new(root: PathBuf, filter: FilterConfig) -> Self {
        Self { root, filter }
    }

    /// Walks the tree, calling `emit` for each eligible unit in traversal
    /// order. The walk stops early if `emit` returns false.
    ///
    /// Entries are visited depth-first with siblings sorted by file name, so
    /// the order is the same on every run over an unchanged tree.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Discovery`] on the first entry that cannot be
    /// read, including a missing root.
    pub fn run<F>(&self, stats: &Stats, mut emit: F) -> Result<DiscoverySummary, MigrateError>
    where
        F: FnMut(WorkUnit) -> bool,
    {
        let mut cursor = self.filter.skip_until.as_deref();
        let mut summary = DiscoverySummary {
            cursor_matched: cursor.is_none(),
            ..DiscoverySummary::default()
        };

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            // the cursor is compared before a walk error is raised
            let visited = match &entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => e.path(),
            };
            if let Some(path) = visited.filter(|p| cursor.is_some_and(|c| c == *p)) {
                cursor = None;
                summary.cursor_matched = true;
                tracing::info!(
                    path = %path.display(),
                    skipped = summary.suppressed,
                    "found skip cursor, disabling skipping"
                );
            }

            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map_or_else(|| self.root.display().to_string(), |p| p.display().to_string());
                MigrateError::Discovery(format!("{path}: {e}"))
            })?;
            let path = entry.path();

            if !is_candidate(path, entry.file_type().is_dir(), &self.filter) {
                continue;
            }

            if cursor.is_some() {
                summary.suppressed += 1;
                Stats::incr(&stats.suppressed);
                continue;
            }

            if !emit(WorkUnit::new(entry.into_path())) {
                tracing::debug!("work queue closed, stopping walk");
                summary.interrupted = true;
                break;
            }
            summary.emitted += 1;
            Stats::incr(&stats.discovered);
        }

        if let Some(cursor) = cursor.filter(|_| !summary.interrupted) {
            tracing::warn!(
                cursor = %cursor.display(),
                suppressed = summary.suppressed,
                "skip cursor was never found, nothing was migrated"
            );
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"").unwrap();
        }
        dir
    }

    fn collect(dir: &TempDir, filter: FilterConfig) -> (Vec<String>, DiscoverySummary) {
        let mut seen = Vec::new();
        let summary = Discovery::new(dir.path().to_path_buf(), filter)
            .run(&Stats::new(), |unit| {
                let rel = unit.path().strip_prefix(dir.path()).unwrap();
                seen.push(rel.to_string_lossy().into_owned());
                true
            })
            .unwrap();
        (seen, summary)
    }

    #[test]
    fn test_is_candidate() {
        let none = FilterConfig::default();
        assert!(is_candidate(Path::new("/w/a/b.wsp"), false, &none));
        assert!(!is_candidate(Path::new("/w/a/b.wsp"), true, &none));
        assert!(!is_candidate(Path::new("/w/a/b.wsp.bak"), false, &none));

        let filter = FilterConfig {
            include: Some("servers".to_string()),
            exclude: Some("tmp".to_string()),
            skip_until: None,
        };
        assert!(is_candidate(Path::new("/w/servers/load.wsp"), false, &filter));
        assert!(!is_candidate(Path::new("/w/servers/tmp/load.wsp"), false, &filter));
        assert!(!is_candidate(Path::new("/w/network/rx.wsp"), false, &filter));

        let empty = FilterConfig {
            include: Some(String::new()),
            exclude: Some(String::new()),
            skip_until: None,
        };
        assert!(is_candidate(Path::new("/w/anything.wsp"), false, &empty));
    }

    #[test]
    fn test_walk_order_is_sorted() {
        let dir = tree(&["b/y.wsp", "a/z.wsp", "a/x.wsp", "c.wsp", "notes.txt"]);
        let (seen, summary) = collect(&dir, FilterConfig::default());

        assert_eq!(seen, vec!["a/x.wsp", "a/z.wsp", "b/y.wsp", "c.wsp"]);
        assert_eq!(summary.emitted, 4);
        assert!(summary.cursor_matched);
    }

    #[test]
    fn test_skip_cursor_resumes_at_cursor() {
        let dir = tree(&["a.wsp", "b.wsp", "c.wsp", "d.wsp"]);
        let filter = FilterConfig {
            skip_until: Some(dir.path().join("c.wsp")),
            ..FilterConfig::default()
        };
        let (seen, summary) = collect(&dir, filter);

        assert_eq!(seen, vec!["c.wsp", "d.wsp"]);
        assert_eq!(summary.suppressed, 2);
        assert!(summary.cursor_matched);
    }

    #[test]
    fn test_skip_cursor_on_directory() {
        let dir = tree(&["a/x.wsp", "b/y.wsp", "b/z.wsp"]);
        let filter = FilterConfig {
            skip_until: Some(dir.path().join("b")),
            ..FilterConfig::default()
        };
        let (seen, _) = collect(&dir, filter);
        assert_eq!(seen, vec!["b/y.wsp", "b/z.wsp"]);
    }

    #[test]
    fn test_skip_cursor_never_found() {
        let dir = tree(&["a.wsp", "b.wsp"]);
        let filter = FilterConfig {
            skip_until: Some(dir.path().join("zzz.wsp")),
            ..FilterConfig::default()
        };
        let (seen, summary) = collect(&dir, filter);

        assert!(seen.is_empty());
        assert_eq!(summary.suppressed, 2);
        assert!(!summary.cursor_matched);
    }

    #[test]
    fn test_walk_stops_when_emit_refuses() {
        let dir = tree(&["a.wsp", "b.wsp", "c.wsp"]);
        let stats = Stats::new();
        let mut calls = 0;
        let summary = Discovery::new(dir.path().to_path_buf(), FilterConfig::default())
            .run(&stats, |_| {
                calls += 1;
                calls < 2
            })
            .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(summary.emitted, 1);
        assert!(summary.interrupted);
        assert_eq!(stats.snapshot().discovered, 1);
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let result = Discovery::new(dir.path().join("missing"), FilterConfig::default())
            .run(&Stats::new(), |_| true);
        assert!(matches!(result, Err(MigrateError::Discovery(_))));
    }

    #[test]
    fn test_walk_error_at_cursor_is_still_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let filter = FilterConfig {
            skip_until: Some(missing.clone()),
            ..FilterConfig::default()
        };
        let mut emitted = 0;

        let result = Discovery::new(missing, filter).run(&Stats::new(), |_| {
            emitted += 1;
            true
        });

        assert!(matches!(result, Err(MigrateError::Discovery(_))));
        assert_eq!(emitted, 0);
    }
}

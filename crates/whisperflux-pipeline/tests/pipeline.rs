//! End-to-end pipeline tests against an in-memory source and destination.
//!
//! Work units are empty `.wsp` files in a temp directory so discovery walks a
//! real tree; their points come from the fake source, keyed by path.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use whisperflux_pipeline::{
    FATAL, FilterConfig, Outcome, Pipeline, PipelineConfig, ReadFailurePolicy, WriteFailurePolicy,
};
use whisperflux_types::{
    ArchiveHandle, ArchiveSource, MigrateError, Point, PointWriter, ReadMode, Series, TimeRange,
    WorkUnit,
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct FakeError(String);

/// Archives by path, finest resolution first.
#[derive(Debug, Clone, Default)]
struct FakeSource {
    archives: Arc<HashMap<PathBuf, Vec<Vec<Point>>>>,
    reads: Arc<AtomicUsize>,
}

impl FakeSource {
    fn new(archives: HashMap<PathBuf, Vec<Vec<Point>>>) -> Self {
        Self {
            archives: Arc::new(archives),
            reads: Arc::default(),
        }
    }
}

#[derive(Debug)]
struct FakeHandle {
    archives: Vec<Vec<Point>>,
}

impl ArchiveSource for FakeSource {
    type Handle = FakeHandle;

    fn open(&self, path: &Path) -> Result<FakeHandle, FakeError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.archives
            .get(path)
            .map(|archives| FakeHandle {
                archives: archives.clone(),
            })
            .ok_or_else(|| FakeError(format!("corrupt archive {}", path.display())))
    }
}

impl ArchiveHandle for FakeHandle {
    type Error = FakeError;

    fn fetch(&mut self, range: TimeRange) -> Result<Vec<Point>, FakeError> {
        Ok(self.archives[0]
            .iter()
            .copied()
            .filter(|p| range.contains(p.timestamp))
            .collect())
    }

    fn archive_count(&self) -> usize {
        self.archives.len()
    }

    fn point_capacity(&self) -> usize {
        self.archives.iter().map(Vec::len).sum()
    }

    fn dump_archive(&mut self, index: usize) -> Result<Vec<Point>, FakeError> {
        self.archives
            .get(index)
            .cloned()
            .ok_or_else(|| FakeError(format!("no archive {index}")))
    }
}

/// Destination keyed by measurement then timestamp; later writes overwrite.
#[derive(Debug, Default)]
struct MemoryWriter {
    store: Mutex<BTreeMap<String, BTreeMap<u32, f64>>>,
    writes: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    fail_on: Option<String>,
}

impl MemoryWriter {
    fn contents(&self) -> BTreeMap<String, BTreeMap<u32, f64>> {
        self.store.lock().unwrap().clone()
    }
}

#[async_trait]
impl PointWriter for MemoryWriter {
    type Error = FakeError;

    async fn write(&self, series: &Series) -> Result<(), FakeError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(series.name.as_str()) {
            return Err(FakeError(format!("rejected {}", series.name)));
        }
        let mut store = self.store.lock().unwrap();
        let measurement = store.entry(series.name.clone()).or_default();
        for point in &series.points {
            measurement.insert(point.timestamp, point.value);
        }
        Ok(())
    }
}

/// Shares one writer between runs.
#[derive(Debug, Clone)]
struct SharedWriter(Arc<MemoryWriter>);

#[async_trait]
impl PointWriter for SharedWriter {
    type Error = FakeError;

    async fn write(&self, series: &Series) -> Result<(), FakeError> {
        self.0.write(series).await
    }
}

fn tree(names: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in names {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }
    dir
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        root: root.to_path_buf(),
        read_mode: ReadMode::Full,
        extract_workers: 3,
        load_workers: 3,
        queue_capacity: 1,
        stats_interval: None,
        exit_grace: Duration::from_secs(5),
        ..PipelineConfig::default()
    }
}

fn series(points: &[(u32, f64)]) -> BTreeMap<u32, f64> {
    points.iter().copied().collect()
}

/// Units `a`, `b` and an unreadable `c`.
fn abc(dir: &TempDir) -> FakeSource {
    FakeSource::new(HashMap::from([
        (dir.path().join("a.wsp"), vec![vec![Point::new(100, 1.0)]]),
        (
            dir.path().join("b.wsp"),
            vec![vec![Point::new(100, 2.0), Point::new(200, 3.0)]],
        ),
    ]))
}

#[tokio::test]
async fn test_skipped_read_failure_leaves_unit_in_progress() {
    let dir = tree(&["a.wsp", "b.wsp", "c.wsp"]);
    let writer = Arc::new(MemoryWriter::default());
    let config = PipelineConfig {
        read_failure: ReadFailurePolicy::Skip,
        ..config(dir.path())
    };

    let outcome = Pipeline::new(config, abc(&dir), SharedWriter(Arc::clone(&writer)))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 0);
    let Outcome::Completed {
        discovery,
        abandoned,
        stats,
    } = outcome
    else {
        panic!("expected completion");
    };
    assert_eq!(discovery.emitted, 3);
    assert_eq!(abandoned, vec![WorkUnit::new(dir.path().join("c.wsp"))]);
    assert_eq!(stats.read_failures, 1);
    assert_eq!(stats.batches_written, 2);
    assert_eq!(stats.points_written, 3);

    assert_eq!(
        writer.contents(),
        BTreeMap::from([
            ("a".to_string(), series(&[(100, 1.0)])),
            ("b".to_string(), series(&[(100, 2.0), (200, 3.0)])),
        ])
    );
}

#[tokio::test]
async fn test_read_failure_aborts_with_resume_point() {
    let dir = tree(&["a.wsp", "b.wsp", "c.wsp"]);
    let writer = Arc::new(MemoryWriter::default());
    let config = PipelineConfig {
        extract_workers: 1,
        load_workers: 1,
        ..config(dir.path())
    };

    let outcome = Pipeline::new(config, abc(&dir), SharedWriter(Arc::clone(&writer)))
        .unwrap()
        .run()
        .await
        .unwrap();

    let Outcome::Aborted {
        code,
        resume,
        cause,
        ..
    } = outcome
    else {
        panic!("expected abort");
    };
    assert_eq!(code, FATAL);
    assert!(matches!(cause, Some(MigrateError::Read { .. })));

    let expected = BTreeMap::from([
        ("a".to_string(), series(&[(100, 1.0)])),
        ("b".to_string(), series(&[(100, 2.0), (200, 3.0)])),
    ]);
    let order = ["a", "b", "c"];
    let resume = resume.unwrap();
    let position = order
        .iter()
        .position(|name| resume.path() == dir.path().join(format!("{name}.wsp")))
        .unwrap_or_else(|| panic!("resume point {resume} is not a discovered unit"));

    // everything discovered before the resume point is already in the destination
    let contents = writer.contents();
    for name in &order[..position] {
        assert_eq!(contents.get(*name), expected.get(*name), "unit {name}");
    }
    assert!(!contents.contains_key(order[position]));
}

#[tokio::test]
async fn test_write_failure_resumes_at_failed_unit() {
    let dir = tree(&["a.wsp", "b.wsp", "c.wsp"]);
    let config = PipelineConfig {
        extract_workers: 1,
        load_workers: 1,
        read_failure: ReadFailurePolicy::Skip,
        write_failure: WriteFailurePolicy::Abort,
        ..config(dir.path())
    };
    let writer = Arc::new(MemoryWriter {
        fail_on: Some("b".to_string()),
        ..MemoryWriter::default()
    });

    let outcome = Pipeline::new(config, abc(&dir), SharedWriter(Arc::clone(&writer)))
        .unwrap()
        .run()
        .await
        .unwrap();

    // a completed before b was taken, so b is the oldest unfinished unit
    let Outcome::Aborted { code, resume, .. } = outcome else {
        panic!("expected abort");
    };
    assert_eq!(code, FATAL);
    assert_eq!(resume, Some(WorkUnit::new(dir.path().join("b.wsp"))));
    assert_eq!(
        writer.contents(),
        BTreeMap::from([("a".to_string(), series(&[(100, 1.0)]))])
    );
}

#[tokio::test]
async fn test_full_dump_finer_archive_wins() {
    let dir = tree(&["servers/web1/load.wsp"]);
    let source = FakeSource::new(HashMap::from([(
        dir.path().join("servers/web1/load.wsp"),
        vec![
            vec![Point::new(600, 4.0), Point::new(660, 4.5)],
            vec![Point::new(0, 0.0), Point::new(600, 9.0), Point::new(300, 8.0)],
        ],
    )]));
    let writer = Arc::new(MemoryWriter::default());
    let config = PipelineConfig {
        measurement_prefix: "legacy.".to_string(),
        ..config(dir.path())
    };

    let outcome = Pipeline::new(config, source, SharedWriter(Arc::clone(&writer)))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        writer.contents(),
        BTreeMap::from([(
            "legacy.servers.web1.load".to_string(),
            series(&[(300, 8.0), (600, 4.0), (660, 4.5)]),
        )])
    );
}

#[tokio::test]
async fn test_range_mode_and_empty_batches() {
    let dir = tree(&["in.wsp", "out.wsp"]);
    let source = FakeSource::new(HashMap::from([
        (
            dir.path().join("in.wsp"),
            vec![vec![Point::new(100, 1.0), Point::new(500, 2.0)]],
        ),
        (dir.path().join("out.wsp"), vec![vec![Point::new(900, 3.0)]]),
    ]));
    let writer = Arc::new(MemoryWriter::default());
    let config = PipelineConfig {
        read_mode: ReadMode::Range(TimeRange::new(0, 200).unwrap()),
        ..config(dir.path())
    };

    let outcome = Pipeline::new(config, source, SharedWriter(Arc::clone(&writer)))
        .unwrap()
        .run()
        .await
        .unwrap();

    let Outcome::Completed {
        abandoned, stats, ..
    } = outcome
    else {
        panic!("expected completion");
    };
    assert!(abandoned.is_empty());
    assert_eq!(stats.empty_batches, 1);
    assert_eq!(writer.writes.load(Ordering::SeqCst), 1);
    assert_eq!(
        writer.contents(),
        BTreeMap::from([("in".to_string(), series(&[(100, 1.0)]))])
    );
}

#[tokio::test]
async fn test_filters_and_skip_cursor() {
    let dir = tree(&[
        "a/keep.wsp",
        "b/keep.wsp",
        "b/skip_me.wsp",
        "c/keep.wsp",
        "c/other.wsp",
        "notes.txt",
    ]);
    let names = ["a/keep", "b/keep", "b/skip_me", "c/keep", "c/other"];
    let source = FakeSource::new(
        names
            .iter()
            .map(|n| {
                (
                    dir.path().join(format!("{n}.wsp")),
                    vec![vec![Point::new(60, 1.0)]],
                )
            })
            .collect(),
    );
    let writer = Arc::new(MemoryWriter::default());
    let config = PipelineConfig {
        filter: FilterConfig {
            include: Some("keep".to_string()),
            exclude: Some("skip_me".to_string()),
            skip_until: Some(dir.path().join("b/keep.wsp")),
        },
        ..config(dir.path())
    };

    let outcome = Pipeline::new(config, source, SharedWriter(Arc::clone(&writer)))
        .unwrap()
        .run()
        .await
        .unwrap();

    let Outcome::Completed { discovery, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(discovery.suppressed, 1);
    assert_eq!(discovery.emitted, 2);
    assert_eq!(
        writer.contents().into_keys().collect::<Vec<_>>(),
        vec!["b.keep".to_string(), "c.keep".to_string()]
    );
}

async fn migrate(dir: &TempDir, writer: &Arc<MemoryWriter>) -> Outcome {
    Pipeline::new(config(dir.path()), abc(dir), SharedWriter(Arc::clone(writer)))
        .unwrap()
        .run()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_rewriting_is_idempotent() {
    let dir = tree(&["a.wsp", "b.wsp"]);
    let writer = Arc::new(MemoryWriter::default());

    assert_eq!(migrate(&dir, &writer).await.exit_code(), 0);
    let first = writer.contents();
    assert_eq!(migrate(&dir, &writer).await.exit_code(), 0);

    assert_eq!(writer.writes.load(Ordering::SeqCst), 4);
    assert_eq!(writer.contents(), first);
}

#[tokio::test]
async fn test_missing_root_aborts() {
    let dir = TempDir::new().unwrap();
    let outcome = Pipeline::new(
        config(&dir.path().join("missing")),
        FakeSource::default(),
        MemoryWriter::default(),
    )
    .unwrap()
    .run()
    .await
    .unwrap();

    let Outcome::Aborted {
        code,
        resume,
        cause,
        ..
    } = outcome
    else {
        panic!("expected abort");
    };
    assert_eq!(code, FATAL);
    assert!(resume.is_none());
    assert!(matches!(cause, Some(MigrateError::Discovery(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stalled_destination_bounds_reads() {
    const UNITS: usize = 20;
    const EXTRACT: usize = 2;
    const LOAD: usize = 2;
    const CAPACITY: usize = 1;

    let names: Vec<String> = (0..UNITS).map(|i| format!("m{i:02}.wsp")).collect();
    let dir = tree(&names.iter().map(String::as_str).collect::<Vec<_>>());
    let source = FakeSource::new(
        names
            .iter()
            .map(|n| (dir.path().join(n), vec![vec![Point::new(60, 1.0)]]))
            .collect(),
    );
    let reads = Arc::clone(&source.reads);
    let gate = Arc::new(Semaphore::new(0));
    let writer = Arc::new(MemoryWriter {
        gate: Some(Arc::clone(&gate)),
        ..MemoryWriter::default()
    });
    let config = PipelineConfig {
        extract_workers: EXTRACT,
        load_workers: LOAD,
        queue_capacity: CAPACITY,
        ..config(dir.path())
    };

    let pipeline = Pipeline::new(config, source, SharedWriter(Arc::clone(&writer))).unwrap();
    let run = tokio::spawn(pipeline.run());

    tokio::time::sleep(Duration::from_millis(300)).await;
    let stalled_reads = reads.load(Ordering::SeqCst);
    assert!(stalled_reads > 0);
    assert!(
        stalled_reads <= LOAD + CAPACITY + EXTRACT,
        "{stalled_reads} reads with a stalled destination"
    );
    assert_eq!(writer.writes.load(Ordering::SeqCst), 0);

    gate.add_permits(UNITS);
    let outcome = run.await.unwrap().unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(reads.load(Ordering::SeqCst), UNITS);
    assert_eq!(writer.contents().len(), UNITS);
}

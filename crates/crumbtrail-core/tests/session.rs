//! End-to-end recording scenarios through a [`Session`].

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crumbtrail_core::{
    Config, ConnectionState, Coordinate, CrumbtrailError, HostListener, ManualSource, Point,
    PointStore, Session, SqliteStore, StorageError, StorageResult, TrailRenderer,
};

#[derive(Default)]
struct Map {
    dots: Mutex<Vec<(f64, f64)>>,
}

impl Map {
    fn dots(&self) -> Vec<(f64, f64)> {
        self.dots.lock().unwrap().clone()
    }
}

impl TrailRenderer for Map {
    fn display_point(&self, latitude: f64, longitude: f64) {
        self.dots.lock().unwrap().push((latitude, longitude));
    }

    fn recenter(&self, _latitude: f64, _longitude: f64) {}
}

#[derive(Default)]
struct Host {
    errors: Mutex<Vec<String>>,
}

impl HostListener for Host {
    fn report_error(&self, error: &CrumbtrailError) {
        self.errors.lock().unwrap().push(error.error_code().to_string());
    }
}

struct FailingStore;

impl PointStore for FailingStore {
    fn insert(&self, _latitude: f64, _longitude: f64) -> StorageResult<i64> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "read-only medium",
        )))
    }

    fn get_all(&self) -> StorageResult<Vec<Point>> {
        Ok(Vec::new())
    }
}

struct SlowStore {
    inner: SqliteStore,
    read_delay: Duration,
}

impl PointStore for SlowStore {
    fn insert(&self, latitude: f64, longitude: f64) -> StorageResult<i64> {
        self.inner.insert(latitude, longitude)
    }

    fn get_all(&self) -> StorageResult<Vec<Point>> {
        thread::sleep(self.read_delay);
        self.inner.get_all()
    }
}

struct UnreadableStore;

impl PointStore for UnreadableStore {
    fn insert(&self, _latitude: f64, _longitude: f64) -> StorageResult<i64> {
        Ok(1)
    }

    fn get_all(&self) -> StorageResult<Vec<Point>> {
        Err(StorageError::LockPoisoned)
    }
}

fn config_at(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.storage.database_path = Some(dir.path().join("trail.db"));
    config
}

#[test]
fn inserted_points_replay_in_order() {
    let store = SqliteStore::in_memory().unwrap();
    store.insert(12.34, 56.78).unwrap();
    store.insert(12.35, 56.79).unwrap();

    assert_eq!(
        store.get_all().unwrap(),
        vec![
            Point {
                id: 1,
                latitude: 12.34,
                longitude: 56.78
            },
            Point {
                id: 2,
                latitude: 12.35,
                longitude: 56.79
            },
        ]
    );
}

#[test]
fn fresh_store_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("trail.db")).unwrap();
    assert!(store.get_all().unwrap().is_empty());
}

#[test]
fn last_known_position_is_recorded_on_connect() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ManualSource::new());
    source.set_last_known(Some(Coordinate::new(1.0, 2.0)));
    let map = Arc::new(Map::default());
    let session = Session::open(
        &config_at(&dir),
        source.clone(),
        map.clone(),
        Arc::new(Host::default()),
    )
    .unwrap();

    session.start();
    source.complete_connect();

    let trail = session.trail().unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].coordinate(), Coordinate::new(1.0, 2.0));
    assert_eq!(map.dots(), vec![(1.0, 2.0)]);
}

#[test]
fn storage_failure_still_reaches_map() {
    let source = Arc::new(ManualSource::new());
    let map = Arc::new(Map::default());
    let host = Arc::new(Host::default());
    let session = Session::new(
        &Config::default(),
        Arc::new(FailingStore),
        source.clone(),
        map.clone(),
        host.clone(),
    );

    session.start();
    source.complete_connect();
    source.push(Coordinate::new(48.85, 2.35));

    assert_eq!(map.dots(), vec![(48.85, 2.35)]);
    assert_eq!(host.errors.lock().unwrap().clone(), vec!["STORAGE_ERROR"]);
    assert_eq!(session.state(), ConnectionState::Connected);
}

#[test]
fn trail_survives_restart_and_is_replayed_before_live_points() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_at(&dir);

    {
        let source = Arc::new(ManualSource::new());
        let session = Session::open(
            &config,
            source.clone(),
            Arc::new(Map::default()),
            Arc::new(Host::default()),
        )
        .unwrap();
        session.start();
        source.complete_connect();
        source.push(Coordinate::new(10.0, 10.0));
        source.push(Coordinate::new(10.1, 10.1));
        session.stop();
    }

    let source = Arc::new(ManualSource::new());
    let map = Arc::new(Map::default());
    let session =
        Session::open(&config, source.clone(), map.clone(), Arc::new(Host::default())).unwrap();

    session.start();
    assert_eq!(map.dots(), vec![(10.0, 10.0), (10.1, 10.1)]);
    assert_eq!(session.state(), ConnectionState::Connecting);

    source.complete_connect();
    source.push(Coordinate::new(10.2, 10.2));

    let ids: Vec<i64> = session.trail().unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(map.dots().len(), 3);
}

#[test]
fn replay_happens_once_per_session() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    store.insert(5.0, 5.0).unwrap();
    let source = Arc::new(ManualSource::new());
    let map = Arc::new(Map::default());
    let session = Session::new(
        &Config::default(),
        store,
        source.clone(),
        map.clone(),
        Arc::new(Host::default()),
    );

    session.start();
    session.stop();
    session.start();

    assert_eq!(map.dots(), vec![(5.0, 5.0)]);
    assert_eq!(source.calls().connects, 2);
}

#[test]
fn session_applies_configured_filter() {
    let mut config = Config::default();
    config.filter.min_distance_m = Some(100.0);
    let source = Arc::new(ManualSource::new());
    let session = Session::new(
        &config,
        Arc::new(SqliteStore::in_memory().unwrap()),
        source.clone(),
        Arc::new(Map::default()),
        Arc::new(Host::default()),
    );

    session.start();
    source.complete_connect();
    source.push(Coordinate::new(0.0, 0.0));
    source.push(Coordinate::new(0.0, 0.000_1));
    source.push(Coordinate::new(0.0, 0.01));

    assert_eq!(session.trail().unwrap().len(), 2);
    assert_eq!(session.status().filtered_samples, 1);
}

#[test]
fn concurrent_start_waits_for_replay() {
    let inner = SqliteStore::in_memory().unwrap();
    inner.insert(1.0, 1.0).unwrap();
    let store = Arc::new(SlowStore {
        inner,
        read_delay: Duration::from_millis(300),
    });
    let source = Arc::new(ManualSource::new());
    let map = Arc::new(Map::default());
    let session = Arc::new(Session::new(
        &Config::default(),
        store,
        source.clone(),
        map.clone(),
        Arc::new(Host::default()),
    ));

    let first = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.start())
    };
    thread::sleep(Duration::from_millis(50));
    session.start();
    source.complete_connect();
    source.push(Coordinate::new(9.0, 9.0));
    first.join().unwrap();

    assert_eq!(map.dots(), vec![(1.0, 1.0), (9.0, 9.0)]);
    assert_eq!(source.calls().connects, 1);
}

#[test]
fn replay_failure_is_reported_and_recording_continues() {
    let source = Arc::new(ManualSource::new());
    let map = Arc::new(Map::default());
    let host = Arc::new(Host::default());
    let session = Session::new(
        &Config::default(),
        Arc::new(UnreadableStore),
        source.clone(),
        map.clone(),
        host.clone(),
    );

    session.start();
    assert_eq!(host.errors.lock().unwrap().clone(), vec!["STORAGE_ERROR"]);
    assert_eq!(session.state(), ConnectionState::Connecting);

    source.complete_connect();
    source.push(Coordinate::new(3.0, 3.0));
    assert_eq!(session.state(), ConnectionState::Connected);
    assert_eq!(map.dots(), vec![(3.0, 3.0)]);
    assert_eq!(session.status().accepted_samples, 1);
}

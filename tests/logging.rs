use std::{fs, thread::sleep, time::Duration};

use tempfile::tempdir;

// Only one test per binary: the global subscriber can be installed once.
#[test]
fn writes_log_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("overlay.log");

    overlay_host::logging::init(true, Some(path.clone()));
    tracing::info!("overlay logging test");

    sleep(Duration::from_millis(100));

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("overlay logging test"));
}

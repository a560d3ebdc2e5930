//! Readers racing a writer only ever see complete files.

use super::support::{component, registry_in};
use prodreg::{AccessMode, ReadOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn readers_never_observe_a_truncated_registry() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    registry.register(&component("seed", "1.0", "/opt/seed")).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let registry = registry.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..40 {
                let location = format!("/opt/w{}", i);
                registry.register(&component("W", "1.0", &location)).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut reads = 0;
    let mut last_count = 0;
    while !done.load(Ordering::SeqCst) || reads == 0 {
        let session = registry.open(AccessMode::Read).unwrap();
        assert_eq!(session.read_outcome(), &ReadOutcome::Clean);
        let count = session.get_all_components().len();
        assert!(count >= 1);
        assert!(count >= last_count, "commits are never lost for a lone writer");
        last_count = count;
        session.close().unwrap();
        reads += 1;
    }
    writer.join().unwrap();

    assert_eq!(registry.get_all().unwrap().len(), 41);
}

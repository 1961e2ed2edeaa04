//! Concurrent mutations against one box serialize on the box lock

mod common;

use std::io::Cursor;
use std::sync::{Arc, Barrier};
use std::thread;

use cellbox::{DavError, NodeType, Status};

use common::{dav, master, put_text, setup_test_env};

const THREADS: usize = 8;
const UPDATES_PER_THREAD: usize = 10;

#[test]
fn test_concurrent_updates_never_lose_a_version() {
    let (facade, _temp_dir) = setup_test_env();
    put_text(&facade, "counter.txt", "start");

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let facade = facade.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..UPDATES_PER_THREAD {
                    let body = format!("thread {t} update {i}");
                    let response = facade
                        .put(
                            &master(),
                            &dav("counter.txt"),
                            None,
                            Cursor::new(body.into_bytes()),
                            None,
                        )
                        .unwrap();
                    assert_eq!(response.status, Status::NoContent);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let node = facade.node(&dav("counter.txt")).unwrap();
    assert_eq!(node.version(), Some((THREADS * UPDATES_PER_THREAD) as i64));
    assert_eq!(facade.tree().locks().held_count(), 0);

    let content = facade.get(&master(), &dav("counter.txt"), None).unwrap();
    assert!(String::from_utf8(content.body).unwrap().starts_with("thread "));
}

#[test]
fn test_concurrent_mkcol_creates_exactly_once() {
    let (facade, _temp_dir) = setup_test_env();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let facade = facade.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                facade.mkcol(&master(), &dav("race"), NodeType::WebdavCollection)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(created, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, DavError::MethodNotAllowed(_))));
    assert_eq!(facade.node(&dav("race")).unwrap().version(), Some(0));
}

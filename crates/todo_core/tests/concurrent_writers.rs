//! Several connections mutating one file database at the same time.

use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use todo_core::db::open_db;
use todo_core::{IndexError, PriorityService, RetryPolicy, SqlitePriorityStore};

const WRITERS: usize = 4;
const APPENDS_PER_WRITER: usize = 15;

fn assert_dense(path: &Path, expected_len: i64) {
    let conn = open_db(path).unwrap();
    let service = PriorityService::new(SqlitePriorityStore::try_new(&conn).unwrap());
    let positions: Vec<i64> = service
        .get_all()
        .unwrap()
        .into_iter()
        .map(|record| record.position)
        .collect();
    assert_eq!(positions, (0..expected_len).collect::<Vec<_>>());
}

#[test]
fn concurrent_appends_never_share_a_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    drop(open_db(&path).unwrap());

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = PriorityService::with_retry_policy(
                    SqlitePriorityStore::try_new(&conn).unwrap(),
                    RetryPolicy::new(10),
                );
                barrier.wait();
                for index in 0..APPENDS_PER_WRITER {
                    service.create(format!("w{writer}-{index}"), None).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_dense(&path, (WRITERS * APPENDS_PER_WRITER) as i64);
}

#[test]
fn concurrent_inserts_and_deletes_keep_positions_dense() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.db");
    {
        let conn = open_db(&path).unwrap();
        let service = PriorityService::new(SqlitePriorityStore::try_new(&conn).unwrap());
        for index in 0..20 {
            service.create(format!("seed-{index}"), None).unwrap();
        }
    }

    let barrier = Arc::new(Barrier::new(2));
    let inserter = {
        let path = path.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let conn = open_db(&path).unwrap();
            let service = PriorityService::with_retry_policy(
                SqlitePriorityStore::try_new(&conn).unwrap(),
                RetryPolicy::new(10),
            );
            barrier.wait();
            for index in 0..10 {
                service.create(format!("insert-{index}"), Some(0)).unwrap();
            }
        })
    };
    let deleter = {
        let path = path.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let conn = open_db(&path).unwrap();
            let service = PriorityService::with_retry_policy(
                SqlitePriorityStore::try_new(&conn).unwrap(),
                RetryPolicy::new(10),
            );
            barrier.wait();
            for _ in 0..10 {
                let last = service.get_all().unwrap().pop().unwrap();
                // The inserter never removes records, so the id stays valid.
                service.delete_by_id(last.id).unwrap();
                service.swap(0, 1).unwrap();
            }
        })
    };
    inserter.join().unwrap();
    deleter.join().unwrap();

    assert_dense(&path, 20);
}

#[test]
fn held_write_lock_surfaces_conflict_after_bounded_retries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.db");
    {
        let conn = open_db(&path).unwrap();
        let service = PriorityService::new(SqlitePriorityStore::try_new(&conn).unwrap());
        service.create("seed", None).unwrap();
    }

    let conn = open_db(&path).unwrap();
    conn.busy_timeout(Duration::from_millis(20)).unwrap();

    let holder = open_db(&path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();
    for retry in [RetryPolicy::no_retry(), RetryPolicy::new(2)] {
        let service =
            PriorityService::with_retry_policy(SqlitePriorityStore::try_new(&conn).unwrap(), retry);
        let err = service.create("blocked", None).unwrap_err();
        assert!(matches!(err, IndexError::Conflict(_)), "unexpected error: {err}");
        let err = service.swap(0, 0).unwrap_err();
        assert!(matches!(err, IndexError::Conflict(_)), "unexpected error: {err}");
    }

    holder.execute_batch("ROLLBACK;").unwrap();
    assert_dense(&path, 1);

    let service = PriorityService::with_retry_policy(
        SqlitePriorityStore::try_new(&conn).unwrap(),
        RetryPolicy::no_retry(),
    );
    service.create("after", None).unwrap();
    assert_dense(&path, 2);
}

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use docops::runtime::serializer::{TaskError, spawn_serializer};

#[derive(Debug, thiserror::Error)]
#[error("boom: {0}")]
struct Boom(&'static str);

#[derive(Default)]
struct Log {
    entries: Vec<&'static str>,
}

#[tokio::test]
async fn tasks_run_in_submission_order_regardless_of_await_order() {
    let handle = spawn_serializer(Log::default());

    let t1 = handle.submit_with("t1", |log| {
        std::thread::sleep(Duration::from_millis(20));
        log.entries.push("t1");
        1
    });
    let t2 = handle.submit_with("t2", |log| {
        log.entries.push("t2");
        2
    });
    let t3 = handle.submit_with("t3", |log| {
        log.entries.push("t3");
        3
    });

    assert_eq!(t3.wait().await.expect("t3"), 3);
    assert_eq!(t1.wait().await.expect("t1"), 1);
    assert_eq!(t2.wait().await.expect("t2"), 2);

    let log = handle.shutdown().await.expect("shutdown");
    assert_eq!(log.entries, vec!["t1", "t2", "t3"]);
}

#[tokio::test]
async fn tasks_never_overlap_across_submitters() {
    let handle = spawn_serializer(());
    let active = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut joins = Vec::new();
    for _ in 0..8 {
        let handle = handle.clone();
        let active = active.clone();
        let max_seen = max_seen.clone();
        joins.push(tokio::spawn(async move {
            for _ in 0..10 {
                let active = active.clone();
                let max_seen = max_seen.clone();
                handle
                    .submit_with("tick", move |_| {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_micros(200));
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                    .wait()
                    .await
                    .expect("tick");
            }
        }));
    }
    for join in joins {
        join.await.expect("join");
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failure_and_panic_do_not_stop_later_tasks() {
    let handle = spawn_serializer(Log::default());

    let failed = handle.submit("fails", |_log: &mut Log| Err::<(), _>(Boom("first")));
    let panicked = handle.submit_with("panics", |_log: &mut Log| -> () { panic!("kaboom") });
    let ok = handle.submit_with("ok", |log| log.entries.push("after"));

    match failed.wait().await {
        Err(TaskError::Failed(err)) => assert_eq!(err.to_string(), "boom: first"),
        other => panic!("expected failure, got {other:?}"),
    }
    match panicked.wait().await {
        Err(TaskError::Panicked(msg)) => assert_eq!(msg, "kaboom"),
        other => panic!("expected panic, got {other:?}"),
    }
    ok.wait().await.expect("ok");

    let log = handle.shutdown().await.expect("shutdown");
    assert_eq!(log.entries, vec!["after"]);
}

#[tokio::test]
async fn barrier_waits_for_everything_before_it() {
    let handle = spawn_serializer(Log::default());
    for name in ["a", "b", "c"] {
        let _ = handle.submit_with("push", move |log| log.entries.push(name));
    }
    handle.barrier().wait().await.expect("barrier");

    let count = handle
        .submit_with("count", |log| log.entries.len())
        .wait()
        .await
        .expect("count");
    assert_eq!(count, 3);
}

#[tokio::test]
async fn shutdown_closes_the_queue() {
    let handle = spawn_serializer(7u32);
    assert_eq!(handle.shutdown().await.expect("shutdown"), 7);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(handle.is_closed());
    assert!(matches!(
        handle.submit_with("late", |n| *n).wait().await,
        Err(TaskError::Closed)
    ));
}

#[tokio::test]
async fn slow_task_does_not_stall_the_runtime() {
    let handle = spawn_serializer(());
    let slow = handle.submit_with("slow-save", |_| std::thread::sleep(Duration::from_millis(400)));

    // Let the actor pick the task up before timing.
    tokio::task::yield_now().await;
    let started = std::time::Instant::now();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let waited = started.elapsed();
    assert!(waited < Duration::from_millis(200), "timer fired after {waited:?}");

    slow.wait().await.expect("slow");
}

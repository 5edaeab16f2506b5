use std::sync::{Arc, Barrier};

use serde_json::Value;
use tracing_log_context::context::{self, LogContextExt};
use tracing_log_context::fields;
use tracing_log_context::format::JsonRenderer;
use tracing_log_context::logger::{Handler, Logger};
use tracing_log_context::memory_sink::MemorySink;
use tracing_log_context::Level;

fn shared_logger() -> (Arc<Logger>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::new("isolation")
        .with_level(Level::Debug)
        .with_handler(Handler::new(JsonRenderer::default(), sink.clone()));
    (Arc::new(logger), sink)
}

fn assert_each_record_sees_only_its_own_request(sink: &MemorySink, expected_per_req: usize) {
    let mut counts = std::collections::HashMap::new();
    for line in sink.lines() {
        let value: Value = serde_json::from_str(&line).unwrap();
        let req = value["extra"]["req"].as_str().unwrap().to_string();
        // The message carries the request the emitter was working on.
        assert_eq!(value["message"].as_str().unwrap(), format!("handling {}", req));
        *counts.entry(req).or_insert(0) += 1;
    }
    assert_eq!(counts.get("A"), Some(&expected_per_req));
    assert_eq!(counts.get("B"), Some(&expected_per_req));
}

/// Two OS threads log concurrently inside different scopes.
#[test]
fn concurrent_threads_never_see_each_others_fields() {
    let (logger, sink) = shared_logger();
    let barrier = Arc::new(Barrier::new(2));

    let workers: Vec<_> = ["A", "B"]
        .into_iter()
        .map(|req| {
            let logger = Arc::clone(&logger);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let _guard = context::enter(fields! { "req" => req });
                barrier.wait();
                for _ in 0..50 {
                    logger.info(format!("handling {}", req));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_each_record_sees_only_its_own_request(&sink, 50);
}

/// Two tasks interleave on a single worker thread.
#[tokio::test(flavor = "current_thread")]
async fn interleaved_tasks_on_one_thread_are_isolated() {
    let (logger, sink) = shared_logger();

    let tasks: Vec<_> = ["A", "B"]
        .into_iter()
        .map(|req| {
            let logger = Arc::clone(&logger);
            tokio::spawn(
                async move {
                    for _ in 0..20 {
                        logger.info(format!("handling {}", req));
                        tokio::task::yield_now().await;
                    }
                }
                .in_log_context(fields! { "req" => req }),
            )
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_each_record_sees_only_its_own_request(&sink, 20);
    assert_eq!(context::depth(), 0);
}

/// Tasks on a multi-threaded runtime may migrate between workers.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn migrating_tasks_keep_their_fields() {
    let (logger, sink) = shared_logger();

    let tasks: Vec<_> = ["A", "B"]
        .into_iter()
        .map(|req| {
            let logger = Arc::clone(&logger);
            tokio::spawn(
                async move {
                    for _ in 0..20 {
                        logger.info(format!("handling {}", req));
                        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    }
                }
                .in_log_context(fields! { "req" => req }),
            )
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_each_record_sees_only_its_own_request(&sink, 20);
}

/// Concurrent branches of one task each get their own stack, so guards
/// held across a yield stay private to the branch.
#[tokio::test(flavor = "current_thread")]
async fn joined_branches_with_their_own_stack_are_isolated() {
    let (logger, sink) = shared_logger();

    let branch = |key: &'static str, value: &'static str| {
        let logger = Arc::clone(&logger);
        async move {
            let _guard = context::enter(fields! { key => value });
            tokio::task::yield_now().await;
            logger.info(format!("branch {}", value));
        }
        .in_log_context(fields! {})
    };

    tokio::join!(branch("req_a", "A"), branch("req_b", "B"));

    let mut extras: Vec<(String, Value)> = sink
        .lines()
        .iter()
        .map(|l| {
            let value: Value = serde_json::from_str(l).unwrap();
            (value["message"].as_str().unwrap().to_string(), value["extra"].clone())
        })
        .collect();
    extras.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        extras,
        vec![
            ("branch A".to_string(), serde_json::json!({ "req_a": "A" })),
            ("branch B".to_string(), serde_json::json!({ "req_b": "B" })),
        ]
    );
    assert_eq!(context::depth(), 0);
}

#[test]
fn records_after_scope_exit_carry_no_fields() {
    let (logger, sink) = shared_logger();

    {
        let _outer = context::enter(fields! { "a" => 1 });
        {
            let _inner = context::enter(fields! { "a" => 2, "b" => 3 });
            logger.info("inner");
        }
        logger.info("outer");
    }
    logger.info("none");

    let values: Vec<Value> = sink
        .lines()
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(values[0]["extra"], serde_json::json!({ "a": 2, "b": 3 }));
    assert_eq!(values[1]["extra"], serde_json::json!({ "a": 1 }));
    assert!(values[2].get("extra").is_none());
}

use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use tracing_log_context::context::{self, LogContextExt};
use tracing_log_context::fields;
use tracing_log_context::init::{build_logger, init_tracing, LoggerConfig};

async fn handle(order_id: u64) {
    info!(order_id, "loading order");
    sleep(Duration::from_millis(10)).await;
    if order_id % 2 == 0 {
        error!(order_id, "payment declined");
    } else {
        info!(order_id, "order shipped");
    }
}

#[tokio::main]
async fn main() {
    let config = LoggerConfig {
        use_json: true,
        ..Default::default()
    };
    let logger = build_logger("demo.requests", &config).expect("build logger");
    init_tracing(Arc::new(logger));

    let _service = context::enter(fields! { "service" => "orders" });
    info!("starting service");

    // Each request runs as its own task with its own request id; the
    // service-wide field is inherited from the scope above.
    let handles: Vec<_> = (1..=4u64)
        .map(|n| {
            tokio::spawn(handle(n).in_log_context(fields! { "request_id" => format!("req-{}", n) }))
        })
        .collect();

    for handle in handles {
        let _ = handle.await;
    }

    info!("all requests handled");
}

use std::sync::Arc;
use std::time::Instant;

use tracing_log_context::context;
use tracing_log_context::fields;
use tracing_log_context::format::{JsonRenderer, TextRenderer};
use tracing_log_context::logger::{Handler, Logger};
use tracing_log_context::noop_sink::NoopSink;
use tracing_log_context::Level;

fn run(label: &str, logger: &Logger) {
    let n: u64 = 100_000;
    let start = Instant::now();

    let _guard = context::enter(fields! { "request_id" => "load-test", "shard" => 3 });
    for i in 0..n {
        logger.event(Level::Info).field("iteration", i).emit("load test event");
    }

    let elapsed = start.elapsed();
    println!(
        "{}: rendered {} events in {:?} (~{:.0} ev/s)",
        label,
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}

fn main() {
    let sink = Arc::new(NoopSink);

    let text = Logger::new("load.text").with_handler(Handler::new(TextRenderer::colored(), sink.clone()));
    let json = Logger::new("load.json").with_handler(Handler::new(JsonRenderer::default(), sink));

    run("colored text", &text);
    run("json", &json);
}

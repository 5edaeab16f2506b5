use std::error::Error;
use std::time::Duration;

use tracing_log_context::init::{get_logger, LoggerConfig};
use tracing_log_context::timing::{measure, timed};
use tracing_log_context::Level;

fn main() -> Result<(), Box<dyn Error>> {
    // Honour LOG_LEVEL / LOG_FORMAT / LOG_FILE from the environment.
    let config = LoggerConfig::from_env()?;

    let logger = get_logger("demo.basic", &config)?;

    logger.debug("starting up");
    logger.info("service ready");
    logger
        .event(Level::Warning)
        .field("free_mb", 512)
        .field("mount", "/var")
        .emit("disk space is getting low");

    let total = measure(&logger, "warm_cache", || {
        std::thread::sleep(Duration::from_millis(25));
        128
    });
    logger.info(format!("cached {} entries", total));

    let port = timed(&logger, "parse_port", || "80a".parse::<u16>());
    if let Err(e) = port {
        logger.exception("falling back to default port", &e);
    }

    logger.critical("demo finished");
    logger.flush();
    Ok(())
}

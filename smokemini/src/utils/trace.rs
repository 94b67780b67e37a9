//! Sets up tracing for smoke-mini to stdout/stderr

use tracing::{Level, event};
use tracing_subscriber::{filter::Filtered, fmt::Layer, prelude::*, Registry};
use tracing_subscriber::filter::LevelFilter;

use crate::conf::{Tracing, TracingLocal};

/// Setup our local tracer
///
/// # Arguments
///
/// * `name` - The name of the service we are tracing
/// * `conf` - The local tracing settings
fn setup_local(name: &str, conf: &TracingLocal) -> Filtered<Layer<Registry>, LevelFilter, Registry> {
    // log which level we are sending to stdout
    println!("Sending {} for {name} to stdout", conf.level);
    tracing_subscriber::fmt::layer().with_filter(conf.level.to_filter())
}

/// Setup the correct tracer
///
/// # Arguments
///
/// * `name` - The name of the service to trace
/// * `trace_conf` - The tracing settings to use
pub fn setup(name: &str, trace_conf: &Tracing) {
    // build our local tracer/subscriber
    let local = setup_local(name, &trace_conf.local);
    // Add our local tracer to our registry
    if tracing_subscriber::registry().with(local).try_init().is_err() {
        // a subscriber was already installed so just keep using it
        event!(Level::WARN, msg = "Tracing subscriber already installed", service = name);
    }
}

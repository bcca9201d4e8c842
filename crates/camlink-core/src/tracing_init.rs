//! Shared tracing/logging initialization.
//!
//! The server and its test harnesses set up `tracing_subscriber` the same
//! way: an env-filter (honouring `RUST_LOG`) plus either a human-readable or
//! a JSON formatting layer.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// The MQTT client logs every reconnect attempt at `info`; keep it quieter
/// unless `RUST_LOG` asks for it explicitly.
const TRANSPORT_DIRECTIVE: &str = "rumqttc=warn";

/// Build the env filter used by [`init_tracing`].
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used and the
/// transport crate is capped at `warn`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    if let Ok(from_env) = std::env::var("RUST_LOG") {
        return EnvFilter::new(from_env);
    }
    let filter = EnvFilter::new(default_filter);
    match TRANSPORT_DIRECTIVE.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default filter when `RUST_LOG` is not set
///   (e.g. `"camlink_server=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let json_layer = log_json.then(|| fmt::layer().json());
    let text_layer = (!log_json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(json_layer)
        .with(text_layer)
        .init();
}

// wallet-core/src/logging.rs
//
// Structured logging cho host application.
//
// - Filter từ `RUST_LOG` (mặc định `info`)
// - `VAULT_LOG_JSON=1` để xuất JSON (log aggregation)
// - Ghi ra stderr, stdout để cho host dùng
//
// KHÔNG BAO GIỜ log mnemonic, private key, credential. Address và tx hash thì được.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Env var bật JSON output.
pub const LOG_JSON_ENV: &str = "VAULT_LOG_JSON";

/// Cài global subscriber. Gọi nhiều lần an toàn: lần sau là no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var(LOG_JSON_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

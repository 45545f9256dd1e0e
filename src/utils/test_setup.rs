use std::sync::Once;

use dotenvy::dotenv;

static INIT: Once = Once::new();

/// One-shot logging/env initialization shared by the integration tests.
pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

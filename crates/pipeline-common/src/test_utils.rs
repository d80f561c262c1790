use std::sync::Arc;

use crate::StreamerContext;

/// Macro to initialize tracing for tests
///
/// Usage:
/// - `init_test_tracing!()` - uses DEBUG level (default)
/// - `init_test_tracing!(INFO)` - uses specified level
///
/// The calling crate needs `tracing` and `tracing-subscriber` available.
#[macro_export]
macro_rules! init_test_tracing {
    () => {
        $crate::init_test_tracing!(DEBUG);
    };
    ($level:ident) => {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::$level)
            .with_test_writer()
            .try_init();
    };
}

/// Create a named test streamer context
#[inline]
pub fn create_test_context() -> Arc<StreamerContext> {
    Arc::new(StreamerContext::with_name("test-stream"))
}

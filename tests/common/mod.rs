use std::sync::Once;

use pg_btree_compress::log::init_log;

static INIT: Once = Once::new();

/// Installs the `env_logger` sink exactly once per test binary, mirroring
/// the teacher's `tests/common/mod.rs::setup()` — `init_log()` itself
/// panics on a second call, so every test funnels through this guard
/// instead of calling it directly.
pub fn setup() {
    INIT.call_once(init_log);
}

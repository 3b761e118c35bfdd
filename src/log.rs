use env_logger::Builder;
use std::io::Write;

/// Installs an `env_logger` sink formatted the way the rest of this crate
/// expects its `debug!`/`trace!`/`warn!` call sites to read. Safe to call
/// more than once from a single process only through the `Once`-guarded
/// wrapper tests use; calling it twice directly will panic, matching
/// `env_logger`'s own global-init contract.
pub fn init_log() {
    let mut builder = Builder::from_default_env();
    builder
        .format_timestamp_secs()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} - {}] [{}:{}] {}",
                record.level(),
                record.target(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}

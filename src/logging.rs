use env_logger::Builder;
use std::io::Write;

/// Initializes the `log` facade with a line format of level, target,
/// `file:line`, message. Safe to call more than once per process;
/// `env_logger`'s builder only installs the first logger it's asked to.
pub fn init_log() {
    let mut builder = Builder::from_default_env();
    let _ = builder
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
        .try_init();
}

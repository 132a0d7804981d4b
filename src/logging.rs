use std::io::Write;

/// Installs the process-wide logger
///
/// Every line is prefixed with `prefix`. Call once at startup; the filter
/// defaults to `info` and `RUST_LOG` overrides it.
pub fn init(prefix: &'static str) {
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("info"))
        .format(move |buf, record| {
            writeln!(
                buf,
                "{}: {} {:<5} [{}] {}",
                prefix,
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

/// Verbose tracing for conversion and execution internals.
///
/// Routed through the `log` facade at debug level under the `layercheck`
/// target, so `RUST_LOG=layercheck=debug` turns it on.
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        ::log::debug!(target: "layercheck", $($arg)*)
    };
}

/// Initialize `env_logger` for the binary. Defaults to `info` when `RUST_LOG`
/// is unset.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

//! Logger initialization. This crate only emits [`log`] facade calls; it
//! never initializes a logger itself — that's for the binary, test, or
//! bench entry point that wants the output to go somewhere.

/// Initializes `env_logger` from the default `RUST_LOG` environment
/// variable. Safe to call more than once; `env_logger::init()` itself
/// ignores repeat calls.
pub fn init() {
    env_logger::init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic() {
        init();
        log::warn!("logging test warning");
        log::debug!("logging test debug");
    }
}

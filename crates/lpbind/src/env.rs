//! Engine-wide environment: versions and terminal output.

use lpbind_engine::term;

/// Version of the engine crate.
pub fn version() -> &'static str {
    lpbind_engine::version()
}

/// Version of the LP backend, if it reports one.
pub fn solver_version() -> Option<String> {
    lpbind_engine::highs_version()
}

/// Whether engine terminal output is enabled.
pub fn term_on() -> bool {
    term::term_on()
}

/// Enable or disable engine terminal output; returns the previous setting.
pub fn set_term_on(on: bool) -> bool {
    term::set_term_on(on)
}

/// Route engine terminal output to `hook` instead of stdout.
///
/// The hook is called once per output line. It replaces any hook installed
/// earlier.
pub fn set_term_hook<F>(hook: F)
where
    F: FnMut(&str) + 'static,
{
    term::set_term_hook(Some(Box::new(hook)));
}

/// Remove the terminal hook, sending output back to stdout.
pub fn clear_term_hook() {
    term::set_term_hook(None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_switch_reports_previous_value() {
        let original = set_term_on(false);
        assert!(!term_on());
        assert!(!set_term_on(original));
        assert_eq!(term_on(), original);
    }

    #[test]
    fn test_version_is_set() {
        assert!(!version().is_empty());
    }
}

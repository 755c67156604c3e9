//! Terminal output of the engine.
//!
//! Solver progress lines go to stdout unless a hook is installed or output is
//! switched off. Every line is also emitted as a `trace` event.

use std::cell::RefCell;
use std::io::Write;
use tracing::trace;

/// Receiver for terminal output.
pub type TermHook = Box<dyn FnMut(&str)>;

struct Terminal {
    on: bool,
    hook: Option<TermHook>,
}

thread_local! {
    static TERMINAL: RefCell<Terminal> = const {
        RefCell::new(Terminal { on: true, hook: None })
    };
}

/// Enable or disable terminal output; returns the previous setting.
pub fn set_term_on(on: bool) -> bool {
    TERMINAL.with(|t| std::mem::replace(&mut t.borrow_mut().on, on))
}

pub fn term_on() -> bool {
    TERMINAL.with(|t| t.borrow().on)
}

/// Install a hook receiving every output line; returns the previous one.
pub fn set_term_hook(hook: Option<TermHook>) -> Option<TermHook> {
    TERMINAL.with(|t| std::mem::replace(&mut t.borrow_mut().hook, hook))
}

pub(crate) fn print(line: &str) {
    trace!(component = "engine", operation = "term", "{}", line);
    let taken = TERMINAL.with(|t| {
        let mut t = t.borrow_mut();
        if t.on { Some(t.hook.take()) } else { None }
    });
    let Some(hook) = taken else {
        return;
    };
    match hook {
        Some(mut hook) => {
            // The hook runs unborrowed so it may itself touch the terminal.
            hook(line);
            TERMINAL.with(|t| {
                let mut t = t.borrow_mut();
                if t.hook.is_none() {
                    t.hook = Some(hook);
                }
            });
        }
        None => {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_hook_receives_lines_until_switched_off() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let previous = set_term_hook(Some(Box::new(move |s: &str| {
            sink.borrow_mut().push(s.to_string());
        })));
        assert!(previous.is_none());
        let was_on = set_term_on(true);

        print("first");
        set_term_on(false);
        print("second");
        set_term_on(was_on);
        set_term_hook(None);

        assert_eq!(*seen.borrow(), vec!["first".to_string()]);
    }
}

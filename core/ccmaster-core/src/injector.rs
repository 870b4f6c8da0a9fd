//! Injector contract (spec Design Notes, §1 external collaborators).
//!
//! "Worker control via prompt injection (typing into a terminal) is a
//! side-channel, not a protocol; model it as an Injector interface with one
//! method `inject(handle, text) → bool`. All tests mock it." The Prompt
//! Injector itself (actually driving a terminal emulator) is an external
//! collaborator out of scope here.

use crate::session::TerminalHandle;

pub trait Injector: Send + Sync {
    /// Delivers `text` to the worker behind `handle`. Returns `false` on
    /// failure rather than an error — per spec §7, an `InjectorFailure`
    /// only clears `pending_continue` and lets the Scheduler retry on the
    /// next Idle edge, it never propagates as a hard error.
    fn inject(&self, handle: &TerminalHandle, text: &str) -> bool;
}

/// Records every injection it receives and always reports success, unless
/// explicitly configured to fail the next N calls (for exercising
/// `InjectorFailure` recovery in tests).
pub struct MockInjector {
    pub sent: parking_lot::Mutex<Vec<(String, String)>>,
    fail_next: parking_lot::Mutex<u32>,
}

impl Default for MockInjector {
    fn default() -> Self {
        Self {
            sent: parking_lot::Mutex::new(Vec::new()),
            fail_next: parking_lot::Mutex::new(0),
        }
    }
}

impl MockInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_calls(&self, count: u32) {
        *self.fail_next.lock() = count;
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Injector for MockInjector {
    fn inject(&self, handle: &TerminalHandle, text: &str) -> bool {
        let mut remaining = self.fail_next.lock();
        if *remaining > 0 {
            *remaining -= 1;
            return false;
        }
        self.sent.lock().push((handle.handle.clone(), text.to_string()));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_injector_records_successful_calls() {
        let injector = MockInjector::new();
        let handle = TerminalHandle {
            handle: "t1".to_string(),
            metadata: serde_json::Value::Null,
        };
        assert!(injector.inject(&handle, "continue"));
        assert_eq!(injector.call_count(), 1);
    }

    #[test]
    fn mock_injector_can_simulate_failures() {
        let injector = MockInjector::new();
        injector.fail_next_calls(1);
        let handle = TerminalHandle {
            handle: "t1".to_string(),
            metadata: serde_json::Value::Null,
        };
        assert!(!injector.inject(&handle, "continue"));
        assert!(injector.inject(&handle, "continue"));
        assert_eq!(injector.call_count(), 1);
    }
}

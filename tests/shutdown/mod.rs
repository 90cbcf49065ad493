//! Tests for graceful shutdown.
//!
//! Test organization:
//! - sequence.rs: handler ordering, failures and exit codes
//! - watchdog.rs: the overall timeout

mod sequence;
mod watchdog;

use bulwark_shutdown::Exit;
use std::sync::{Arc, Mutex};

/// Collects exit codes instead of terminating the test process.
#[derive(Clone, Default)]
pub(crate) struct ExitCodes(Arc<Mutex<Vec<i32>>>);

impl ExitCodes {
    pub(crate) fn recorded(&self) -> Vec<i32> {
        self.0.lock().unwrap().clone()
    }
}

impl Exit for ExitCodes {
    fn exit(&self, code: i32) {
        self.0.lock().unwrap().push(code);
    }
}

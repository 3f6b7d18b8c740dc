// src/interrupt.rs
//! One-shot SIGINT latch.
//!
//! The first interrupt lets the in-flight batch finish so accumulated
//! diagnostics can be flushed; a second interrupt terminates immediately.

use std::sync::atomic::{AtomicUsize, Ordering};

static INTERRUPT_COUNT: AtomicUsize = AtomicUsize::new(0);

pub fn install() {
    let _ = ctrlc::set_handler(|| {
        let previous = INTERRUPT_COUNT.fetch_add(1, Ordering::SeqCst);
        if previous > 0 {
            std::process::exit(130);
        }
        eprintln!("Interrupted. Finishing in-flight work; interrupt again to terminate.");
    });
}

#[must_use]
pub fn interrupted() -> bool {
    INTERRUPT_COUNT.load(Ordering::SeqCst) > 0
}

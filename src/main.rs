use std::panic::{self, AssertUnwindSafe};

use clap::Parser;

use fence::cli::args::Cli;
use fence::cli::dispatch;
use fence::exit::FenceExit;
use fence::interrupt;

fn main() -> FenceExit {
    let cli = Cli::parse();
    interrupt::install();

    match panic::catch_unwind(AssertUnwindSafe(|| dispatch::execute(cli))) {
        Ok(result) => result.into(),
        Err(payload) => {
            eprintln!("fence: internal error: {}", panic_message(&payload));
            FenceExit::Internal
        }
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

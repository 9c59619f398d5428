//! A capturing log console for tests and emulated builds.
//!
//! The shield only emits records through the `log` facade. This console is a `log::Log`
//! implementation that keeps the most recent formatted records in memory, so tests can
//! assert on what the shield reported.

use alloc::format;
use alloc::string::String;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

#[cfg(debug_assertions)]
use log::LevelFilter;
use spin::{Mutex, Once};

/// Maximum number of records retained; older records are discarded first.
pub const CONSOLE_CAPACITY: usize = 1024;

pub struct Console {
    entries: Mutex<VecDeque<String>>,
}

static DEFAULT: Once<Console> = Once::new();
static INSTALLED: Once<()> = Once::new();

impl Console {
    /// Returns the process-wide console, installing it as the logger on first use.
    pub fn init() -> &'static Self {
        let console = Self::global();
        INSTALLED.call_once(|| console.install());
        console
    }

    pub fn global() -> &'static Self {
        DEFAULT.call_once(|| Console {
            entries: Mutex::new(VecDeque::with_capacity(CONSOLE_CAPACITY)),
        })
    }

    fn install(&'static self) {
        if log::set_logger(self).is_err() {
            return;
        }

        #[cfg(debug_assertions)]
        log::set_max_level(LevelFilter::Trace);

        #[cfg(not(debug_assertions))]
        log::set_max_level(log::LevelFilter::Info);
    }

    /// Returns a copy of every retained record, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().iter().cloned().collect()
    }
}

impl log::Log for Console {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let entry = format_entry(record);
        let mut entries = self.entries.lock();
        if entries.len() == CONSOLE_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn flush(&self) {}
}

fn format_entry(record: &log::Record) -> String {
    #[cfg(any(debug_assertions, feature = "detailed-logging"))]
    return format!(
        "[{} {}:{} {}] {}",
        record.level(),
        record.file().unwrap_or("unknown"),
        record.line().unwrap_or(0),
        record.target(),
        record.args()
    );
    #[cfg(not(any(debug_assertions, feature = "detailed-logging")))]
    return format!("[{:5}] {}", record.level(), record.args());
}

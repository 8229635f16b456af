// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run progress: a counter the dispatcher advances and a display that
//! polls it.

use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Completed-prompt counter shared between the dispatcher and observers.
///
/// Only the dispatcher advances it, while holding the run lock. Readers
/// never take that lock. The count never decreases and never exceeds the
/// total set for the run.
#[derive(Clone, Debug, Default)]
pub struct ProgressTracker {
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run of `total` prompts.
    pub(crate) fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Count one more completed prompt. Returns the new count.
    pub(crate) fn advance(&self) -> usize {
        let total = self.total.load(Ordering::SeqCst);
        match self
            .completed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                (c < total).then_some(c + 1)
            }) {
            Ok(previous) => previous + 1,
            Err(current) => current,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

/// The transient status line.
pub fn render_line(completed: usize, total: usize) -> String {
    format!("running... {completed}/{total}")
}

/// Background thread redrawing the status line on stderr.
///
/// Nothing is drawn when stderr is not a terminal. The line is cleared when
/// the display is finished or dropped.
pub struct ProgressDisplay {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressDisplay {
    pub fn start(tracker: ProgressTracker) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        if !std::io::stderr().is_terminal() {
            return Self { stop, handle: None };
        }

        let flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("bisheng-progress".to_string())
            .spawn(move || {
                let mut last = String::new();
                while !flag.load(Ordering::SeqCst) {
                    let line = render_line(tracker.completed(), tracker.total());
                    if line != last {
                        let mut err = std::io::stderr().lock();
                        let _ = write!(err, "\r\x1b[2K{line}");
                        let _ = err.flush();
                        last = line;
                    }
                    std::thread::sleep(REFRESH_INTERVAL);
                }
                let mut err = std::io::stderr().lock();
                let _ = write!(err, "\r\x1b[2K");
                let _ = err.flush();
            })
            .ok();
        Self { stop, handle }
    }

    /// Stop drawing and clear the line.
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressDisplay {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;

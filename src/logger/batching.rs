//! Interval-driven flushing for manual-mode loggers.

use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, select, tick};

use super::LoggerInner;

/// Background thread flushing a non-empty queue every interval.
///
/// Holds only a weak reference so it never keeps a logger alive.
pub(crate) struct BatchTimer {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl BatchTimer {
    pub(crate) fn spawn(interval: Duration, logger: Weak<LoggerInner>) -> Self {
        let (stop, stop_rx) = bounded::<()>(1);
        let handle = thread::spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        let Some(inner) = logger.upgrade() else { break };
                        inner.flush_pending();
                    }
                }
            }
        });
        Self { stop, handle }
    }

    pub(crate) fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.thread().id() != thread::current().id() {
            let _ = self.handle.join();
        }
    }
}

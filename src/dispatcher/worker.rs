//! Worker thread performing collector requests.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use log::warn;

use super::request::{HecResponse, OutboundRequest};
use super::transport::HttpTransport;
use super::{DeliveryCallback, DeliveryError, Outcome};
use crate::context::Context;
use crate::error_handler::HandlerSlot;
use crate::rate_limited_warner::RateLimitedWarner;

/// A request waiting for the worker.
pub(crate) struct Job {
    pub(crate) request: OutboundRequest,
    pub(crate) context: Context,
    pub(crate) callback: Option<DeliveryCallback>,
}

pub(crate) enum Command {
    Deliver(Box<Job>),
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

impl Command {
    pub(crate) fn into_job(self) -> Option<Box<Job>> {
        match self {
            Self::Deliver(job) => Some(job),
            Self::Flush(_) | Self::Shutdown(_) => None,
        }
    }
}

pub(crate) fn spawn_worker(
    capacity: usize,
    transport: Arc<dyn HttpTransport>,
    handler: HandlerSlot,
) -> (Sender<Command>, thread::JoinHandle<()>) {
    let (tx, rx) = bounded(capacity);
    let handle = thread::spawn(move || Worker { transport, handler }.run(rx));
    (tx, handle)
}

struct Worker {
    transport: Arc<dyn HttpTransport>,
    handler: HandlerSlot,
}

impl Worker {
    fn deliver(&self, job: Job) {
        let Job {
            request,
            context,
            callback,
        } = job;
        let result = match self.transport.post(&request) {
            Err(err) => {
                let err = DeliveryError::Transport(err);
                self.handler.report(&err, Some(&context));
                Err(err)
            }
            Ok(response) => {
                let response = HecResponse::from(response);
                if let Some(code) = response.rejection_code() {
                    let err = DeliveryError::RemoteRejection {
                        text: response.text().unwrap_or_default().to_owned(),
                        code,
                    };
                    self.handler.report(&err, Some(&context));
                }
                Ok(Outcome::Delivered(response))
            }
        };
        if let Some(callback) = callback {
            callback(result);
        }
    }

    fn drain_pending(&self, rx: &Receiver<Command>) {
        loop {
            match rx.try_recv() {
                Ok(Command::Deliver(job)) => self.deliver(*job),
                Ok(Command::Flush(ack) | Command::Shutdown(ack)) => {
                    let _ = ack.send(());
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    fn run(self, rx: Receiver<Command>) {
        loop {
            match rx.recv() {
                Ok(Command::Deliver(job)) => self.deliver(*job),
                Ok(Command::Flush(ack)) => {
                    let _ = ack.send(());
                }
                Ok(Command::Shutdown(ack)) => {
                    self.drain_pending(&rx);
                    let _ = ack.send(());
                    break;
                }
                Err(_) => break,
            }
        }
    }
}

/// Hand `job` to the worker without blocking.
///
/// A full or disconnected queue hands the command back with the matching error.
pub(crate) fn enqueue(
    tx: &Sender<Command>,
    job: Job,
    warner: &RateLimitedWarner,
) -> Result<(), (DeliveryError, Command)> {
    match tx.try_send(Command::Deliver(Box::new(job))) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(command)) => {
            warner.record_drop();
            warner.warn_if_due(|count| {
                warn!("hec_logging dispatch queue full; dropped {count} events");
            });
            Err((DeliveryError::QueueFull, command))
        }
        Err(TrySendError::Disconnected(command)) => {
            warner.record_drop();
            warner.warn_if_due(|count| {
                warn!("hec_logging dispatcher closed; dropped {count} events");
            });
            Err((DeliveryError::Closed, command))
        }
    }
}

/// Send `make(ack)` and wait for the acknowledgement within `timeout`.
pub(crate) fn round_trip(
    tx: &Sender<Command>,
    timeout: Duration,
    make: impl FnOnce(Sender<()>) -> Command,
) -> bool {
    let deadline = Instant::now() + timeout;
    let (ack_tx, ack_rx) = bounded(1);
    if tx.send_timeout(make(ack_tx), timeout).is_err() {
        return false;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    ack_rx.recv_timeout(remaining).is_ok()
}

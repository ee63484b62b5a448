use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, Result};
use odens_protos::Message;

use crate::transport::{Received, Transport};

/// Error returned to consumers of a channel whose receive thread has stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel closed: {reason}")]
    Closed { reason: String },
}

#[derive(Debug)]
pub(crate) struct Slot<T> {
    pub latest: Option<T>,
    /// Number of values published so far.
    pub sequence: u64,
    pub closed: Option<String>,
}

/// Single-slot mailbox between a receive thread and its consumers: the receive
/// thread overwrites the latest value, consumers wait on the condition variable.
#[derive(Debug)]
pub(crate) struct Mailbox<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                latest: None,
                sequence: 0,
                closed: None,
            }),
            ready: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // A poisoned slot still holds a complete value.
        self.slot.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn publish(&self, value: T) {
        let mut slot = self.lock();
        slot.latest = Some(value);
        slot.sequence += 1;
        drop(slot);
        self.ready.notify_all();
    }

    pub fn close(&self, reason: impl Into<String>) {
        let mut slot = self.lock();
        if slot.closed.is_none() {
            slot.closed = Some(reason.into());
        }
        drop(slot);
        self.ready.notify_all();
    }

    /// Wait until `pending` returns false or `timeout` passes. Returns the guard and
    /// whether the wait timed out.
    pub fn wait_while<'a>(
        &'a self,
        guard: MutexGuard<'a, Slot<T>>,
        timeout: Duration,
        pending: impl FnMut(&mut Slot<T>) -> bool,
    ) -> (MutexGuard<'a, Slot<T>>, bool) {
        let (guard, result) = self
            .ready
            .wait_timeout_while(guard, timeout, pending)
            .unwrap_or_else(|err| err.into_inner());
        (guard, result.timed_out())
    }
}

/// Checks the closed flag of a slot.
pub(crate) fn check_open<T>(slot: &Slot<T>) -> Result<(), ChannelError> {
    match &slot.closed {
        Some(reason) => Err(ChannelError::Closed {
            reason: reason.clone(),
        }),
        None => Ok(()),
    }
}

/// A named background thread that receives, decodes and publishes messages until
/// it is stopped or the transport fails. Stopped and joined on drop.
pub(crate) struct ReceiveThread {
    name: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReceiveThread {
    /// Spawn the receive loop. `decode` turns a wire message into the published
    /// value; `Ok(None)` skips the message, `Err` logs it as malformed.
    pub fn spawn<I, T, F>(
        name: &str,
        mut transport: Transport<I>,
        mailbox: Arc<Mailbox<T>>,
        mut decode: F,
    ) -> Result<Self>
    where
        I: Message,
        T: Send + Sync + 'static,
        F: FnMut(I) -> Result<Option<T>> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            let thread_name = name.to_owned();
            thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || {
                    let result =
                        receive_loop(&thread_name, &mut transport, &mailbox, &stop, &mut decode);
                    match result {
                        Ok(()) => mailbox.close(format!("{} stopped", thread_name)),
                        Err(err) => {
                            log::error!("{} receive loop failed: {}", thread_name, err);
                            mailbox.close(format!("{}: {}", thread_name, err));
                        }
                    }
                })
                .with_context(|| format!("Failed to spawn {} thread", name))?
        };
        Ok(Self {
            name: name.to_owned(),
            stop,
            handle: Some(handle),
        })
    }
}

fn receive_loop<I, T, F>(
    name: &str,
    transport: &mut Transport<I>,
    mailbox: &Mailbox<T>,
    stop: &AtomicBool,
    decode: &mut F,
) -> io::Result<()>
where
    I: Message,
    F: FnMut(I) -> Result<Option<T>>,
{
    while !stop.load(Ordering::Relaxed) {
        match transport.recv()? {
            Received::Message(msg) => match decode(msg) {
                Ok(Some(value)) => mailbox.publish(value),
                Ok(None) => {}
                Err(err) => log::warn!("{}: failed to decode message: {}", name, err),
            },
            Received::Malformed(err) => {
                log::warn!("{}: failed to parse datagram: {}", name, err)
            }
            Received::Idle => {}
        }
    }
    Ok(())
}

impl Drop for ReceiveThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("{} thread panicked", self.name);
            }
        }
    }
}

//! Interrupt delivery
//!
//! An [`IrqSource`] reports edges of the controller's interrupt line. An
//! [`IrqThread`] waits on one source and calls one [`IrqHandler`] per edge,
//! so the handler never runs concurrently with itself for a given device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};

/// How often a waiting thread checks for a stop request
const STOP_POLL: Duration = Duration::from_millis(100);

/// Outcome reported by an interrupt handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The interrupt was not for this handler (or it could not run)
    None,
    /// The interrupt was serviced
    Handled,
}

/// Something that services interrupts
pub trait IrqHandler: Send + Sync {
    /// Service one interrupt
    fn handle_irq(&self) -> IrqReturn;
}

/// A source of interrupt edges
pub trait IrqSource: Send {
    /// Wait up to `timeout` for the next edge
    ///
    /// Returns `true` if an edge arrived, `false` on timeout.
    fn wait(&mut self, timeout: Duration) -> Result<bool>;
}

impl<S: IrqSource + ?Sized> IrqSource for Box<S> {
    fn wait(&mut self, timeout: Duration) -> Result<bool> {
        (**self).wait(timeout)
    }
}

/// Per-thread dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IrqStats {
    /// Interrupts the handler serviced
    pub handled: u64,
    /// Interrupts the handler refused
    pub unhandled: u64,
}

/// A thread dispatching interrupts from one source to one handler
pub struct IrqThread {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<IrqStats>>,
}

impl IrqThread {
    /// Start dispatching on a new thread called `name`
    pub fn spawn<S, H>(name: &str, mut source: S, handler: Arc<H>) -> Result<Self>
    where
        S: IrqSource + 'static,
        H: IrqHandler + ?Sized + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut stats = IrqStats::default();
                while !thread_stop.load(Ordering::Acquire) {
                    if !source.wait(STOP_POLL)? {
                        continue;
                    }
                    match handler.handle_irq() {
                        IrqReturn::Handled => stats.handled += 1,
                        IrqReturn::None => stats.unhandled += 1,
                    }
                }
                Ok(stats)
            })
            .map_err(|e| Error::Irq(format!("cannot spawn {}: {}", name, e)))?;

        log::debug!("irq: dispatch thread '{}' started", name);
        Ok(Self { stop, handle })
    }

    /// Ask the thread to stop after its current wait
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Stop the thread and collect its counters
    ///
    /// Returns the source's error if waiting failed.
    pub fn stop(self) -> Result<IrqStats> {
        self.request_stop();
        self.handle
            .join()
            .map_err(|_| Error::Irq("dispatch thread panicked".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};

    struct ChannelSource(Receiver<()>);

    impl IrqSource for ChannelSource {
        fn wait(&mut self, timeout: Duration) -> Result<bool> {
            match self.0.recv_timeout(timeout) {
                Ok(()) => Ok(true),
                Err(RecvTimeoutError::Timeout) => Ok(false),
                Err(RecvTimeoutError::Disconnected) => Err(Error::Irq("line released".into())),
            }
        }
    }

    #[derive(Default)]
    struct Counter {
        calls: AtomicUsize,
        busy: AtomicBool,
    }

    impl IrqHandler for Counter {
        fn handle_irq(&self) -> IrqReturn {
            assert!(!self.busy.swap(true, Ordering::SeqCst));
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.busy.store(false, Ordering::SeqCst);
            IrqReturn::Handled
        }
    }

    #[test]
    fn test_dispatches_each_edge() {
        let (tx, rx) = channel();
        let handler = Arc::new(Counter::default());
        let irq = IrqThread::spawn("irq-test", ChannelSource(rx), handler.clone()).unwrap();

        for _ in 0..5 {
            tx.send(()).unwrap();
        }
        while handler.calls.load(Ordering::SeqCst) < 5 {
            thread::sleep(Duration::from_millis(1));
        }

        let stats = irq.stop().unwrap();
        assert_eq!(stats.handled, 5);
        assert_eq!(stats.unhandled, 0);
    }

    #[test]
    fn test_source_error_ends_thread() {
        let (tx, rx) = channel::<()>();
        let irq =
            IrqThread::spawn("irq-test", ChannelSource(rx), Arc::new(Counter::default())).unwrap();
        drop(tx);
        while !irq.handle.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(matches!(irq.stop(), Err(Error::Irq(_))));
    }
}

//! Camera tracker thread.
//!
//! Tracking blocks for a whole frame, so it runs on its own thread and hands its results to the
//! main loop through a [`SlotSender`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};

// Internal
use super::SlotSender;
use comms_if::{
    bus::{BusClient, BusError, BusParams},
    net::zmq,
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A blocking source of pattern positions.
pub trait Tracker: Send {
    /// Wait for the next observation.
    ///
    /// Returns the horizontal position of the pattern, negative if it is not visible, or `None`
    /// if nothing was observed this time. Implementations should not block indefinitely so the
    /// thread can notice a shutdown request.
    fn track(&mut self) -> Option<i32>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle on a running tracker thread, stops the thread when dropped.
pub struct TrackerThread {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Tracker fed by an external vision process publishing positions on the bus.
pub struct BusTracker {
    client: BusClient,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrackerThread {
    /// Start running `tracker`, sending every observation into `sender`.
    pub fn spawn<T>(mut tracker: T, sender: SlotSender) -> std::io::Result<Self>
    where
        T: Tracker + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let handle = thread::Builder::new()
            .name("cam_tracker".into())
            .spawn(move || {
                info!("Camera tracker started");

                while !shutdown_flag.load(Ordering::Relaxed) {
                    if let Some(position) = tracker.track() {
                        sender.send(position);
                    }
                }

                info!("Camera tracker stopped");
            })?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }
}

impl Drop for TrackerThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Camera tracker thread panicked");
            }
        }
    }
}

impl BusTracker {
    /// Subscribe to `topic` on the bus described by `params`.
    pub fn new(ctx: &zmq::Context, params: &BusParams, topic: &str) -> Result<Self, BusError> {
        let params = BusParams {
            pub_endpoint: None,
            ..params.clone()
        };

        let mut client = BusClient::new(ctx, &params)?;
        client.subscribe(topic)?;

        Ok(Self { client })
    }
}

impl Tracker for BusTracker {
    fn track(&mut self) -> Option<i32> {
        match self.client.recv() {
            Ok(Some(msg)) => match msg.parse_int() {
                Ok(position) => {
                    debug!("Tracker position {}", position);
                    Some(position)
                }
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Tracker receive failed: {}", e);
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::cam::slot;
    use std::time::{Duration, Instant};

    /// Replays a fixed list of positions then idles.
    struct Replay(Vec<i32>);

    impl Tracker for Replay {
        fn track(&mut self) -> Option<i32> {
            if self.0.is_empty() {
                thread::sleep(Duration::from_millis(1));
                None
            } else {
                Some(self.0.remove(0))
            }
        }
    }

    #[test]
    fn test_thread_publishes_latest() {
        let (tx, rx) = slot();
        let t = TrackerThread::spawn(Replay(vec![120, 118, 125]), tx).unwrap();

        let start = Instant::now();
        let mut last = None;
        while start.elapsed() < Duration::from_secs(2) {
            if let Some(v) = rx.try_recv() {
                last = Some(v);
                if v == 125 {
                    break;
                }
            }
            thread::sleep(Duration::from_millis(1));
        }

        drop(t);
        assert_eq!(last, Some(125));
    }
}

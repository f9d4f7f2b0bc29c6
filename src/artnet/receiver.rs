//! Art-Net capture engine
//!
//! The [`Receiver`] owns the UDP socket lifecycle and drives decoded ArtDmx
//! packets into a [`FrameStore`]. It moves between exactly two states:
//!
//! ```text
//! Stopped --start()--> Listening --stop()--> Stopped
//! ```
//!
//! While listening, one background task reads the socket. Every other
//! operation runs on the caller's task and only touches the shared store, so
//! queries are safe at any time.

use futures::{Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::packet;
use super::store::FrameStore;
use crate::config::CaptureConfig;
use crate::types::DmxFrame;
use crate::{HarnessError, Result};

/// Largest datagram the receive loop reads; ArtDmx packets are at most 530 bytes.
const RECV_BUFFER_SIZE: usize = 2048;

/// Floor for `CaptureConfig::read_timeout`; a zero timeout would spin the loop.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Lifecycle state of a [`Receiver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Stopped,
    Listening,
}

/// Counters for traffic seen by the receive loop.
///
/// Malformed and non-ArtDmx packets are discarded by policy; these counters
/// make that discard observable without changing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Datagrams read from the socket
    pub packets_received: u64,
    /// Datagrams decoded into frames and stored
    pub frames_captured: u64,
    /// Datagrams that failed to decode
    pub packets_discarded: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    received: AtomicU64,
    captured: AtomicU64,
    discarded: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            packets_received: self.received.load(Ordering::Relaxed),
            frames_captured: self.captured.load(Ordering::Relaxed),
            packets_discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the receiver handle and its receive task
#[derive(Debug)]
struct Shared {
    store: Arc<FrameStore>,
    stats: StatsCounters,
    latest: watch::Sender<Option<Arc<DmxFrame>>>,
}

/// Handles of a running receive task
struct Running {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Captures ArtDmx frames from a UDP socket.
///
/// # Example
///
/// ```rust,no_run
/// use lightcheck::{CaptureConfig, Receiver};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> lightcheck::Result<()> {
/// let mut receiver = Receiver::new(CaptureConfig::loopback(0));
/// let addr = match receiver.start().await {
///     Ok(addr) => addr,
///     Err(e) if e.is_bind_conflict() => return Ok(()), // skip, port is busy
///     Err(e) => return Err(e),
/// };
///
/// // ... make the server transmit to `addr` ...
/// let frame = receiver
///     .wait_for_frame(0, Duration::from_secs(1), |f| f.channels[0] == 177)
///     .await?;
/// assert_eq!(frame.channel(1), Some(177));
///
/// receiver.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Receiver {
    config: CaptureConfig,
    shared: Arc<Shared>,
    running: Option<Running>,
}

impl Receiver {
    /// Create a stopped receiver.
    pub fn new(config: CaptureConfig) -> Self {
        let (latest, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            store: Arc::new(FrameStore::new()),
            stats: StatsCounters::default(),
            latest,
        });
        Self { config, shared, running: None }
    }

    /// Bind the capture socket and spawn the receive task.
    ///
    /// Returns the bound local address, which differs from the configured one
    /// when binding port 0. A failed bind leaves the receiver stopped; check
    /// [`HarnessError::is_bind_conflict`] to skip rather than fail.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            return Err(HarnessError::AlreadyListening { addr: running.local_addr });
        }

        let bind_addr = self.config.bind_addr;
        let socket =
            UdpSocket::bind(bind_addr).await.map_err(|e| HarnessError::bind_failed(bind_addr, e))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| HarnessError::io("reading bound Art-Net address", e))?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            socket,
            Arc::clone(&self.shared),
            cancel.clone(),
            self.config.read_timeout.max(MIN_READ_TIMEOUT),
        ));

        info!("Art-Net receiver listening on {}", local_addr);
        self.running = Some(Running { local_addr, cancel, task });
        Ok(local_addr)
    }

    /// Stop the receive task and close the socket.
    ///
    /// Returns once the task has exited, so the port is free again. Calling
    /// `stop` on a stopped receiver does nothing.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.cancel.cancel();
        if let Err(e) = running.task.await {
            warn!("Art-Net receive task ended abnormally: {}", e);
        }
        info!("Art-Net receiver on {} stopped", running.local_addr);
    }

    pub fn state(&self) -> ReceiverState {
        if self.running.is_some() { ReceiverState::Listening } else { ReceiverState::Stopped }
    }

    /// Bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Shared handle to the underlying frame store.
    pub fn store(&self) -> Arc<FrameStore> {
        Arc::clone(&self.shared.store)
    }

    /// Copy of every captured frame, in arrival order.
    pub fn frames(&self) -> Vec<Arc<DmxFrame>> {
        self.shared.store.snapshot()
    }

    /// Discard captured frames, isolating the next capture window.
    pub fn clear_frames(&self) {
        self.shared.store.clear();
    }

    /// Latest captured frame of a wire universe.
    pub fn latest_frame(&self, universe: u16) -> Option<Arc<DmxFrame>> {
        self.shared.store.latest(universe)
    }

    /// Level of a 1-indexed channel in the latest frame of a wire universe.
    pub fn channel_value(&self, universe: u16, channel: u16) -> Option<u8> {
        self.shared.store.channel_value(universe, channel)
    }

    pub fn stats(&self) -> CaptureStats {
        self.shared.stats.snapshot()
    }

    /// Wait until a frame of `universe` satisfying `predicate` has been captured.
    ///
    /// The latest stored frame is checked first, then the latest frame of the
    /// universe after each capture, until `timeout` elapses.
    pub async fn wait_for_frame<F>(
        &self,
        universe: u16,
        timeout: Duration,
        predicate: F,
    ) -> Result<Arc<DmxFrame>>
    where
        F: Fn(&DmxFrame) -> bool,
    {
        // Subscribe before inspecting the store so no frame slips between the two.
        let mut updates = self.shared.latest.subscribe();

        if let Some(frame) = self.shared.store.latest(universe).filter(|f| predicate(&**f)) {
            return Ok(frame);
        }

        let wait = async {
            loop {
                if updates.changed().await.is_err() {
                    return None;
                }
                // The watch keeps only the newest frame, so re-read the store
                // to cover bursts on other universes.
                let candidate = updates.borrow_and_update().clone();
                let frame = match candidate {
                    Some(frame) if frame.universe == universe => Some(frame),
                    _ => self.shared.store.latest(universe),
                };
                if let Some(frame) = frame.filter(|f| predicate(&**f)) {
                    return Some(frame);
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(Some(frame)) => Ok(frame),
            _ => Err(HarnessError::timeout(
                timeout,
                format!("matching frame on wire universe {}", universe),
            )),
        }
    }

    /// Stream of newly captured frames.
    ///
    /// Latest-wins: a slow consumer sees the newest frame rather than every
    /// frame. Use [`Receiver::frames`] for the complete history.
    pub fn subscribe(&self) -> impl Stream<Item = Arc<DmxFrame>> + 'static {
        WatchStream::from_changes(self.shared.latest.subscribe()).filter_map(|opt| async move { opt })
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            debug!("Dropping listening Art-Net receiver on {}", running.local_addr);
            running.cancel.cancel();
        }
    }
}

/// Read datagrams until cancelled or the socket fails.
async fn receive_loop(
    socket: UdpSocket,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    read_timeout: Duration,
) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Art-Net receive loop cancelled");
                break;
            }
            read = tokio::time::timeout(read_timeout, socket.recv_from(&mut buf)) => read,
        };

        let (len, peer) = match read {
            Err(_elapsed) => continue,
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                debug!("Art-Net socket read failed, ending receive loop: {}", e);
                break;
            }
        };

        shared.stats.received.fetch_add(1, Ordering::Relaxed);

        match packet::decode(&buf[..len]) {
            Some(frame) => {
                trace!(
                    "Captured universe={} sequence={} from {}",
                    frame.universe, frame.sequence, peer
                );
                let frame = Arc::new(frame);
                shared.store.append(Arc::clone(&frame));
                shared.stats.captured.fetch_add(1, Ordering::Relaxed);
                shared.latest.send_replace(Some(frame));
            }
            None => {
                shared.stats.discarded.fetch_add(1, Ordering::Relaxed);
                trace!(
                    "Discarded {} byte datagram from {} (opcode {:?})",
                    len,
                    peer,
                    packet::peek_opcode(&buf[..len])
                );
            }
        }
    }

    let stats = shared.stats.snapshot();
    debug!(
        "Art-Net receive loop ended ({} captured, {} discarded)",
        stats.frames_captured, stats.packets_discarded
    );
}

// MIT License - Copyright (c) 2026 Peter Wright
// Door controller handle and connection supervisor

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ConfigSource, Timings};
use crate::door::{DoorState, DoorStateTracker};
use crate::error::{Result, WiflyError};
use crate::event::DoorListener;
use crate::session::Session;
use crate::signal::{Desired, OpenSignal};
use crate::transport::{tcp, PatternLink};

/// Handle to the background worker that talks to the WiFly module.
///
/// The worker starts idle. [`open`](Self::open) makes it connect and keep
/// reconnecting, every 3 seconds, until [`close`](Self::close) is called.
/// All control methods return immediately and may be called from any thread.
/// Dropping the handle stops the worker.
///
/// # Example
///
/// ```no_run
/// use wifly_door::{event_channel, ConnectionConfig, DoorController};
///
/// #[tokio::main]
/// async fn main() {
///     let config = ConnectionConfig::builder()
///         .host("10.0.0.1")
///         .port(2000)
///         .password("secret")
///         .build();
///     let (events, mut rx) = event_channel(16);
///
///     let controller = DoorController::spawn(events, config);
///     controller.open();
///
///     while let Ok(event) = rx.recv().await {
///         println!("{event:?}");
///     }
/// }
/// ```
pub struct DoorController {
    opened_tx: watch::Sender<Desired>,
    press_tx: mpsc::Sender<()>,
    state_rx: watch::Receiver<DoorState>,
    worker_handle: Option<JoinHandle<()>>,
}

impl DoorController {
    /// Start the worker with the default timings. Must be called from within
    /// a tokio runtime.
    pub fn spawn<L, C>(listener: L, config: C) -> Self
    where
        L: DoorListener + 'static,
        C: ConfigSource + 'static,
    {
        Self::spawn_with_timings(listener, config, Timings::default())
    }

    pub fn spawn_with_timings<L, C>(listener: L, config: C, timings: Timings) -> Self
    where
        L: DoorListener + 'static,
        C: ConfigSource + 'static,
    {
        let (opened_tx, opened_rx) = watch::channel(Desired::default());
        // Capacity 1: a press requested while another is pending is dropped.
        let (press_tx, press_rx) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(DoorState::Unknown);

        let worker = Worker {
            listener: Box::new(listener),
            config: Box::new(config),
            timings,
            opened: opened_rx,
            presses: press_rx,
            tracker: DoorStateTracker::new(),
            state_tx,
        };
        let worker_handle = tokio::spawn(worker.run());

        Self {
            opened_tx,
            press_tx,
            state_rx,
            worker_handle: Some(worker_handle),
        }
    }

    /// Connect to the module and keep the connection up.
    pub fn open(&self) {
        debug!("open()");
        self.opened_tx.send_modify(Desired::open);
    }

    /// Drop the connection and stop reconnecting.
    ///
    /// A read or write the worker is blocked in is cancelled right away and
    /// the socket is released; the listener then gets `on_connection_lost`.
    pub fn close(&self) {
        debug!("Closing connection");
        self.opened_tx.send_modify(Desired::close);
    }

    /// Ask the worker to pulse the door button on its next poll cycle.
    ///
    /// Presses requested before the worker gets to the first one are merged.
    pub fn press_button(&self) {
        debug!("press_button()");
        match self.press_tx.try_send(()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("Button press already pending");
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                warn!("Door worker is gone, button press ignored");
            }
        }
    }

    /// Whether the connection is currently wanted.
    pub fn is_open(&self) -> bool {
        self.opened_tx.borrow().open
    }

    /// Last door state reported on the current connection.
    pub fn door_state(&self) -> DoorState {
        *self.state_rx.borrow()
    }

    /// Watch door state changes, including the reset to `Unknown` when a
    /// connection ends.
    pub fn watch_state(&self) -> watch::Receiver<DoorState> {
        self.state_rx.clone()
    }
}

impl Drop for DoorController {
    fn drop(&mut self) {
        self.opened_tx.send_modify(Desired::close);
        if let Some(handle) = self.worker_handle.take() {
            handle.abort();
        }
    }
}

/// The connection supervisor. Owns everything the connection needs and runs
/// until the controller goes away.
struct Worker {
    listener: Box<dyn DoorListener>,
    config: Box<dyn ConfigSource>,
    timings: Timings,
    opened: watch::Receiver<Desired>,
    presses: mpsc::Receiver<()>,
    tracker: DoorStateTracker,
    state_tx: watch::Sender<DoorState>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            // Idle until opened. A dropped controller ends the worker.
            let alive = self.opened.wait_for(|desired| desired.open).await.is_ok();
            if !alive {
                debug!("Door controller dropped, worker exiting");
                return;
            }

            match self.connect_and_run().await {
                Ok(()) => info!("Connection to WiFly module closed"),
                Err(WiflyError::Closed) => info!("Connection to WiFly module closed on request"),
                Err(e) => warn!("Connection to WiFly module lost ({}): {}", e.category(), e),
            }

            self.tracker.reset();
            self.state_tx.send_replace(DoorState::Unknown);
            self.listener.on_connection_lost();

            if self.opened.borrow().open {
                info!("Retrying in {:?}", self.timings.retry_delay);
            }
            sleep(self.timings.retry_delay).await;
        }
    }

    /// One connection attempt. The socket and receive buffer live only for
    /// the duration of this call.
    async fn connect_and_run(&mut self) -> Result<()> {
        let config = self.config.connection_config()?;
        info!("Connecting to WiFly module at {}:{}", config.host, config.port);

        let mut signal = OpenSignal::new(self.opened.clone());
        let stream = tokio::select! {
            result = tcp::connect(&config, self.timings.read_timeout) => result?,
            _ = signal.closed() => return Err(WiflyError::Closed),
        };

        let link = PatternLink::new(stream, self.timings.read_timeout, signal.clone());
        let mut session = Session::new(
            link,
            self.listener.as_ref(),
            &mut self.tracker,
            &self.state_tx,
            &mut self.presses,
            signal,
            self.timings,
        );
        session.run(&config.password).await
    }
}

// MIT License - Copyright (c) 2026 Peter Wright
// One logged-in session with the module

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Timings;
use crate::constants::{
    OUTPUT_PRESSED, OUTPUT_RELEASED, PASSWORD_PROMPT, SENSOR_DOOR_CLOSED, SENSOR_DOOR_OPEN,
};
use crate::door::{DoorState, DoorStateTracker};
use crate::error::Result;
use crate::event::{notify_state, DoorListener};
use crate::protocol::Command;
use crate::signal::OpenSignal;
use crate::transport::PatternLink;

/// Drives the module from the password prompt until the connector is closed
/// or the link fails.
pub struct Session<'a, S> {
    link: PatternLink<S>,
    listener: &'a dyn DoorListener,
    tracker: &'a mut DoorStateTracker,
    state_tx: &'a watch::Sender<DoorState>,
    presses: &'a mut mpsc::Receiver<()>,
    signal: OpenSignal,
    timings: Timings,
}

impl<'a, S> Session<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        link: PatternLink<S>,
        listener: &'a dyn DoorListener,
        tracker: &'a mut DoorStateTracker,
        state_tx: &'a watch::Sender<DoorState>,
        presses: &'a mut mpsc::Receiver<()>,
        signal: OpenSignal,
        timings: Timings,
    ) -> Self {
        Self {
            link,
            listener,
            tracker,
            state_tx,
            presses,
            signal,
            timings,
        }
    }

    /// Log in, then poll until closed. Returns `Ok` only on a requested close.
    pub async fn run(&mut self, password: &str) -> Result<()> {
        self.login(password).await?;
        info!("Logged in to WiFly module, polling door sensors");

        while self.signal.is_open() {
            let state = self.poll().await?;
            if let Some(changed) = self.tracker.update(state) {
                info!("Door {}", changed);
                self.state_tx.send_replace(changed);
                notify_state(self.listener, changed);
            }

            if self.wait_for_press().await {
                self.press_button().await?;
            }
        }

        debug!("Session closed on request");
        Ok(())
    }

    /// Answer the password prompt and switch to command mode.
    async fn login(&mut self, password: &str) -> Result<()> {
        self.link.expect(PASSWORD_PROMPT).await?;
        self.link
            .command(&Command::Password {
                password: password.to_string(),
            })
            .await?;
        self.link.command(&Command::EnterCommandMode).await
    }

    /// Read both rail sensors and classify the door.
    async fn poll(&mut self) -> Result<DoorState> {
        let top = self.link.read_sensor(SENSOR_DOOR_OPEN).await?;
        debug!("Door opened sensor = {}", top);
        let bottom = self.link.read_sensor(SENSOR_DOOR_CLOSED).await?;
        debug!("Door closed sensor = {}", bottom);
        Ok(DoorState::classify(top, bottom))
    }

    /// Sleep until the next poll is due or a control signal arrives.
    /// Returns whether a button press was requested in the meantime.
    async fn wait_for_press(&mut self) -> bool {
        let woken_by_press = tokio::select! {
            _ = sleep(self.timings.poll_interval) => false,
            Some(()) = self.presses.recv() => true,
            _ = self.signal.changed() => false,
        };
        // Requests that piled up during the wait count as one press.
        let pending = self.presses.try_recv().is_ok();
        woken_by_press || pending
    }

    /// Pulse the relay wired to the door opener button.
    async fn press_button(&mut self) -> Result<()> {
        info!("Pressing door button");
        self.link
            .command(&Command::SetOutput {
                value: OUTPUT_PRESSED,
            })
            .await?;
        sleep(self.timings.press_pulse).await;
        self.link
            .command(&Command::SetOutput {
                value: OUTPUT_RELEASED,
            })
            .await
    }
}

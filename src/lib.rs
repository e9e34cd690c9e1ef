// MIT License - Copyright (c) 2026 Peter Wright
//
//! # wifly-door
//!
//! Garage door control through a WiFly serial-over-WiFi module.
//!
//! A background worker keeps a TCP session with the module, logs in, polls
//! the two rail sensors once a second and reports door position changes to a
//! [`DoorListener`]. A button press request pulses the relay that drives the
//! door opener. Any failure drops the connection and the worker reconnects
//! after 3 seconds for as long as the controller is open.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wifly_door::{event_channel, ConnectionConfig, DoorController, DoorEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConnectionConfig::builder()
//!         .host("10.0.0.1")
//!         .port(2000)
//!         .password("secret")
//!         .build();
//!
//!     let (events, mut rx) = event_channel(16);
//!     let controller = DoorController::spawn(events, config);
//!     controller.open();
//!
//!     while let Ok(event) = rx.recv().await {
//!         if let DoorEvent::StateChanged(state) = event {
//!             println!("Door is {state}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod controller;
pub mod door;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod signal;
pub mod transport;

// Re-exports for convenience
pub use config::{ConfigFile, ConfigSource, ConnectionConfig, ConnectionConfigBuilder, SharedConfig, Timings};
pub use controller::DoorController;
pub use door::{DoorState, DoorStateTracker};
pub use error::{Result, WiflyError};
pub use event::{event_channel, DoorEvent, DoorListener, EventReceiver, EventSender};

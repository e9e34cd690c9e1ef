// MIT License - Copyright (c) 2026 Peter Wright
// Door listener and event bus

use crate::door::DoorState;

/// Receives door notifications from the connector worker.
///
/// Calls arrive one at a time, in order, on the worker task. Implementations
/// that drive a UI must hand the call over to their own thread and return
/// quickly.
pub trait DoorListener: Send + Sync {
    /// Called when the door is opened.
    fn on_door_opened(&self);

    /// Called when the door is neither opened nor closed.
    fn on_door_moving(&self);

    /// Called when the door is closed.
    fn on_door_closed(&self);

    /// Called when both sensors report the door at once.
    fn on_door_invalid(&self);

    /// Called once every time a session with the module ends.
    fn on_connection_lost(&self);
}

impl<T: DoorListener + ?Sized> DoorListener for std::sync::Arc<T> {
    fn on_door_opened(&self) {
        (**self).on_door_opened()
    }

    fn on_door_moving(&self) {
        (**self).on_door_moving()
    }

    fn on_door_closed(&self) {
        (**self).on_door_closed()
    }

    fn on_door_invalid(&self) {
        (**self).on_door_invalid()
    }

    fn on_connection_lost(&self) {
        (**self).on_connection_lost()
    }
}

/// Dispatch a reported state to the matching listener callback.
pub(crate) fn notify_state(listener: &dyn DoorListener, state: DoorState) {
    match state {
        DoorState::Opened => listener.on_door_opened(),
        DoorState::Moving => listener.on_door_moving(),
        DoorState::Closed => listener.on_door_closed(),
        DoorState::Invalid => listener.on_door_invalid(),
        DoorState::Unknown => {}
    }
}

/// Door notifications as values, for subscribers of the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorEvent {
    /// Door position changed
    StateChanged(DoorState),
    /// Session with the module ended
    ConnectionLost,
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<DoorEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<DoorEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}

// Sends fail only when nobody is subscribed, which is fine.
impl DoorListener for EventSender {
    fn on_door_opened(&self) {
        let _ = self.send(DoorEvent::StateChanged(DoorState::Opened));
    }

    fn on_door_moving(&self) {
        let _ = self.send(DoorEvent::StateChanged(DoorState::Moving));
    }

    fn on_door_closed(&self) {
        let _ = self.send(DoorEvent::StateChanged(DoorState::Closed));
    }

    fn on_door_invalid(&self) {
        let _ = self.send(DoorEvent::StateChanged(DoorState::Invalid));
    }

    fn on_connection_lost(&self) {
        let _ = self.send(DoorEvent::ConnectionLost);
    }
}

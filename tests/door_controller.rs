// End-to-end tests for the door controller
//
// These tests run the real controller against a scripted WiFly module that
// listens on a loopback TCP port.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wifly_door::{
    ConnectionConfig, DoorController, DoorEvent, DoorListener, DoorState, SharedConfig, Timings,
};

const PASSWORD: &str = "secret";

// Raw sensor readings: below 100000 means the magnet is at the sensor.
const AT_SENSOR: u32 = 0x00032;
const AWAY: u32 = 0x1F4A0;

// ---------------------------------------------------------------------------
// Fake module
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct FakeWifly {
    addr: SocketAddr,
    sensors: Arc<Mutex<(u32, u32)>>,
    commands: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    silent: Arc<AtomicBool>,
}

impl FakeWifly {
    async fn start(top: u32, bottom: u32) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let device = Self {
            addr: listener.local_addr().unwrap(),
            sensors: Arc::new(Mutex::new((top, bottom))),
            commands: Arc::new(Mutex::new(Vec::new())),
            connections: Arc::new(AtomicUsize::new(0)),
            silent: Arc::new(AtomicBool::new(false)),
        };

        let server = device.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                server.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(server.clone().serve(socket));
            }
        });
        device
    }

    fn config(&self, password: &str) -> ConnectionConfig {
        ConnectionConfig::builder()
            .host("127.0.0.1")
            .port(self.addr.port())
            .password(password)
            .build()
    }

    fn set_sensors(&self, top: u32, bottom: u32) {
        *self.sensors.lock().unwrap() = (top, bottom);
    }

    /// Stop answering sensor queries, leaving the client blocked in a read.
    fn go_silent(&self) {
        self.silent.store(true, Ordering::SeqCst);
    }

    fn count(&self, command: &str) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    async fn serve(self, mut socket: TcpStream) {
        if socket.write_all(b"PASS?").await.is_err() {
            return;
        }

        let mut logged_in = false;
        let mut pending: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            pending.extend_from_slice(&chunk[..n]);

            loop {
                let reply = if pending.starts_with(b"$$$") {
                    pending.drain(..3);
                    self.commands.lock().unwrap().push("$$$".to_string());
                    "CMD\r\n".to_string()
                } else if let Some(end) = pending.iter().position(|b| *b == b'\r') {
                    let line: Vec<u8> = pending.drain(..=end).collect();
                    let line = String::from_utf8_lossy(&line[..end]).to_string();
                    if !logged_in {
                        if line != PASSWORD {
                            // The module hangs up on a bad password.
                            return;
                        }
                        logged_in = true;
                        "AOK\r\n".to_string()
                    } else {
                        self.commands.lock().unwrap().push(line.clone());
                        match self.answer(&line) {
                            Some(reply) => reply,
                            None => continue,
                        }
                    }
                } else {
                    break;
                };

                if socket.write_all(reply.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    }

    fn answer(&self, line: &str) -> Option<String> {
        if let Some(id) = line.strip_prefix("show q ") {
            if self.silent.load(Ordering::SeqCst) {
                return None;
            }
            let (top, bottom) = *self.sensors.lock().unwrap();
            let value = if id == "2" { top } else { bottom };
            return Some(format!("show q {id}\r\r\n8{value:05X}\r\n>"));
        }
        if line.starts_with("set sys output ") {
            return Some("AOK\r\n".to_string());
        }
        Some("ERR: ?-Cmd\r\n".to_string())
    }
}

// ---------------------------------------------------------------------------
// Listener and helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<DoorEvent>>,
}

impl Recorder {
    fn events(&self) -> Vec<DoorEvent> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, event: DoorEvent) -> usize {
        self.events().into_iter().filter(|e| *e == event).count()
    }

    fn push(&self, event: DoorEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl DoorListener for Recorder {
    fn on_door_opened(&self) {
        self.push(DoorEvent::StateChanged(DoorState::Opened));
    }

    fn on_door_moving(&self) {
        self.push(DoorEvent::StateChanged(DoorState::Moving));
    }

    fn on_door_closed(&self) {
        self.push(DoorEvent::StateChanged(DoorState::Closed));
    }

    fn on_door_invalid(&self) {
        self.push(DoorEvent::StateChanged(DoorState::Invalid));
    }

    fn on_connection_lost(&self) {
        self.push(DoorEvent::ConnectionLost);
    }
}

fn fast_timings() -> Timings {
    Timings {
        read_timeout: Duration::from_secs(2),
        retry_delay: Duration::from_millis(100),
        poll_interval: Duration::from_millis(20),
        press_pulse: Duration::from_millis(10),
    }
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

const OPENED: DoorEvent = DoorEvent::StateChanged(DoorState::Opened);
const MOVING: DoorEvent = DoorEvent::StateChanged(DoorState::Moving);
const CLOSED: DoorEvent = DoorEvent::StateChanged(DoorState::Closed);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_opened_reported_once() {
    let device = FakeWifly::start(AT_SENSOR, AWAY).await;
    let recorder = Arc::new(Recorder::default());
    let controller =
        DoorController::spawn_with_timings(recorder.clone(), device.config(PASSWORD), fast_timings());

    controller.open();
    wait_until("three polls", || device.count("show q 3") >= 3).await;

    assert_eq!(recorder.events(), vec![OPENED]);
    assert_eq!(controller.door_state(), DoorState::Opened);
    assert_eq!(device.count("$$$"), 1);
    controller.close();
}

#[tokio::test]
async fn test_moving_reported_once_then_closed() {
    let device = FakeWifly::start(AWAY, AWAY).await;
    let recorder = Arc::new(Recorder::default());
    let controller =
        DoorController::spawn_with_timings(recorder.clone(), device.config(PASSWORD), fast_timings());

    controller.open();
    wait_until("three polls", || device.count("show q 3") >= 3).await;
    assert_eq!(recorder.events(), vec![MOVING]);

    device.set_sensors(AWAY, AT_SENSOR);
    wait_until("closed report", || recorder.count(CLOSED) == 1).await;
    let polls = device.count("show q 3");
    wait_until("more polls", || device.count("show q 3") >= polls + 3).await;

    assert_eq!(recorder.events(), vec![MOVING, CLOSED]);
    controller.close();
}

#[tokio::test]
async fn test_double_press_toggles_once() {
    let device = FakeWifly::start(AT_SENSOR, AWAY).await;
    let recorder = Arc::new(Recorder::default());
    let controller =
        DoorController::spawn_with_timings(recorder.clone(), device.config(PASSWORD), fast_timings());

    controller.open();
    wait_until("opened report", || recorder.count(OPENED) == 1).await;

    controller.press_button();
    controller.press_button();
    wait_until("button release", || device.count("set sys output 0") == 1).await;
    let polls = device.count("show q 3");
    wait_until("more polls", || device.count("show q 3") >= polls + 3).await;

    assert_eq!(device.count("set sys output 2"), 1);
    assert_eq!(device.count("set sys output 0"), 1);
    controller.close();
}

#[tokio::test]
async fn test_close_unblocks_read() {
    let device = FakeWifly::start(AT_SENSOR, AWAY).await;
    device.go_silent();
    let recorder = Arc::new(Recorder::default());
    let timings = Timings {
        read_timeout: Duration::from_secs(30),
        ..fast_timings()
    };
    let controller = DoorController::spawn_with_timings(recorder.clone(), device.config(PASSWORD), timings);

    controller.open();
    wait_until("first sensor query", || device.count("show q 2") == 1).await;

    let started = std::time::Instant::now();
    controller.close();
    wait_until("connection lost", || recorder.count(DoorEvent::ConnectionLost) == 1).await;
    assert!(started.elapsed() < Duration::from_secs(2));

    // Closed for good: no retry after the delay.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(recorder.events(), vec![DoorEvent::ConnectionLost]);
    assert_eq!(device.connections(), 1);
    assert_eq!(controller.door_state(), DoorState::Unknown);
    assert!(!controller.is_open());
}

#[tokio::test]
async fn test_wrong_password_keeps_retrying() {
    let device = FakeWifly::start(AT_SENSOR, AWAY).await;
    let recorder = Arc::new(Recorder::default());
    let controller =
        DoorController::spawn_with_timings(recorder.clone(), device.config("wrong"), fast_timings());

    controller.open();
    wait_until("two attempts", || recorder.count(DoorEvent::ConnectionLost) >= 2).await;

    assert!(device.connections() >= 2);
    assert!(recorder.events().iter().all(|e| *e == DoorEvent::ConnectionLost));
    assert_eq!(device.count("$$$"), 0);
    controller.close();
}

#[tokio::test]
async fn test_close_then_open_reconnects() {
    let device = FakeWifly::start(AT_SENSOR, AWAY).await;
    let recorder = Arc::new(Recorder::default());
    let controller =
        DoorController::spawn_with_timings(recorder.clone(), device.config(PASSWORD), fast_timings());

    controller.open();
    wait_until("opened report", || recorder.count(OPENED) == 1).await;

    controller.close();
    controller.open();
    wait_until("second opened report", || recorder.count(OPENED) == 2).await;

    assert_eq!(recorder.events(), vec![OPENED, DoorEvent::ConnectionLost, OPENED]);
    assert_eq!(device.connections(), 2);
    controller.close();
}

#[tokio::test]
async fn test_updated_settings_used_on_retry() {
    let device = FakeWifly::start(AT_SENSOR, AWAY).await;
    let recorder = Arc::new(Recorder::default());
    let settings = SharedConfig::new(device.config("wrong"));
    let controller =
        DoorController::spawn_with_timings(recorder.clone(), settings.clone(), fast_timings());

    controller.open();
    wait_until("failed attempt", || recorder.count(DoorEvent::ConnectionLost) >= 1).await;

    settings.update(device.config(PASSWORD));
    wait_until("opened report", || recorder.count(OPENED) == 1).await;
    controller.close();
}

#[tokio::test]
async fn test_event_channel_subscriber() {
    let device = FakeWifly::start(AWAY, AT_SENSOR).await;
    let (events, mut rx) = wifly_door::event_channel(16);
    let controller = DoorController::spawn_with_timings(events, device.config(PASSWORD), fast_timings());
    let mut state = controller.watch_state();

    controller.open();
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, CLOSED);

    state.wait_for(|s| *s == DoorState::Closed).await.unwrap();
    controller.close();
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, DoorEvent::ConnectionLost);
}

// MIT License - Copyright (c) 2026 Peter Wright
// Protocol and timing constants

use std::time::Duration;

/// Prompt the module prints when a TCP client connects.
pub const PASSWORD_PROMPT: &str = "PASS?";

/// Acknowledgement for a password or `set` command.
pub const ACK: &str = "AOK";

/// Escape sequence switching the module into command mode. No line ending.
pub const COMMAND_MODE_ESCAPE: &str = "$$$";

/// Reply to the command mode escape.
pub const COMMAND_MODE_READY: &str = "CMD\r\n";

/// Console prompt terminating every `show` reply.
pub const COMMAND_PROMPT: &str = ">";

/// Sensor wired to the top of the rail (triggered when the door is open).
pub const SENSOR_DOOR_OPEN: u8 = 2;

/// Sensor wired to the bottom of the rail (triggered when the door is closed).
pub const SENSOR_DOOR_CLOSED: u8 = 3;

/// Number of hex digits in a sensor report.
pub const SENSOR_DIGITS: usize = 5;

/// A sensor reading below this value means the sensor is triggered.
pub const SENSOR_TRIGGER_THRESHOLD: u32 = 100_000;

/// Relay output value that closes the door button contact.
pub const OUTPUT_PRESSED: u8 = 2;

/// Relay output value that releases the door button contact.
pub const OUTPUT_RELEASED: u8 = 0;

/// Upper bound on a single blocking read from the module.
pub const READ_TIMEOUT: Duration = Duration::from_millis(3000);

/// Delay between a lost connection and the next attempt.
pub const RETRY_DELAY: Duration = Duration::from_millis(3000);

/// Interval between two sensor polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// How long the relay is held for a button press.
pub const PRESS_PULSE: Duration = Duration::from_millis(250);

/// Size of a single socket read.
pub const READ_CHUNK: usize = 1024;

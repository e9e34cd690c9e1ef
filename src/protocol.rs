// MIT License - Copyright (c) 2026 Peter Wright
// WiFly console commands

use std::fmt;

use crate::constants::{ACK, COMMAND_MODE_ESCAPE, COMMAND_MODE_READY, SENSOR_DIGITS};
use crate::error::{Result, WiflyError};

/// Commands sent to the WiFly module.
///
/// # Session
///
/// After TCP connect the module prints `PASS?`. The exchange is then:
///
/// ```text
/// -> <password>\r          <- AOK
/// -> $$$                   <- CMD\r\n
/// -> show q 2\r            <- show q 2\r\r\n8XXXXX>
/// -> show q 3\r            <- show q 3\r\r\n8XXXXX>
/// -> set sys output 2\r    <- AOK      (button press only)
/// -> set sys output 0\r    <- AOK      (250ms later)
/// ```
///
/// The module echoes console commands, so the reply pattern of a `show`
/// command starts with the command itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `<password>\r`: Answer to the `PASS?` prompt.
    Password { password: String },
    /// `$$$`: Enter command mode. Sent without a line ending.
    EnterCommandMode,
    /// `show q <id>\r`: Report the value of sensor `id`.
    /// Reply: echo, `8`, five hex digits, then the `>` prompt.
    ShowSensor { id: u8 },
    /// `set sys output <value>\r`: Drive the GPIO outputs.
    SetOutput { value: u8 },
}

impl Command {
    /// Bytes to put on the wire.
    pub fn to_wire_string(&self) -> String {
        match self {
            Self::Password { password } => format!("{password}\r"),
            Self::EnterCommandMode => COMMAND_MODE_ESCAPE.to_string(),
            Self::ShowSensor { id } => format!("show q {id}\r"),
            Self::SetOutput { value } => format!("set sys output {value}\r"),
        }
    }

    /// Pattern that must show up in the reply stream before the command
    /// counts as accepted.
    pub fn reply_pattern(&self) -> String {
        match self {
            Self::Password { .. } | Self::SetOutput { .. } => ACK.to_string(),
            Self::EnterCommandMode => COMMAND_MODE_READY.to_string(),
            // The trailing `8` marks a fresh sensor report.
            Self::ShowSensor { id } => format!("show q {id}\r\r\n8"),
        }
    }
}

// Log form: the password is masked, line endings are made visible.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { .. } => f.write_str("<password>\\r"),
            other => f.write_str(&escape_line_endings(other.to_wire_string().as_bytes())),
        }
    }
}

/// Parse the hex digits of a sensor report.
pub fn parse_sensor_value(raw: &[u8]) -> Result<u32> {
    let invalid = || WiflyError::InvalidSensorValue {
        raw: String::from_utf8_lossy(raw).into_owned(),
    };
    if raw.len() != SENSOR_DIGITS {
        return Err(invalid());
    }
    let text = std::str::from_utf8(raw).map_err(|_| invalid())?;
    if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    u32::from_str_radix(text, 16).map_err(|_| invalid())
}

/// Render CR and LF visibly for log output.
pub fn escape_line_endings(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

// MIT License - Copyright (c) 2026 Peter Wright
// Pattern reader/writer over the module socket

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::constants::{COMMAND_PROMPT, READ_CHUNK, SENSOR_DIGITS};
use crate::error::{Result, WiflyError};
use crate::protocol::{escape_line_endings, parse_sensor_value, Command};
use crate::signal::OpenSignal;
use crate::transport::buffer::{PatternScan, ReceiveBuffer};

/// A connected module console.
///
/// Owns the stream and its receive buffer for the lifetime of one
/// connection. Every read is bounded by `read_timeout`, and every I/O call
/// fails with [`WiflyError::Closed`] as soon as the connection is closed
/// through `signal`. Dropping the link releases the socket.
pub struct PatternLink<S> {
    stream: S,
    buffer: ReceiveBuffer,
    read_timeout: Duration,
    signal: OpenSignal,
}

impl<S> PatternLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, read_timeout: Duration, signal: OpenSignal) -> Self {
        Self {
            stream,
            buffer: ReceiveBuffer::new(),
            read_timeout,
            signal,
        }
    }

    /// Bytes received but not consumed yet.
    pub fn buffered(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Write raw text to the module.
    pub async fn send(&mut self, data: &str) -> Result<()> {
        debug!("Sending {}", escape_line_endings(data.as_bytes()));
        self.write(data.as_bytes()).await
    }

    /// Send a command and wait for its reply pattern.
    pub async fn command(&mut self, command: &Command) -> Result<()> {
        debug!("Sending {}", command);
        self.write(command.to_wire_string().as_bytes()).await?;
        self.expect(&command.reply_pattern()).await
    }

    /// Wait until `pattern` appears, then discard everything up to and
    /// including it.
    pub async fn expect(&mut self, pattern: &str) -> Result<()> {
        debug!("Expecting {}", escape_line_endings(pattern.as_bytes()));
        let mut scan = PatternScan::new(pattern.as_bytes());
        loop {
            if let Some(end) = scan.find_in(&self.buffer) {
                self.buffer.consume(end);
                return Ok(());
            }
            self.read_chunk(pattern).await?;
        }
    }

    /// Query one sensor and return its raw reading.
    pub async fn read_sensor(&mut self, id: u8) -> Result<u32> {
        self.command(&Command::ShowSensor { id }).await?;
        while self.buffer.len() < SENSOR_DIGITS {
            self.read_chunk("sensor value").await?;
        }
        let value = parse_sensor_value(&self.buffer.as_bytes()[..SENSOR_DIGITS])?;
        // Swallow the prompt so the next command starts on a clean buffer.
        self.expect(COMMAND_PROMPT).await?;
        Ok(value)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        tokio::select! {
            result = self.stream.write_all(bytes) => Ok(result?),
            _ = self.signal.closed() => Err(WiflyError::Closed),
        }
    }

    /// One read from the socket into the buffer.
    async fn read_chunk(&mut self, waiting_for: &str) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let read = tokio::select! {
            result = timeout(self.read_timeout, self.stream.read(&mut chunk)) => result,
            _ = self.signal.closed() => return Err(WiflyError::Closed),
        };
        match read {
            Err(_) => Err(WiflyError::ReadTimeout {
                pattern: waiting_for.to_string(),
            }),
            Ok(Ok(0)) => Err(WiflyError::Eof {
                pattern: waiting_for.to_string(),
            }),
            Ok(Ok(n)) => {
                self.buffer.extend(&chunk[..n]);
                trace!("Input buffer = {}", escape_line_endings(self.buffer.as_bytes()));
                Ok(())
            }
            Ok(Err(e)) => Err(WiflyError::Io(e)),
        }
    }
}

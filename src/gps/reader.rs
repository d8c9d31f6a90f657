// src/gps/reader.rs
//! Serial framing: raw bytes in, sentences out, commands back

use crate::error::{GpsError, Result};
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    time::timeout,
};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::command::PmtkCommand;

/// Longest line accepted before the buffer is thrown away
pub const MAX_SENTENCE_LEN: usize = 128;

/// What a timed read produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    Sentence(String),
    /// No byte arrived within the idle window
    Idle,
    /// End of stream
    Closed,
}

/// Splits a byte stream into sentences.
///
/// Bytes before a `$` are skipped. A sentence ends at a `\r\n` pair; lone
/// `\n` bytes inside a sentence are dropped because the module emits
/// spurious newlines. A `$` in the middle of a line starts over.
///
/// Reads one byte at a time from a buffered reader and keeps partial lines
/// across calls, so `next_sentence` may be cancelled by a timeout without
/// losing data.
pub struct SentenceReader<R> {
    inner: BufReader<R>,
    line: Vec<u8>,
}

impl<R: AsyncRead + Unpin> SentenceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            line: Vec::with_capacity(MAX_SENTENCE_LEN),
        }
    }

    /// Next complete sentence, `None` at end of stream
    pub async fn next_sentence(&mut self) -> Result<Option<String>> {
        loop {
            let Some(byte) = self.read_byte().await? else {
                return Ok(None);
            };
            if let Some(sentence) = self.push(byte) {
                return Ok(Some(sentence));
            }
        }
    }

    /// Next sentence, giving up once no byte has arrived for `idle`.
    ///
    /// The idle timer restarts on every byte, so a sentence that trickles in
    /// slower than `idle` overall is still returned.
    pub async fn next_sentence_within(&mut self, idle: Duration) -> Result<ReadEvent> {
        loop {
            let byte = match timeout(idle, self.read_byte()).await {
                Err(_) => return Ok(ReadEvent::Idle),
                Ok(Ok(Some(byte))) => byte,
                Ok(Ok(None)) => return Ok(ReadEvent::Closed),
                Ok(Err(e)) => return Err(e),
            };
            if let Some(sentence) = self.push(byte) {
                return Ok(ReadEvent::Sentence(sentence));
            }
        }
    }

    async fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.inner.read_u8().await {
            Ok(byte) => Ok(Some(byte)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(GpsError::Io(e)),
        }
    }

    /// Feed one byte, returning a sentence when it completes one
    fn push(&mut self, byte: u8) -> Option<String> {
        match byte {
            b'$' => {
                if !self.line.is_empty() {
                    log::debug!("Discarding unterminated sentence ({} bytes)", self.line.len());
                }
                self.line.clear();
                self.line.push(byte);
            }
            _ if self.line.is_empty() => {}
            b'\n' if self.line.last() == Some(&b'\r') => {
                self.line.pop();
                let sentence = String::from_utf8_lossy(&self.line).trim().to_string();
                self.line.clear();
                return Some(sentence);
            }
            b'\n' => {}
            _ => {
                self.line.push(byte);
                if self.line.len() > MAX_SENTENCE_LEN {
                    log::debug!("Discarding overlong line");
                    self.line.clear();
                }
            }
        }
        None
    }
}

/// Write one command to the module
pub async fn send_command<W: AsyncWrite + Unpin>(writer: &mut W, command: &PmtkCommand) -> Result<()> {
    let wire = command.encode();
    log::debug!("Sending {}", wire.trim_end());
    writer.write_all(wire.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Open the GPS serial port
pub fn open_serial(port: &str, baudrate: u32) -> Result<SerialStream> {
    log::info!("Connecting to GPS on {} at {} baud...", port, baudrate);

    let serial = tokio_serial::new(port, baudrate)
        .timeout(Duration::from_millis(1000))
        .open_native_async()
        .map_err(|e| GpsError::Connection(format!("Failed to open serial port {}: {}", port, e)))?;

    log::info!("Connected successfully!");
    Ok(serial)
}

/// List available serial ports
pub fn list_serial_ports() -> Result<()> {
    let ports = tokio_serial::available_ports()?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {} - {:?}", port.port_name, port.port_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &[u8]) -> Vec<String> {
        let mut reader = SentenceReader::new(input);
        let mut sentences = Vec::new();
        while let Some(sentence) = reader.next_sentence().await.unwrap() {
            sentences.push(sentence);
        }
        sentences
    }

    #[tokio::test]
    async fn test_splits_sentences() {
        let input = b"$GPGGA,1*00\r\n$GPRMC,2*00\r\n";
        assert_eq!(collect(input).await, vec!["$GPGGA,1*00", "$GPRMC,2*00"]);
    }

    #[tokio::test]
    async fn test_skips_noise_before_start() {
        let input = b"\x00\xffgarbage,12*34\r\n$PMTK001,220,3*30\r\n";
        assert_eq!(collect(input).await, vec!["$PMTK001,220,3*30"]);
    }

    #[tokio::test]
    async fn test_drops_spurious_newlines() {
        let input = b"$GNRMC,09\n4530.000*00\r\n";
        assert_eq!(collect(input).await, vec!["$GNRMC,094530.000*00"]);
    }

    #[tokio::test]
    async fn test_restart_on_new_start_marker() {
        let input = b"$GNGGA,0945$GNRMC,1*00\r\n";
        assert_eq!(collect(input).await, vec!["$GNRMC,1*00"]);
    }

    #[tokio::test]
    async fn test_partial_sentence_at_eof() {
        let input = b"$GNRMC,1*00\r\n$GNGGA,unfinished";
        assert_eq!(collect(input).await, vec!["$GNRMC,1*00"]);
    }

    #[tokio::test]
    async fn test_overlong_line_discarded() {
        let mut input = b"$".to_vec();
        input.extend(std::iter::repeat(b'A').take(MAX_SENTENCE_LEN + 10));
        input.extend_from_slice(b"\r\n$GPRMC,2*00\r\n");
        assert_eq!(collect(&input).await, vec!["$GPRMC,2*00"]);
    }

    #[tokio::test]
    async fn test_idle_timer_restarts_per_byte() {
        let (client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            for &byte in b"$GPRMC,2*00\r\n".iter() {
                server.write_all(&[byte]).await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            server
        });

        let mut reader = SentenceReader::new(client);
        let event = reader.next_sentence_within(Duration::from_millis(30)).await.unwrap();
        assert_eq!(event, ReadEvent::Sentence("$GPRMC,2*00".to_string()));
        assert_eq!(
            reader.next_sentence_within(Duration::from_millis(30)).await.unwrap(),
            ReadEvent::Idle
        );

        drop(writer.await.unwrap());
        assert_eq!(
            reader.next_sentence_within(Duration::from_millis(30)).await.unwrap(),
            ReadEvent::Closed
        );
    }

    #[tokio::test]
    async fn test_send_command() {
        let mut out = Vec::new();
        send_command(&mut out, &PmtkCommand::ColdBoot).await.unwrap();
        assert_eq!(out, b"$PMTK103*30\r\n");
    }
}

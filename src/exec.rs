//! Line-oriented command execution over an async byte stream
//!
//! The bench instruments all speak newline-terminated ASCII over a serial line (or a
//! TCP serial bridge; this module does not care which). [`LineExec`] owns the stream
//! and a read buffer and offers two primitives: a fire-and-forget [`send`] and a
//! [`query`] which writes a command and returns the next reply line.
//!
//! # Cancel safety
//! `query` is not cancel safe: cancelling between the write and the read leaves the
//! reply of the cancelled command in flight, and it would be mistaken for the reply to
//! whatever is sent next. The sequencer only ever awaits these calls to completion.
//!
//! [`send`]: LineExec::send
//! [`query`]: LineExec::query

use std::{ fmt, io };
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use crate::instrument::InstrumentError;

pub struct LineExec<T>
{
    io_handle: T,
    read_buf: Vec<u8>,
}

impl <T> LineExec<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    pub fn with(io_handle: T) -> Self
    {
        Self {
            io_handle,
            read_buf: Vec::with_capacity(64),
        }
    }

    /// Serializes and writes a command with no reply expected
    pub async fn send(&mut self, cmd: impl fmt::Display) -> Result<(), io::Error>
    {
        let serialized = format!("{}\n", cmd);
        self.io_handle.write_all(serialized.as_bytes()).await
    }

    /// Writes a command and returns the next reply line, without its line terminator
    pub async fn query(&mut self, cmd: impl fmt::Display) -> Result<String, InstrumentError>
    {
        self.send(cmd).await?;
        let line_len = self.read_line().await?;
        let raw: Vec<u8> = self.read_buf.drain(..line_len).collect();
        let mut reply = String::from_utf8(raw)?;

        while reply.ends_with('\n') || reply.ends_with('\r') {
            reply.pop();
        }

        Ok(reply)
    }

    /// Returns the index of the first linefeed in the read buffer, if any, starting the
    /// scan at the suggested index
    fn find_line_ending(&self, start_hint: usize) -> Option<usize>
    {
        self.read_buf[start_hint..]
            .iter()
            .position(|byte| *byte == 0x0A)
            .map(|offset| start_hint + offset)
    }

    /// Reads until the buffer holds at least one complete line and returns its length
    /// including the terminating linefeed
    async fn read_line(&mut self) -> Result<usize, io::Error>
    {
        let mut scanned = 0;

        loop {
            if let Some(index) = self.find_line_ending(scanned) {
                return Ok(index + 1);
            }
            scanned = self.read_buf.len();

            let mut chunk = [0u8; 64];
            let bytes_read = self.io_handle.read(&mut chunk).await?;

            if bytes_read == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
            }
            self.read_buf.extend_from_slice(&chunk[..bytes_read]);
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::cmd::{ ChamberCmd, LoadCmd };
    use crate::units::Celsius;

    #[tokio::test]
    async fn send_appends_line_terminator()
    {
        let stream = tokio_test::io::Builder::new()
            .write(b"TEMP 25\n")
            .build();

        let mut exec = LineExec::with(stream);
        assert!(exec.send(ChamberCmd::SetTemperature(Celsius::new(25.0))).await.is_ok());
    }

    #[tokio::test]
    async fn query_strips_line_terminator()
    {
        let stream = tokio_test::io::Builder::new()
            .write(b"MEAS:POW?\n")
            .read(b"23.88\r\n")
            .build();

        let mut exec = LineExec::with(stream);
        let reply = exec.query(LoadCmd::MeasurePower).await.unwrap();
        assert_eq!(reply, "23.88");
    }

    #[tokio::test]
    async fn query_reassembles_split_reply()
    {
        let stream = tokio_test::io::Builder::new()
            .write(b"TEMP?\n")
            .read(b"-1")
            .read(b"0\n")
            .build();

        let mut exec = LineExec::with(stream);
        let reply = exec.query(ChamberCmd::GetTemperature).await.unwrap();
        assert_eq!(reply, "-10");
    }

    #[tokio::test]
    async fn query_consumes_one_line_per_reply()
    {
        let stream = tokio_test::io::Builder::new()
            .write(b"MEAS:CURR?\n")
            .read(b"3\n4.25\n")
            .write(b"MEAS:VOLT?\n")
            .build();

        let mut exec = LineExec::with(stream);
        assert_eq!(exec.query(LoadCmd::MeasureCurrent).await.unwrap(), "3");
        // second line was already buffered; no further read occurs
        assert_eq!(exec.query(LoadCmd::MeasureVoltage).await.unwrap(), "4.25");
    }

    #[tokio::test]
    async fn closed_stream_reports_eof()
    {
        let stream = tokio_test::io::Builder::new()
            .write(b"MEAS:POW?\n")
            .build();

        let mut exec = LineExec::with(stream);
        let err = exec.query(LoadCmd::MeasurePower).await.unwrap_err();
        match err {
            InstrumentError::Io(io_err) => assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected I/O error, got {:?}", other),
        }
    }
}

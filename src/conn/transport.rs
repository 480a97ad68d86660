//! A framed byte-stream wrapper over a TCP socket: a single `TcpStream`,
//! cloned for independent read/write handles.

use crate::error::{FourDError, FourDResult};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A framed connection to a single 4D server.
///
/// All I/O errors are treated as fatal to the session: the stream cannot be
/// resynchronized once a read is short or a write fails partway.
#[derive(Debug)]
pub(crate) struct Transport {
    reader: TcpStream,
    writer: TcpStream,
}

impl Transport {
    pub(crate) fn connect(host: &str, port: u16) -> FourDResult<Self> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| FourDError::operational(format!("cannot resolve {host}:{port}: {e}")))?
            .next()
            .ok_or_else(|| FourDError::operational(format!("no address found for {host}:{port}")))?;
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| FourDError::operational(format!("connect to {host}:{port} failed: {e}")))?;
        let writer = stream
            .try_clone()
            .map_err(|e| FourDError::operational(e.to_string()))?;
        Ok(Self {
            reader: stream,
            writer,
        })
    }

    /// Writes the whole buffer, or fails.
    pub(crate) fn send(&mut self, bytes: &[u8]) -> FourDResult<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Reads exactly `n` bytes, or fails.
    pub(crate) fn recv_exact(&mut self, n: usize) -> FourDResult<Vec<u8>> {
        let mut buf = vec![0_u8; n];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn recv_u8(&mut self) -> FourDResult<u8> {
        Ok(self.recv_exact(1)?[0])
    }

    /// Reads bytes one at a time until `\r\n\r\n` is seen, returning the
    /// bytes read including the terminator.
    ///
    /// Reading one byte at a time (rather than buffering ahead) is
    /// deliberate: a binary payload can follow the header block
    /// immediately, and over-reading into it would desynchronize the
    /// connection.
    pub(crate) fn recv_header(&mut self) -> FourDResult<Vec<u8>> {
        let mut buf = Vec::new();
        loop {
            let byte = self.recv_u8().map_err(|e| match e {
                FourDError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                    FourDError::operational("stream ended before header terminator")
                }
                other => other,
            })?;
            buf.push(byte);
            if buf.ends_with(HEADER_TERMINATOR) {
                return Ok(buf);
            }
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

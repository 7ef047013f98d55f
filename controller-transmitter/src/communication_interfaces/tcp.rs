use std::{
    io::{self, Read, Write},
    net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream},
};

use super::CommandLink;
use crate::{
    config::constants::{READ_BUDGET_PER_TICK, READ_BUFFER_SIZE},
    util::error::TransportError,
};

/// Non-blocking TCP server holding at most one phone. A new connection
/// replaces the current one.
pub struct TcpCommandServer {
    listener: TcpListener,
    client: Option<TcpStream>,
    /// Tail of a line the kernel only partly accepted.
    pending: Vec<u8>,
    read_buffer: Vec<u8>,
    read_budget: usize,
}

impl TcpCommandServer {
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))?;
        listener.set_nonblocking(true)?;
        let server = TcpCommandServer {
            listener,
            client: None,
            pending: Vec::new(),
            read_buffer: vec![0; READ_BUFFER_SIZE],
            read_budget: READ_BUDGET_PER_TICK,
        };
        log::info!("Listening on {}", server.local_addr()?);
        Ok(server)
    }

    /// Caps the bytes a single `read_available` call takes off the socket.
    pub fn with_read_budget(mut self, bytes: usize) -> Self {
        self.read_budget = bytes.max(1);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Takes the newest waiting connection, if any. Returns whether the
    /// client changed.
    pub fn accept_pending(&mut self) -> Result<bool, TransportError> {
        let mut accepted = false;
        loop {
            match self.listener.accept() {
                Ok((stream, address)) => {
                    stream.set_nonblocking(true)?;
                    if let Err(error) = stream.set_nodelay(true) {
                        log::debug!("set_nodelay failed: {}", error);
                    }
                    if self.client.is_some() {
                        log::warn!("New client {} replaces the current one", address);
                    } else {
                        log::info!("Client {} connected", address);
                    }
                    self.client = Some(stream);
                    self.pending.clear();
                    accepted = true;
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(accepted),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Hands the bytes already received to `on_bytes`, at most the read
    /// budget per call. The rest stays in the kernel for the next call. Ends
    /// with `Disconnected` once the peer is gone.
    pub fn read_available(
        &mut self,
        mut on_bytes: impl FnMut(&[u8]),
    ) -> Result<usize, TransportError> {
        let stream = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        let mut total = 0;
        while total < self.read_budget {
            let chunk = (self.read_budget - total).min(self.read_buffer.len());
            match stream.read(&mut self.read_buffer[..chunk]) {
                Ok(0) => {
                    self.disconnect();
                    return Err(TransportError::Disconnected);
                }
                Ok(count) => {
                    total += count;
                    on_bytes(&self.read_buffer[..count]);
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(total),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    log::warn!("Read failed: {}", error);
                    self.disconnect();
                    return Err(TransportError::Disconnected);
                }
            }
        }
        Ok(total)
    }

    pub fn disconnect(&mut self) {
        if let Some(stream) = self.client.take() {
            log::warn!("Client disconnected");
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        self.pending.clear();
    }

    fn write_some(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        let stream = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        loop {
            match stream.write(bytes) {
                Ok(count) => return Ok(count),
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(0),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    log::warn!("Write failed: {}", error);
                    self.disconnect();
                    return Err(TransportError::Disconnected);
                }
            }
        }
    }

    fn flush_pending(&mut self) -> Result<bool, TransportError> {
        if self.pending.is_empty() {
            return Ok(true);
        }
        let pending = std::mem::take(&mut self.pending);
        let written = self.write_some(&pending)?;
        self.pending = pending[written..].to_vec();
        Ok(self.pending.is_empty())
    }
}

impl CommandLink for TcpCommandServer {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        if !self.flush_pending()? {
            return Err(TransportError::WouldBlock);
        }
        let bytes = line.as_bytes();
        let written = self.write_some(bytes)?;
        if written == 0 && !bytes.is_empty() {
            return Err(TransportError::WouldBlock);
        }
        // The start of the line is on the wire, the rest has to follow it.
        self.pending.extend_from_slice(&bytes[written..]);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpStream,
        thread,
        time::{Duration, Instant},
    };

    use super::*;

    fn server() -> (TcpCommandServer, SocketAddr) {
        let server = TcpCommandServer::bind(0).unwrap();
        let port = server.local_addr().unwrap().port();
        (server, SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    fn accept_within(server: &mut TcpCommandServer) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if server.accept_pending().unwrap() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn sending_without_a_client_fails() {
        let (mut server, _) = server();
        assert!(!server.is_connected());
        assert!(matches!(
            server.send_line("heartbeat\n"),
            Err(TransportError::NotConnected)
        ));
        assert!(!server.accept_pending().unwrap());
    }

    #[test]
    fn lines_reach_the_client() {
        let (mut server, address) = server();
        let client = TcpStream::connect(address).unwrap();
        assert!(accept_within(&mut server));

        server.send_line("emergency_stop\n").unwrap();
        let mut reader = BufReader::new(client);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "emergency_stop\n");
    }

    #[test]
    fn received_bytes_are_delivered_and_close_is_detected() {
        let (mut server, address) = server();
        let mut client = TcpStream::connect(address).unwrap();
        assert!(accept_within(&mut server));

        client.write_all(&[0, 0, 0, 1, 0]).unwrap();
        drop(client);

        let mut received = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = loop {
            match server.read_available(|bytes| received.extend_from_slice(bytes)) {
                Ok(_) if Instant::now() < deadline => thread::sleep(Duration::from_millis(5)),
                other => break other,
            }
        };
        assert!(matches!(outcome, Err(TransportError::Disconnected)));
        assert_eq!(received, vec![0, 0, 0, 1, 0]);
        assert!(!server.is_connected());
    }

    #[test]
    fn reads_stop_at_the_budget() {
        const BUDGET: usize = 1000;
        const SENT: usize = 5 * BUDGET + 123;
        let (server, address) = server();
        let mut server = server.with_read_budget(BUDGET);
        let mut client = TcpStream::connect(address).unwrap();
        assert!(accept_within(&mut server));

        let writer = thread::spawn(move || {
            let payload: Vec<u8> = (0..SENT).map(|index| (index % 251) as u8).collect();
            client.write_all(&payload).unwrap();
            (client, payload)
        });

        let mut received = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while received.len() < SENT && Instant::now() < deadline {
            let count = server
                .read_available(|bytes| received.extend_from_slice(bytes))
                .unwrap();
            assert!(count <= BUDGET, "read {} bytes in one call", count);
            thread::sleep(Duration::from_millis(1));
        }
        let (_client, payload) = writer.join().unwrap();
        assert_eq!(received, payload);
    }
}

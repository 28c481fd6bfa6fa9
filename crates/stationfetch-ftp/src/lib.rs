//! Stationfetch FTP - FTP transport for the download engine
//!
//! Implements [`Connector`] and [`Session`] on top of `suppaftp`:
//! one control connection per file, password login, binary `RETR`.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use stationfetch_core::{Connector, Credentials, Session, TransportError};
use suppaftp::FtpStream;
use suppaftp::types::{FileType, FtpError};

/// Bound on TCP connect and on every control-channel read or write
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens FTP sessions.
#[derive(Debug, Clone)]
pub struct FtpConnector {
    timeout: Duration,
}

impl FtpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// TCP connect to the first reachable address, with timeouts already set
    /// so the greeting read that follows is bounded too.
    fn open_control(&self, credentials: &Credentials) -> Result<TcpStream, TransportError> {
        let mut last = None;
        for addr in (credentials.host.as_str(), credentials.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(socket) => {
                    socket.set_read_timeout(Some(self.timeout))?;
                    socket.set_write_timeout(Some(self.timeout))?;
                    return Ok(socket);
                }
                Err(e) => {
                    log::debug!("{addr}: {e}");
                    last = Some(e);
                }
            }
        }
        Err(TransportError::Io(last.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} resolved to no addresses", credentials.host),
            )
        })))
    }
}

impl Default for FtpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Connector for FtpConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, TransportError> {
        let socket = self.open_control(credentials)?;
        let mut stream = FtpStream::connect_with_stream(socket).map_err(from_ftp)?;

        stream
            .login(credentials.user.as_str(), credentials.password.as_str())
            .map_err(from_ftp)?;
        stream.transfer_type(FileType::Binary).map_err(from_ftp)?;
        log::debug!("logged in to {} as {}", credentials.address(), credentials.user);

        Ok(Box::new(FtpSession { stream }))
    }
}

/// An authenticated FTP control connection.
pub struct FtpSession {
    stream: FtpStream,
}

impl Session for FtpSession {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let sink = RefCell::new(sink);
        self.stream
            .retr(remote_path, |reader: &mut dyn Read| {
                let mut out = sink.borrow_mut();
                io::copy(reader, &mut **out).map_err(FtpError::ConnectionError)
            })
            .map_err(from_ftp)
    }

    fn close(mut self: Box<Self>) -> Result<(), TransportError> {
        self.stream.quit().map_err(from_ftp)
    }
}

fn from_ftp(err: FtpError) -> TransportError {
    match err {
        FtpError::ConnectionError(e) => TransportError::Io(e),
        FtpError::UnexpectedResponse(response) => {
            let code = response.status.code();
            let body = String::from_utf8_lossy(&response.body).trim().to_string();
            TransportError::Protocol {
                code: Some(code),
                message: if body.is_empty() {
                    format!("unexpected reply {code}")
                } else {
                    body
                },
            }
        }
        other => TransportError::Protocol {
            code: None,
            message: other.to_string(),
        },
    }
}

//! Remote file transfer seam.
//!
//! The engine only sees these traits; the FTP implementation lives in its
//! own crate and tests plug in an in-memory connector.

use std::io::Write;

use crate::error::TransportError;

/// Default control port
pub const DEFAULT_PORT: u16 = 21;

/// Login details for the remote server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            password: password.into(),
        }
    }

    /// `host:port` label for logs
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Opens authenticated sessions. Shared by every worker of a batch.
pub trait Connector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, TransportError>;
}

/// One authenticated session, used by a single worker for a single file.
pub trait Session {
    /// Stream the remote file into `sink`, returning the byte count.
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, TransportError>;

    /// Say goodbye to the server.
    fn close(self: Box<Self>) -> Result<(), TransportError>;
}

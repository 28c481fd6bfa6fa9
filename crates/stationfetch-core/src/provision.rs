//! Session acquisition with a bounded retry budget

use crate::error::{TaskError, TransportError};
use crate::retry::{Exhausted, RetryPolicy, retry};
use crate::transport::{Connector, Credentials, Session};

/// Opens sessions through a [`Connector`], retrying per [`RetryPolicy`].
///
/// Retry delays block only the calling worker thread.
#[derive(Clone, Copy)]
pub struct Provisioner<'a> {
    connector: &'a dyn Connector,
    policy: RetryPolicy,
}

impl std::fmt::Debug for Provisioner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<'a> Provisioner<'a> {
    pub fn new(connector: &'a dyn Connector, policy: RetryPolicy) -> Self {
        Self { connector, policy }
    }

    /// Open a session, or report the last error once retries run out.
    pub fn acquire(&self, credentials: &Credentials) -> Result<Box<dyn Session>, TaskError> {
        let label = credentials.address();
        retry(&self.policy, &label, |_| self.connector.connect(credentials)).map_err(
            |Exhausted { attempts, last }: Exhausted<TransportError>| TaskError::Connect {
                attempts,
                last,
            },
        )
    }
}

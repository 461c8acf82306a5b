//! Outbound mail dispatch through the configured provider.

mod config;
mod dispatcher;

pub use config::{HttpProvider, ProviderConfig, Security, SmtpProvider};
pub use dispatcher::{Dispatched, Dispatcher, Outbound, SendError};

/// The service layer's seam to the dispatcher, so tests can substitute a
/// recording transport.
pub trait Dispatch {
    /// Sends one outbound message, returning the provider message id.
    fn send(
        &self,
        outbound: &Outbound,
    ) -> impl Future<Output = Result<Dispatched, SendError>> + Send;

    /// The configured sender address.
    fn from_address(&self) -> &str;
}

impl Dispatch for Dispatcher {
    async fn send(&self, outbound: &Outbound) -> Result<Dispatched, SendError> {
        Self::send(self, outbound).await
    }

    fn from_address(&self) -> &str {
        Self::from_address(self)
    }
}

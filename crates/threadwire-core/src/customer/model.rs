//! Customer model.

use serde::Serialize;

use crate::thread::CustomerId;

/// The slice of a CRM customer this engine needs.
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    /// Unique identifier.
    pub id: CustomerId,
    /// Display name.
    pub name: String,
    /// Email address mail is sent to.
    pub email: String,
}

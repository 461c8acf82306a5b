//! Customer projection.
//!
//! Customers are owned by the wider CRM; this engine keeps only the
//! minimal projection it needs to validate send targets and resolve
//! recipient addresses.

mod model;
mod repository;

pub use model::Customer;
pub use repository::CustomerRepository;

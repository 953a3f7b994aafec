//! Business logic between the route handlers and the backend client.

pub mod checkout;
pub mod marketplace;

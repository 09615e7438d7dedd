//! Base types and error handling.
//!
//! - [`StoreError`](storeerror::StoreError): errors shared by every module
//! - [`Clock`](clock::Clock): time source used for expiry checks

pub mod clock;
pub mod context;
pub mod storeerror;

#[cfg(test)]
mod tests;

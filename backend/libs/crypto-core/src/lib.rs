//! Shared cryptographic helpers.
//!
//! Only token validation lives here; tokens are issued by the identity
//! service, never by the services that consume this crate.

pub mod jwt;

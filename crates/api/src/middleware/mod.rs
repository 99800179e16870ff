//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller from a JWT Bearer token.
//! - [`rbac::RequireAuth`] -- any authenticated caller.
//! - [`rbac::RequireRegistrar`] -- requires the `registrar` role.

pub mod auth;
pub mod rbac;

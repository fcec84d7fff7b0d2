//! Token models: redacted secrets, cached identity tokens, issued registry credentials, and the
//! expiry reconciliation between them.

pub mod credential;
pub mod expiry;
pub mod secret;
pub mod token;

pub use credential::*;
pub use expiry::*;
pub use secret::*;
pub use token::*;

//! Vendor HTTP plumbing shared by all vehicle integrations

pub mod request;
pub mod signer;

pub use request::HttpHelper;
pub use signer::{Credentials, RequestSigner, TokenSource};

//! Interactive vendor authentication
//!
//! Authorization Code grant with PKCE, plus an injectable hook for vendors
//! that demand a second factor during login.

pub mod device;
pub mod identity;
pub mod session;
pub mod token;

pub use device::{Device, DeviceHandler, MfaUnsupported, PasscodeDevice, PromptDevice};
pub use identity::{Identity, TokenHandle};
pub use session::{AuthPhase, AuthSession, OAuthConfig};
pub use token::TokenSet;

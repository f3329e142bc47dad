//! Google sign-in for Late: OAuth provider, loopback redirect listener,
//! and on-disk token storage.

pub mod callback;
pub mod flow;
pub mod google;
pub mod storage;

pub use callback::NoCallbackPort;
pub use flow::{authenticate, fresh_token, mark_expired, SignIn};
pub use google::{GoogleOAuth2Provider, GoogleTokenResponse, GoogleUserInfo, REQUESTED_SCOPES};
pub use storage::{SecureStorage, TokenSet, GOOGLE_SERVICE};

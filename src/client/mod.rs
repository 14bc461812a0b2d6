//! Dashboard-side library: typed calls to the backend functions, the QR and
//! phone login flows, settings with a local fallback, and the signed-in
//! identity.

pub mod error;
pub mod functions;
pub mod identity;
pub mod local_store;
pub mod phone_login;
pub mod qr_login;
pub mod settings;

pub use error::{ClientError, ClientResult};
pub use functions::{HttpFunctions, RemoteFunctions, SharedFunctions};
pub use identity::{IdentityStore, StoredUser};
pub use local_store::LocalStore;
pub use phone_login::{PhoneLoginError, PhoneLoginFlow, PhoneLoginState};
pub use qr_login::{QrLoginSession, QrLoginState, QrPollPolicy};
pub use settings::{CachedCredentials, SettingsClient};

#[cfg(test)]
pub(crate) mod testing;

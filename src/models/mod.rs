pub mod common;
pub mod settings;
pub mod telegram;
pub mod user;

pub use common::*;
pub use settings::*;
pub use telegram::*;
pub use user::*;

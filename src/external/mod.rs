pub mod google;
pub mod telegram;

pub use google::*;
pub use telegram::{
    ApiCredentials, MessageSource, ResolvedPeer, SharedGateway, SharedMessageSource,
    TelegramError, TelegramGateway, build_telegram,
};

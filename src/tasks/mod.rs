//! Background scheduled tasks for the application.
//!
//! Call `spawn_all` once during startup to launch them.

use crate::services::TelegramLoginService;
use std::time::Duration;

/// How often expired QR login tokens and phone codes are swept.
pub const LOGIN_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Spawn all background tasks. Detaches them via `tokio::spawn`; does not block.
pub fn spawn_all(login_service: TelegramLoginService) {
    // QR tokens and phone codes are useless once past `expires_at`; drop them.
    tokio::spawn(async move {
        loop {
            match login_service.purge_expired_qr_tokens().await {
                Ok(n) if n > 0 => log::info!("Purged expired QR login tokens: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to purge expired QR login tokens: {e:?}"),
            }
            let n = login_service.purge_expired_phone_logins().await;
            if n > 0 {
                log::info!("Purged abandoned phone logins: {n}");
            }
            tokio::time::sleep(LOGIN_PURGE_INTERVAL).await;
        }
    });
}

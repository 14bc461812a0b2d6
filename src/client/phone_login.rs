use super::error::ClientError;
use super::functions::SharedFunctions;
use crate::models::VerifyCodeRequest;
use crate::utils::{validate_login_code, validate_phone};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneLoginState {
    Phone,
    Code {
        phone: String,
        phone_code_hash: String,
    },
    Connected {
        session_id: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneLoginError {
    /// Rejected locally; nothing was sent.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid code, check it and try again")]
    CodeInvalid,

    #[error("The code expired, request a new one")]
    CodeExpired,

    #[error("Two-factor password required; this account cannot sign in here")]
    PasswordRequired,

    #[error("No code has been requested")]
    NoCodeRequested,

    #[error("{0}")]
    Other(String),
}

impl PhoneLoginError {
    /// Maps backend error text, which carries the Telegram error identifier.
    pub fn from_upstream(message: &str) -> Self {
        if message.contains("PHONE_CODE_INVALID") {
            PhoneLoginError::CodeInvalid
        } else if message.contains("PHONE_CODE_EXPIRED") {
            PhoneLoginError::CodeExpired
        } else if message.contains("SESSION_PASSWORD_NEEDED") {
            PhoneLoginError::PasswordRequired
        } else {
            PhoneLoginError::Other(message.to_string())
        }
    }
}

impl From<ClientError> for PhoneLoginError {
    fn from(e: ClientError) -> Self {
        PhoneLoginError::from_upstream(&e.to_string())
    }
}

/// Two-step phone login: request a code, then submit it.
pub struct PhoneLoginFlow {
    functions: SharedFunctions,
    user_id: i64,
    state: PhoneLoginState,
}

impl PhoneLoginFlow {
    pub fn new(functions: SharedFunctions, user_id: i64) -> Self {
        Self {
            functions,
            user_id,
            state: PhoneLoginState::Phone,
        }
    }

    pub fn state(&self) -> &PhoneLoginState {
        &self.state
    }

    /// Asks the backend to send a login code. Moves to `Code` on success; stays
    /// at `Phone` otherwise.
    pub async fn request_code(&mut self, phone: &str) -> Result<(), PhoneLoginError> {
        let phone = phone.trim();
        validate_phone(phone).map_err(|e| PhoneLoginError::InvalidInput(e.user_message()))?;

        let resp = self.functions.send_code(self.user_id, phone).await?;
        self.state = PhoneLoginState::Code {
            phone: phone.to_string(),
            phone_code_hash: resp.phone_code_hash,
        };
        Ok(())
    }

    /// Submits the received code. An expired code sends the flow back to
    /// `Phone`; other failures keep it at `Code` for another attempt.
    pub async fn verify(&mut self, code: &str) -> Result<String, PhoneLoginError> {
        let PhoneLoginState::Code {
            phone,
            phone_code_hash,
        } = &self.state
        else {
            return Err(PhoneLoginError::NoCodeRequested);
        };
        let code = code.trim();
        validate_login_code(code).map_err(|e| PhoneLoginError::InvalidInput(e.user_message()))?;

        let request = VerifyCodeRequest {
            phone: phone.clone(),
            code: code.to_string(),
            phone_code_hash: phone_code_hash.clone(),
            user_id: self.user_id,
        };

        match self.functions.verify_code(&request).await {
            Ok(resp) => {
                self.state = PhoneLoginState::Connected {
                    session_id: resp.session_id.clone(),
                };
                Ok(resp.session_id)
            }
            Err(e) => {
                let err = PhoneLoginError::from(e);
                if err == PhoneLoginError::CodeExpired {
                    self.state = PhoneLoginState::Phone;
                }
                Err(err)
            }
        }
    }

    /// Leaves the code step, forgetting the requested code.
    pub fn back(&mut self) {
        if matches!(self.state, PhoneLoginState::Code { .. }) {
            self.state = PhoneLoginState::Phone;
        }
    }
}

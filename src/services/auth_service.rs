use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::external::{GoogleIdentity, GoogleIdentityService};
use crate::models::*;
use crate::utils::JwtService;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
    google: GoogleIdentityService,
}

impl AuthService {
    pub fn new(
        pool: DatabaseConnection,
        jwt_service: JwtService,
        google: GoogleIdentityService,
    ) -> Self {
        Self {
            pool,
            jwt_service,
            google,
        }
    }

    pub async fn login_with_google(&self, request: GoogleLoginRequest) -> AppResult<AuthResponse> {
        let identity = self.google.verify_id_token(request.id_token.trim()).await?;
        self.login_with_identity(identity).await
    }

    /// Creates or refreshes the user row for a verified identity and issues tokens.
    pub async fn login_with_identity(&self, identity: GoogleIdentity) -> AppResult<AuthResponse> {
        let user = self.upsert_user(identity).await?;
        log::info!("User {} signed in with Google", user.id);

        let access_token = self.jwt_service.generate_access_token(user.id, &user.email)?;
        let refresh_token = self.jwt_service.generate_refresh_token(user.id, &user.email)?;

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

        let user = self.get_user(user_id).await?;
        let access_token = self.jwt_service.generate_access_token(user.id, &user.email)?;

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token: refresh_token.to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn upsert_user(&self, identity: GoogleIdentity) -> AppResult<users::Model> {
        let now = Utc::now();
        let existing = users::Entity::find()
            .filter(users::Column::GoogleSub.eq(identity.sub.as_str()))
            .one(&self.pool)
            .await?;

        let user = match existing {
            Some(user) => {
                let mut model = user.into_active_model();
                model.email = Set(identity.email);
                model.name = Set(identity.name);
                model.picture_url = Set(identity.picture);
                model.updated_at = Set(Some(now));
                model.update(&self.pool).await?
            }
            None => {
                users::ActiveModel {
                    google_sub: Set(identity.sub),
                    email: Set(identity.email),
                    name: Set(identity.name),
                    picture_url: Set(identity.picture),
                    created_at: Set(Some(now)),
                    updated_at: Set(Some(now)),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?
            }
        };

        Ok(user)
    }
}

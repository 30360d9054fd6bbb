use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest,
    dev::Payload,
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Accepts only access tokens with a known role.
    pub fn from_claims(claims: Claims) -> Result<Self, &'static str> {
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            role,
        })
    }

    pub fn require_manager(&self) -> actix_web::Result<()> {
        if self.role == Role::Manager {
            Ok(())
        } else {
            Err(ErrorForbidden("Manager only"))
        }
    }
}

/// Token from an `Authorization: Bearer ...` header.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected routes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match bearer_token(req) {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ErrorInternalServerError("Config missing"))),
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        ready(AuthUser::from_claims(claims).map_err(ErrorUnauthorized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: u8, token_type: TokenType) -> Claims {
        Claims {
            user_id: 3,
            sub: "boss@x.io".into(),
            role,
            exp: usize::MAX,
            jti: "jti".into(),
            token_type,
        }
    }

    #[test]
    fn only_access_tokens_authenticate() {
        let user = AuthUser::from_claims(claims(2, TokenType::Access)).unwrap();
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.email, "boss@x.io");

        assert!(AuthUser::from_claims(claims(2, TokenType::Refresh)).is_err());
        assert!(AuthUser::from_claims(claims(9, TokenType::Access)).is_err());
    }

    #[test]
    fn manager_guard() {
        let manager = AuthUser::from_claims(claims(2, TokenType::Access)).unwrap();
        let employee = AuthUser::from_claims(claims(1, TokenType::Access)).unwrap();

        assert!(manager.require_manager().is_ok());
        let err = employee.require_manager().unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::FORBIDDEN
        );
    }
}

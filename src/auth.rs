use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, Error, FromRequest, HttpRequest, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};

use crate::models::{Id, User};

/// Cookie carrying the session JWT for browser clients.
pub const AUTH_COOKIE: &str = "yatube_token";
pub const LOGIN_URL: &str = "/auth/login/";
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT_SECRET not set")]
    MissingSecret,
    #[error("token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub uid: Id,
    pub exp: usize,
    pub roles: Vec<Role>,
}

fn secret() -> Result<String, AuthError> {
    env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)
}

/// Validate a JWT and return its claims.
fn decode_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = secret()?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Extractor yielding validated `Claims` from a bearer header or the session cookie.
///
/// Handlers that only *prefer* a logged-in user take `Option<Auth>`.
pub struct Auth(pub Claims);

impl Auth {
    pub fn user_id(&self) -> Id { self.0.uid }

    pub fn is_admin(&self) -> bool {
        self.0.roles.iter().any(|r| matches!(r, Role::Admin))
    }
}

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let token = match BearerAuth::from_request(req, pl).into_inner() {
            Ok(bearer) => Some(bearer.token().to_string()),
            Err(_) => req.cookie(AUTH_COOKIE).map(|c| c.value().to_string()),
        };
        let Some(token) = token else {
            return ready(Err(actix_web::error::ErrorUnauthorized("Authorization required")));
        };
        match decode_jwt(&token) {
            Ok(claims) => ready(Ok(Auth(claims))),
            Err(_) => ready(Err(actix_web::error::ErrorUnauthorized("Invalid JWT"))),
        }
    }
}

/// Helper macro for role-guarding handlers.
#[macro_export]
macro_rules! require_role {
    ($auth:expr, $role:pat) => {
        if !$auth.0.roles.iter().any(|r| matches!(r, $role)) {
            return Err($crate::error::ApiError::Forbidden.into());
        }
    };
}

pub fn roles_for(user: &User) -> Vec<Role> {
    if user.is_admin { vec![Role::User, Role::Admin] } else { vec![Role::User] }
}

/// Create a JWT for a user id / username pair.
pub fn create_jwt(user_id: Id, username: &str, roles: Vec<Role>) -> Result<String, AuthError> {
    let secret = secret()?;
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;
    let claims = Claims { sub: username.to_string(), uid: user_id, exp: expiration, roles };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?)
}

pub fn token_for(user: &User) -> Result<String, AuthError> {
    create_jwt(user.id, &user.username, roles_for(user))
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    let mut c = session_cookie("");
    c.make_removal();
    c
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Only same-site absolute paths are honoured as post-login targets.
///
/// Browsers read `/\host` as `//host`, so a backslash anywhere or a control
/// character sends the visitor home instead.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n)
            if n.starts_with('/')
                && !n.starts_with("//")
                && !n.contains('\\')
                && !n.chars().any(char::is_control) =>
        {
            n
        }
        _ => "/",
    }
}

/// 302 to the login page remembering where the visitor was headed.
pub fn login_redirect(path: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header(("Location", format!("{LOGIN_URL}?next={}", urlencoding::encode(path))))
        .finish()
}

//! Form parsing and validation.
//!
//! Validation never touches storage except to resolve the chosen group; a
//! failed form comes back as [`FormErrors`] keyed by field name, with
//! `__all__` reserved for errors that belong to no single field.

use std::collections::BTreeMap;

use actix_multipart::Multipart;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures_util::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::{Group, Id, NewGroup, Post};
use crate::repo::{Repo, RepoError};

pub type FormErrors = BTreeMap<String, Vec<String>>;

pub const NON_FIELD: &str = "__all__";
pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

pub const IMAGE_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB
pub const ALLOWED_IMAGE_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp", "image/bmp"];

const USERNAME_MAX: usize = 150;
const PASSWORD_MIN: usize = 8;
const GROUP_TITLE_MAX: usize = 200;
const SLUG_MAX: usize = 50;

fn add_error(errors: &mut FormErrors, field: &str, msg: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(msg.into());
}

/// Trimmed value, or `None` when missing or blank.
fn cleaned(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// Post form as submitted, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawPostForm {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image: Option<UploadedFile>,
}

#[derive(Deserialize)]
struct UrlEncodedPostForm {
    text: Option<String>,
    group: Option<String>,
}

impl RawPostForm {
    /// Reads either a `multipart/form-data` or an url-encoded body.
    pub async fn from_request(req: &HttpRequest, payload: web::Payload) -> Result<Self, ApiError> {
        if req.content_type().starts_with("multipart/form-data") {
            Self::from_multipart(Multipart::new(req.headers(), payload)).await
        } else {
            let form = web::Form::<UrlEncodedPostForm>::from_request(req, &mut payload.into_inner())
                .await
                .map_err(|e| {
                    tracing::debug!("rejected post form body: {e}");
                    ApiError::BadRequest
                })?
                .into_inner();
            Ok(Self { text: form.text, group: form.group, image: None })
        }
    }

    async fn from_multipart(mut payload: Multipart) -> Result<Self, ApiError> {
        let mut form = RawPostForm::default();
        while let Some(mut field) = payload.try_next().await.map_err(|e| {
            tracing::debug!("multipart error: {e}");
            ApiError::BadRequest
        })? {
            let disposition = field.content_disposition();
            let Some(name) = disposition.get_name().map(String::from) else { continue };
            let filename = disposition.get_filename().map(String::from);
            let mut bytes: Vec<u8> = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(|e| {
                tracing::debug!("multipart read error: {e}");
                ApiError::BadRequest
            })? {
                if bytes.len() + chunk.len() > IMAGE_SIZE_LIMIT {
                    return Err(ApiError::BadRequest);
                }
                bytes.extend_from_slice(&chunk);
            }
            match name.as_str() {
                "text" => form.text = Some(String::from_utf8_lossy(&bytes).into_owned()),
                "group" => form.group = Some(String::from_utf8_lossy(&bytes).into_owned()),
                // browsers send an empty part when no file was picked
                "image" if !bytes.is_empty() => form.image = Some(UploadedFile { filename, bytes }),
                _ => {}
            }
        }
        Ok(form)
    }
}

#[derive(Debug, Clone)]
pub struct ValidImage {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub extension: String,
}

impl ValidImage {
    /// Content-addressed storage key.
    pub fn key(&self) -> String {
        let hash = Sha256::digest(&self.bytes);
        format!("posts/{:x}.{}", hash, self.extension)
    }
}

#[derive(Debug, Clone)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<Id>,
    pub image: Option<ValidImage>,
}

pub fn validate_image(file: &UploadedFile) -> Option<ValidImage> {
    let kind = infer::get(&file.bytes)?;
    if !ALLOWED_IMAGE_MIME.contains(&kind.mime_type()) {
        return None;
    }
    Some(ValidImage {
        bytes: file.bytes.clone(),
        mime: kind.mime_type().to_string(),
        extension: kind.extension().to_string(),
    })
}

impl RawPostForm {
    pub async fn validate(&self, repo: &dyn Repo) -> Result<Result<CleanPost, FormErrors>, RepoError> {
        let mut errors = FormErrors::new();

        let text = cleaned(self.text.as_deref());
        if text.is_none() {
            add_error(&mut errors, "text", REQUIRED);
        }

        let mut group_id = None;
        if let Some(raw) = cleaned(self.group.as_deref()) {
            match raw.parse::<Id>() {
                Ok(id) => match repo.get_group(id).await {
                    Ok(g) => group_id = Some(g.id),
                    Err(RepoError::NotFound) => add_error(&mut errors, "group", INVALID_CHOICE),
                    Err(e) => return Err(e),
                },
                Err(_) => add_error(&mut errors, "group", INVALID_CHOICE),
            }
        }

        let mut image = None;
        if let Some(file) = &self.image {
            match validate_image(file) {
                Some(valid) => image = Some(valid),
                None => add_error(&mut errors, "image", INVALID_IMAGE),
            }
        }

        Ok(match text {
            Some(text) if errors.is_empty() => Ok(CleanPost { text, group_id, image }),
            _ => Err(errors),
        })
    }

    /// Values echoed back into a re-rendered form.
    pub fn bound(&self, errors: FormErrors) -> PostFormView {
        PostFormView {
            text: self.text.clone().unwrap_or_default(),
            group: cleaned(self.group.as_deref()),
            image: None,
            errors,
        }
    }
}

/// The post form as a page shows it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PostFormView {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
    #[schema(value_type = Object)]
    pub errors: FormErrors,
}

impl PostFormView {
    pub fn for_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|g| g.to_string()),
            image: post.image.clone(),
            errors: FormErrors::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        cleaned(Some(&self.text)).ok_or_else(|| {
            let mut errors = FormErrors::new();
            add_error(&mut errors, "text", REQUIRED);
            errors
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CommentFormView {
    pub text: String,
    #[schema(value_type = Object)]
    pub errors: FormErrors,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub fn validate_username(username: &str, errors: &mut FormErrors) {
    if username.is_empty() {
        add_error(errors, "username", REQUIRED);
    } else if username.chars().count() > USERNAME_MAX {
        add_error(errors, "username", format!("Ensure this value has at most {USERNAME_MAX} characters."));
    } else if !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c)) {
        add_error(
            errors,
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

impl SignupForm {
    /// Returns the trimmed username when the form is acceptable.
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let username = self.username.trim().to_string();
        validate_username(&username, &mut errors);
        if self.password.is_empty() {
            add_error(&mut errors, "password", REQUIRED);
        } else if self.password.chars().count() < PASSWORD_MIN {
            add_error(
                &mut errors,
                "password",
                format!("This password is too short. It must contain at least {PASSWORD_MIN} characters."),
            );
        }
        if errors.is_empty() { Ok(username) } else { Err(errors) }
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= SLUG_MAX
        && slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Normalises an administrative group insert.
pub fn validate_group(new: NewGroup) -> Result<NewGroup, FormErrors> {
    let mut errors = FormErrors::new();
    let title = new.title.trim().to_string();
    if title.is_empty() {
        add_error(&mut errors, "title", REQUIRED);
    } else if title.chars().count() > GROUP_TITLE_MAX {
        add_error(&mut errors, "title", format!("Ensure this value has at most {GROUP_TITLE_MAX} characters."));
    }
    let slug = new.slug.trim().to_string();
    if !is_valid_slug(&slug) {
        add_error(
            &mut errors,
            "slug",
            "Enter a valid \u{201c}slug\u{201d} consisting of letters, numbers, underscores or hyphens.",
        );
    }
    if errors.is_empty() {
        Ok(NewGroup { title, slug, description: new.description.trim().to_string() })
    } else {
        Err(errors)
    }
}

/// Choices offered by the group select box.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupChoice {
    pub id: Id,
    pub title: String,
}

impl From<&Group> for GroupChoice {
    fn from(g: &Group) -> Self {
        GroupChoice { id: g.id, title: g.title.clone() }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Account row. Serialisable only for the in-memory snapshot; handlers expose
/// [`Author`] instead so the password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub password_hash: String, // argon2 PHC string
    pub is_admin: bool,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Public projection of a user used in page views.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Author {
    pub id: Id,
    pub username: String,
}

impl From<&User> for Author {
    fn from(u: &User) -> Self {
        Author { id: u.id, username: u.username.clone() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Group {
    pub id: Id,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Post {
    pub id: Id,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: Id,
    pub author: String,             // author username (joined)
    pub group_id: Option<Id>,
    pub group_slug: Option<String>, // joined, None once the group is gone
    pub image: Option<String>,      // media key, e.g. "posts/<sha256>.gif"
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPost {
    pub author_id: Id,
    pub text: String,
    pub group_id: Option<Id>,
    pub image: Option<String>,
}

/// Fields an author may change on an existing post.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostUpdate {
    pub text: String,
    pub group_id: Option<Id>,
    /// `None` keeps the current image.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub id: Id,
    pub post_id: Id,
    pub author_id: Id,
    pub author: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub post_id: Id,
    pub author_id: Id,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Follow {
    pub id: Id,
    pub user_id: Id,   // follower
    pub author_id: Id, // followed author
}

/// Which slice of the post table a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(Id),
    Author(Id),
    /// Posts by every author the given user follows.
    FollowedBy(Id),
}

#![allow(dead_code, unused_macros)]

use std::sync::Arc;

use tempfile::TempDir;
use yatube::auth::token_for;
use yatube::models::{Group, Id, NewGroup, NewPost, NewUser, Post, User};
use yatube::repo::inmem::InMemRepo;
use yatube::repo::{GroupRepo, PostRepo, UserRepo};
use yatube::storage::FsImageStore;
use yatube::{AppState, Settings};

pub const JWT_SECRET: &str = "test-secret-must-be-32-bytes-long!!";

/// 2x1 GIF, the smallest picture `infer` recognises.
pub const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff!\xf9\x04\x00\x00\x00\x00\x00,\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0c\n\x00;";

/// App state over a fresh in-memory repo and a throwaway media root.
pub struct Fixture {
    pub repo: InMemRepo,
    pub state: AppState,
    pub media: TempDir,
}

pub fn fixture() -> Fixture {
    fixture_with(Settings::default())
}

pub fn fixture_with(settings: Settings) -> Fixture {
    std::env::set_var("JWT_SECRET", JWT_SECRET);
    let media = tempfile::tempdir().unwrap();
    let repo = InMemRepo::new();
    let state = AppState::new(
        Arc::new(repo.clone()),
        Arc::new(FsImageStore::new(media.path())),
        settings,
    );
    Fixture { repo, state, media }
}

/// Builds the service under test from a [`Fixture`] state.
macro_rules! app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.clone()))
                .configure(yatube::config),
        )
        .await
    };
}

/// Creates an account and returns it with a bearer token.
pub async fn user(repo: &InMemRepo, username: &str) -> (User, String) {
    let user = repo
        .create_user(NewUser { username: username.into(), password_hash: "!".into(), is_admin: false })
        .await
        .unwrap();
    let token = token_for(&user).unwrap();
    (user, token)
}

pub async fn admin(repo: &InMemRepo, username: &str) -> (User, String) {
    let user = repo
        .create_user(NewUser { username: username.into(), password_hash: "!".into(), is_admin: true })
        .await
        .unwrap();
    let token = token_for(&user).unwrap();
    (user, token)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub async fn group(repo: &InMemRepo, slug: &str) -> Group {
    repo.create_group(NewGroup { title: format!("Group {slug}"), slug: slug.into(), description: String::new() })
        .await
        .unwrap()
}

pub async fn post(repo: &InMemRepo, author_id: Id, text: &str, group_id: Option<Id>) -> Post {
    repo.create_post(NewPost { author_id, text: text.into(), group_id, image: None })
        .await
        .unwrap()
}

pub const BOUNDARY: &str = "----yatubeboundary";

/// `multipart/form-data` body with plain fields and an optional file part.
pub fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

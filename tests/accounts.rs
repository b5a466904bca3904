#![cfg(feature = "inmem-store")]

#[macro_use]
mod common;

use actix_web::test;
use serde_json::{json, Value};
use serial_test::serial;

use common::{admin, bearer, fixture, fixture_with, group, post, user};
use yatube::auth::AUTH_COOKIE;
use yatube::models::{NewComment, PostFilter};
use yatube::repo::{CommentRepo, FollowRepo, GroupRepo, PostRepo, RepoError, UserRepo};
use yatube::Settings;

#[actix_web::test]
#[serial]
async fn signup_sets_a_session_cookie_that_authenticates() {
    let fx = fixture();
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([("username", "newbie"), ("password", "long-enough-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.headers().get("location").unwrap(), "/");
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == AUTH_COOKIE)
        .expect("session cookie")
        .into_owned();
    assert!(cookie.http_only().unwrap_or(false));

    let req = test::TestRequest::get().uri("/create/").cookie(cookie).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let stored = fx.repo.get_user_by_username("newbie").await.unwrap();
    assert!(!stored.is_admin);
    assert_ne!(stored.password_hash, "long-enough-pass");
}

#[actix_web::test]
#[serial]
async fn signup_rejects_bad_and_taken_usernames() {
    let fx = fixture();
    user(&fx.repo, "taken").await;
    let app = app!(fx.state);

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([("username", "taken"), ("password", "long-enough-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let page: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert!(page["errors"].get("username").is_some());

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([("username", "no spaces"), ("password", "short")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let page: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert!(page["errors"].get("username").is_some());
    assert!(page["errors"].get("password").is_some());
}

#[actix_web::test]
#[serial]
async fn login_honours_next_and_logout_clears_the_cookie() {
    let fx = fixture();
    let app = app!(fx.state);
    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([("username", "leo"), ("password", "war-and-peace")])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([("username", "leo"), ("password", "wrong-password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let page: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert!(page["errors"].get("__all__").is_some());
    assert_eq!(page["username"], "leo");

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([("username", "leo"), ("password", "war-and-peace"), ("next", "/create/")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.headers().get("location").unwrap(), "/create/");
    assert!(resp.response().cookies().any(|c| c.name() == AUTH_COOKIE && !c.value().is_empty()));

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([("username", "leo"), ("password", "war-and-peace"), ("next", "https://evil.example/")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get("location").unwrap(), "/");

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([("username", "leo"), ("password", "war-and-peace"), ("next", "/\\evil.example")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get("location").unwrap(), "/");

    let req = test::TestRequest::get().uri("/auth/login/?next=/follow/").to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["next"], "/follow/");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/auth/logout/").to_request()).await;
    assert_eq!(resp.status(), 302);
    let removal = resp.response().cookies().find(|c| c.name() == AUTH_COOKIE).unwrap().into_owned();
    assert!(removal.value().is_empty());
}

#[actix_web::test]
#[serial]
async fn bootstrap_usernames_sign_up_as_admins() {
    let fx = fixture_with(Settings { bootstrap_admins: vec!["boss".into()], ..Settings::default() });
    let app = app!(fx.state);
    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([("username", "boss"), ("password", "long-enough-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = resp.response().cookies().find(|c| c.name() == AUTH_COOKIE).unwrap().into_owned();
    assert!(fx.repo.get_user_by_username("boss").await.unwrap().is_admin);

    let req = test::TestRequest::post()
        .uri("/admin/groups/")
        .cookie(cookie)
        .set_json(json!({"title": "Cats", "slug": "cats"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
}

#[actix_web::test]
#[serial]
async fn admin_group_management() {
    let fx = fixture();
    let (_, admin_token) = admin(&fx.repo, "root").await;
    let (_, user_token) = user(&fx.repo, "leo").await;
    let app = app!(fx.state);
    let create = |token: Option<&str>, body: Value| {
        let mut req = test::TestRequest::post().uri("/admin/groups/").set_json(body);
        if let Some(token) = token {
            req = req.insert_header(bearer(token));
        }
        req.to_request()
    };

    let resp = test::call_service(&app, create(None, json!({"title": "Cats", "slug": "cats"}))).await;
    assert_eq!(resp.status(), 401);
    let resp = test::call_service(&app, create(Some(user_token.as_str()), json!({"title": "Cats", "slug": "cats"}))).await;
    assert_eq!(resp.status(), 403);

    let resp = test::call_service(
        &app,
        create(Some(admin_token.as_str()), json!({"title": "Cats", "slug": "cats", "description": "meow"})),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let created: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(created["slug"], "cats");
    assert_eq!(created["description"], "meow");

    let resp = test::call_service(&app, create(Some(admin_token.as_str()), json!({"title": "Again", "slug": "cats"}))).await;
    assert_eq!(resp.status(), 409);
    let resp = test::call_service(&app, create(Some(admin_token.as_str()), json!({"title": "", "slug": "bad slug"}))).await;
    assert_eq!(resp.status(), 400);

    assert_eq!(fx.repo.list_groups().await.unwrap().len(), 1);
}

#[actix_web::test]
#[serial]
async fn deleting_a_group_keeps_its_posts() {
    let fx = fixture();
    let (_, admin_token) = admin(&fx.repo, "root").await;
    let (leo, _) = user(&fx.repo, "leo").await;
    let cats = group(&fx.repo, "cats").await;
    let kept = post(&fx.repo, leo.id, "about cats", Some(cats.id)).await;
    let app = app!(fx.state);

    let req = test::TestRequest::delete()
        .uri("/admin/groups/cats/")
        .insert_header(bearer(&admin_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let orphan = fx.repo.get_post(kept.id).await.unwrap();
    assert_eq!(orphan.group_id, None);
    assert_eq!(orphan.group_slug, None);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/group/cats/").to_request()).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
#[serial]
async fn deleting_a_user_cascades_and_voids_their_token() {
    let fx = fixture();
    let (_, admin_token) = admin(&fx.repo, "root").await;
    let (leo, leo_token) = user(&fx.repo, "leo").await;
    let (anna, _) = user(&fx.repo, "anna").await;
    let leos = post(&fx.repo, leo.id, "leo writes", None).await;
    let annas = post(&fx.repo, anna.id, "anna writes", None).await;
    fx.repo
        .create_comment(NewComment { post_id: annas.id, author_id: leo.id, text: "hi anna".into() })
        .await
        .unwrap();
    fx.repo.create_follow(anna.id, leo.id).await.unwrap();
    let app = app!(fx.state);

    let req = test::TestRequest::delete()
        .uri("/admin/users/leo/")
        .insert_header(bearer(&admin_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    assert!(matches!(fx.repo.get_post(leos.id).await, Err(RepoError::NotFound)));
    assert!(fx.repo.list_comments(annas.id).await.unwrap().is_empty());
    assert!(!fx.repo.follow_exists(anna.id, leo.id).await.unwrap());
    assert_eq!(fx.repo.count_posts(PostFilter::All).await.unwrap(), 1);

    let req = test::TestRequest::get().uri("/create/").insert_header(bearer(&leo_token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 302);

    let req = test::TestRequest::delete()
        .uri("/admin/users/leo/")
        .insert_header(bearer(&admin_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
#[serial]
async fn deleting_a_post_takes_its_comments() {
    let fx = fixture();
    let (_, admin_token) = admin(&fx.repo, "root").await;
    let (leo, leo_token) = user(&fx.repo, "leo").await;
    let target = post(&fx.repo, leo.id, "doomed", None).await;
    fx.repo
        .create_comment(NewComment { post_id: target.id, author_id: leo.id, text: "self reply".into() })
        .await
        .unwrap();
    let app = app!(fx.state);

    let uri = format!("/admin/posts/{}/", target.id);
    let req = test::TestRequest::delete().uri(&uri).insert_header(bearer(&leo_token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::delete().uri(&uri).insert_header(bearer(&admin_token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);
    assert!(fx.repo.list_comments(target.id).await.unwrap().is_empty());
    let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/posts/{}/", target.id)).to_request()).await;
    assert_eq!(resp.status(), 404);
}

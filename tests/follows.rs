#![cfg(feature = "inmem-store")]

#[macro_use]
mod common;

use actix_web::test;
use serde_json::Value;
use serial_test::serial;

use common::{bearer, fixture, post, user};
use yatube::repo::FollowRepo;

fn texts(page: &Value) -> Vec<&str> {
    page["page_obj"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["text"].as_str().unwrap())
        .collect()
}

#[actix_web::test]
#[serial]
async fn follow_then_unfollow_drives_the_feed() {
    let fx = fixture();
    let (reader, token) = user(&fx.repo, "reader").await;
    let (writer, _) = user(&fx.repo, "writer").await;
    post(&fx.repo, writer.id, "from writer", None).await;
    let app = app!(fx.state);

    let feed = || test::TestRequest::get().uri("/follow/").insert_header(bearer(&token)).to_request();
    let page: Value = test::call_and_read_body_json(&app, feed()).await;
    assert!(texts(&page).is_empty());

    let req = test::TestRequest::get()
        .uri("/profile/writer/follow/")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.headers().get("location").unwrap(), "/follow/");
    assert!(fx.repo.follow_exists(reader.id, writer.id).await.unwrap());

    let page: Value = test::call_and_read_body_json(&app, feed()).await;
    assert_eq!(texts(&page), vec!["from writer"]);

    let req = test::TestRequest::get()
        .uri("/profile/writer/")
        .insert_header(bearer(&token))
        .to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["following"], true);

    let req = test::TestRequest::get()
        .uri("/profile/writer/unfollow/")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert!(!fx.repo.follow_exists(reader.id, writer.id).await.unwrap());

    let page: Value = test::call_and_read_body_json(&app, feed()).await;
    assert!(texts(&page).is_empty());
}

#[actix_web::test]
#[serial]
async fn new_post_reaches_followers_only() {
    let fx = fixture();
    let (_, follower) = user(&fx.repo, "follower").await;
    let (_, stranger) = user(&fx.repo, "stranger").await;
    let (writer, _) = user(&fx.repo, "writer").await;
    let app = app!(fx.state);

    let req = test::TestRequest::get()
        .uri("/profile/writer/follow/")
        .insert_header(bearer(&follower))
        .to_request();
    test::call_service(&app, req).await;
    post(&fx.repo, writer.id, "fresh", None).await;

    let req = test::TestRequest::get().uri("/follow/").insert_header(bearer(&follower)).to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(texts(&page), vec!["fresh"]);

    let req = test::TestRequest::get().uri("/follow/").insert_header(bearer(&stranger)).to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert!(texts(&page).is_empty());
}

#[actix_web::test]
#[serial]
async fn self_and_repeated_follows_are_no_ops() {
    let fx = fixture();
    let (reader, token) = user(&fx.repo, "reader").await;
    let (writer, _) = user(&fx.repo, "writer").await;
    let app = app!(fx.state);

    let req = test::TestRequest::get()
        .uri("/profile/reader/follow/")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 302);
    assert!(!fx.repo.follow_exists(reader.id, reader.id).await.unwrap());

    for _ in 0..3 {
        let req = test::TestRequest::get()
            .uri("/profile/writer/follow/")
            .insert_header(bearer(&token))
            .to_request();
        test::call_service(&app, req).await;
    }
    // a single unfollow clears it, so only one row was ever written
    assert_eq!(fx.repo.delete_follows(reader.id, writer.id).await.unwrap(), 1);
}

#[actix_web::test]
#[serial]
async fn follow_pages_require_login_and_a_real_author() {
    let fx = fixture();
    let (_, token) = user(&fx.repo, "reader").await;
    let app = app!(fx.state);

    for uri in ["/follow/", "/profile/reader/follow/", "/profile/reader/unfollow/"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), 302, "{uri}");
        let location = resp.headers().get("location").unwrap().to_str().unwrap();
        assert!(location.starts_with("/auth/login/?next="), "{location}");
    }

    let req = test::TestRequest::get()
        .uri("/profile/ghost/follow/")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

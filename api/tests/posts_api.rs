//! Post endpoints: ownership, listing and pagination over HTTP.

mod common;

use std::collections::HashSet;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn owner_flow_and_foreign_edit() {
    let app = spawn_app().await;

    let registered = app.register("A", "a@x.com").await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert!(registered.body.get("password").is_none());

    let duplicate = app.register("A", "a@x.com").await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.error_code(), "EMAIL_IN_USE");

    let wrong = app.login("a@x.com", "wrong-password").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.error_code(), "INVALID_CREDENTIALS");

    let login = app.login("a@x.com", common::PASSWORD).await;
    let token = login.session_token().unwrap();

    let created = app.create_post(&token, "T", "B").await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["authorId"], registered.body["id"]);
    assert_eq!(created.body["title"], "T");
    let post_id = created.body["id"].as_str().unwrap().to_owned();

    let (_, other) = app.signed_in("B", "b@x.com").await;
    let hijack = app
        .request(
            Method::PATCH,
            &format!("/api/posts/{post_id}"),
            Some(&other),
            Some(json!({ "title": "mine now" })),
        )
        .await;
    assert_eq!(hijack.status, StatusCode::FORBIDDEN);
    assert_eq!(hijack.error_code(), "FORBIDDEN");

    let delete = app
        .request(Method::DELETE, &format!("/api/posts/{post_id}"), Some(&other), None)
        .await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    let unchanged = app
        .request(Method::GET, &format!("/api/posts/{post_id}"), None, None)
        .await;
    assert_eq!(unchanged.status, StatusCode::OK);
    assert_eq!(unchanged.body["title"], "T");
}

#[tokio::test]
async fn creating_requires_a_session_and_valid_fields() {
    let app = spawn_app().await;

    let anonymous = app
        .request(
            Method::POST,
            "/api/posts",
            None,
            Some(json!({ "title": "T", "body": "B" })),
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.error_code(), "UNAUTHENTICATED");

    let (_, token) = app.signed_in("A", "a@x.com").await;
    let invalid = app.create_post(&token, "   ", "").await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.error_code(), "VALIDATION_ERROR");
    let fields = &invalid.body["error"]["details"]["fields"];
    assert!(fields["title"].is_string());
    assert!(fields["body"].is_string());
}

#[tokio::test]
async fn owner_updates_and_deletes() {
    let app = spawn_app().await;
    let (_, token) = app.signed_in("A", "a@x.com").await;
    let created = app.create_post(&token, "T", "B").await;
    let uri = format!("/api/posts/{}", created.body["id"].as_str().unwrap());

    let updated = app
        .request(Method::PATCH, &uri, Some(&token), Some(json!({ "body": "B2" })))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["title"], "T");
    assert_eq!(updated.body["body"], "B2");
    assert_eq!(updated.body["createdAt"], created.body["createdAt"]);
    assert_ne!(updated.body["updatedAt"], created.body["updatedAt"]);

    let deleted = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn editing_requires_a_session() {
    let app = spawn_app().await;
    let (_, token) = app.signed_in("A", "a@x.com").await;
    let created = app.create_post(&token, "T", "B").await;
    let uri = format!("/api/posts/{}", created.body["id"].as_str().unwrap());

    let patch = app
        .request(Method::PATCH, &uri, None, Some(json!({ "title": "T2" })))
        .await;
    assert_eq!(patch.status, StatusCode::UNAUTHORIZED);
    assert_eq!(patch.error_code(), "UNAUTHENTICATED");

    let delete = app.request(Method::DELETE, &uri, None, None).await;
    assert_eq!(delete.status, StatusCode::UNAUTHORIZED);
    assert_eq!(delete.error_code(), "UNAUTHENTICATED");

    let unchanged = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(unchanged.status, StatusCode::OK);
    assert_eq!(unchanged.body["title"], "T");
}

#[tokio::test]
async fn invalid_patch_leaves_post_untouched() {
    let app = spawn_app().await;
    let (_, token) = app.signed_in("A", "a@x.com").await;
    let created = app.create_post(&token, "T", "B").await;
    let uri = format!("/api/posts/{}", created.body["id"].as_str().unwrap());

    let blank = app
        .request(
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({ "title": "  ", "body": "B2" })),
        )
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.error_code(), "VALIDATION_ERROR");
    assert!(blank.body["error"]["details"]["fields"]["title"].is_string());

    let oversized = app
        .request(
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({ "body": "x".repeat(50_001) })),
        )
        .await;
    assert_eq!(oversized.status, StatusCode::BAD_REQUEST);
    assert!(oversized.body["error"]["details"]["fields"]["body"].is_string());

    let current = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(current.body, created.body);
}

#[tokio::test]
async fn missing_post_is_not_found_even_for_strangers() {
    let app = spawn_app().await;
    let (_, token) = app.signed_in("A", "a@x.com").await;

    let patch = app
        .request(
            Method::PATCH,
            "/api/posts/does-not-exist",
            Some(&token),
            Some(json!({ "title": "T" })),
        )
        .await;
    assert_eq!(patch.status, StatusCode::NOT_FOUND);

    let delete = app
        .request(Method::DELETE, "/api/posts/does-not-exist", Some(&token), None)
        .await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pages_chain_without_gaps_or_repeats() {
    let app = spawn_app().await;
    let (_, token) = app.signed_in("A", "a@x.com").await;

    let mut expected = HashSet::new();
    for i in 0..5 {
        let created = app.create_post(&token, &format!("T{i}"), "B").await;
        expected.insert(created.body["id"].as_str().unwrap().to_owned());
    }

    let mut seen = Vec::new();
    let mut uri = "/api/posts?limit=2".to_owned();
    let mut pages = 0;
    loop {
        let page = app.request(Method::GET, &uri, None, None).await;
        assert_eq!(page.status, StatusCode::OK);
        let items = page.body["items"].as_array().unwrap();
        assert!(items.len() <= 2);
        seen.extend(items.iter().map(|p| p["id"].as_str().unwrap().to_owned()));
        pages += 1;

        match page.body["nextCursor"].as_str() {
            Some(cursor) => uri = format!("/api/posts?limit=2&cursor={cursor}"),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 5);
    assert_eq!(seen.into_iter().collect::<HashSet<_>>(), expected);
}

#[tokio::test]
async fn newest_post_comes_first() {
    let app = spawn_app().await;
    let (_, token) = app.signed_in("A", "a@x.com").await;
    app.create_post(&token, "older", "B").await;
    app.create_post(&token, "newer", "B").await;

    let page = app.request(Method::GET, "/api/posts", None, None).await;
    assert_eq!(page.body["items"][0]["title"], "newer");
    assert_eq!(page.body["items"][1]["title"], "older");
    assert!(page.body["nextCursor"].is_null());
}

#[tokio::test]
async fn listing_filters_by_author_and_mine() {
    let app = spawn_app().await;
    let (a_id, a_token) = app.signed_in("A", "a@x.com").await;
    let (b_id, b_token) = app.signed_in("B", "b@x.com").await;
    app.create_post(&a_token, "from a", "B").await;
    app.create_post(&b_token, "from b", "B").await;
    app.create_post(&b_token, "from b again", "B").await;

    let by_a = app
        .request(Method::GET, &format!("/api/posts?author={a_id}"), None, None)
        .await;
    let items = by_a.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["authorId"], a_id.as_str());

    let mine = app
        .request(Method::GET, "/api/posts?mine=true", Some(&b_token), None)
        .await;
    let items = mine.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|p| p["authorId"] == b_id.as_str()));

    let conflicting = app
        .request(
            Method::GET,
            &format!("/api/posts?mine=true&author={a_id}"),
            Some(&b_token),
            None,
        )
        .await;
    assert_eq!(conflicting.status, StatusCode::BAD_REQUEST);
    assert_eq!(conflicting.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn mine_without_session_is_unauthenticated() {
    let app = spawn_app().await;
    let response = app
        .request(Method::GET, "/api/posts?mine=true", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "UNAUTHENTICATED");
}

#[tokio::test]
async fn bad_listing_parameters_are_rejected() {
    let app = spawn_app().await;

    for uri in [
        "/api/posts?limit=0",
        "/api/posts?limit=101",
        "/api/posts?limit=abc",
        "/api/posts?cursor=%25%25%25",
        "/api/posts?mine=maybe",
    ] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(response.error_code(), "VALIDATION_ERROR", "{uri}");
    }
}

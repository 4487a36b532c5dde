// Follows, profiles and profile updates over HTTP

mod common;

use axum::http::{Method, StatusCode};
use common::{Part, TestApp, PNG_BYTES};

#[tokio::test]
async fn test_follow_and_unfollow() {
    let app = TestApp::new();
    let (_, alice) = app.register("alice").await;
    let (bob_id, _) = app.register("bob").await;
    let uri = format!("/users/{}/follow", bob_id);

    let response = app.post_empty(&uri, &alice).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["following"], true);

    let response = app.post_empty(&uri, &alice).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.count("follows"), 1);

    let response = app.get(&format!("/users/{}", bob_id), Some(&alice)).await;
    assert_eq!(response.body["is_following"], true);
    assert_eq!(response.body["followers_count"], 1);

    let response = app.delete(&uri, &alice).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["following"], false);

    let response = app.delete(&uri, &alice).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.count("follows"), 0);
}

#[tokio::test]
async fn test_follow_edge_cases() {
    let app = TestApp::new();
    let (alice_id, alice) = app.register("alice").await;

    let response = app.post_empty(&format!("/users/{}/follow", alice_id), &alice).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.post_empty("/users/999/follow", &alice).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.delete("/users/999/follow", &alice).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.count("follows"), 0);
}

#[tokio::test]
async fn test_profile_counters() {
    let app = TestApp::new();
    let (alice_id, alice) = app.register("alice").await;
    let (bob_id, bob) = app.register("bob").await;
    let (carol_id, carol) = app.register("carol").await;

    for caption in ["one", "two", "three"] {
        app.create_post(&alice, caption).await;
    }
    app.post_empty(&format!("/users/{}/follow", alice_id), &bob).await;
    app.post_empty(&format!("/users/{}/follow", alice_id), &carol).await;
    app.post_empty(&format!("/users/{}/follow", carol_id), &alice).await;

    let response = app.get(&format!("/users/{}", alice_id), Some(&bob)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["post_count"], 3);
    assert_eq!(response.body["followers_count"], 2);
    assert_eq!(response.body["following_count"], 1);
    assert_eq!(response.body["is_following"], true);
    assert!(response.body.get("email").is_none());
    assert!(response.body.get("password_hash").is_none());

    let response = app.get(&format!("/users/{}/followers", alice_id), Some(&bob)).await;
    let followers = response.body.as_array().unwrap();
    assert_eq!(followers.len(), 2);
    assert_eq!(followers[0]["id"], carol_id);
    assert_eq!(followers[1]["id"], bob_id);

    let response = app.get(&format!("/users/{}/following", alice_id), Some(&bob)).await;
    assert_eq!(response.body[0]["username"], "carol");

    let response = app.get(&format!("/users/{}/posts", alice_id), Some(&bob)).await;
    assert_eq!(response.body.as_array().unwrap().len(), 3);
    assert_eq!(response.body[0]["caption"], "three");

    let response = app.get(&format!("/users/{}/posts", bob_id), Some(&bob)).await;
    assert!(response.body.as_array().unwrap().is_empty());

    assert_eq!(app.get("/users/999", Some(&bob)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/users/999/posts", Some(&bob)).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_profile() {
    let app = TestApp::new();
    let (_, alice) = app.register("alice").await;

    let response = app
        .multipart(Method::PUT, "/users/profile", &alice, &[Part::Text("bio", "  hello  ")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["bio"], "hello");
    assert!(response.body["profile_picture"].is_null());

    let response = app
        .multipart(
            Method::PUT,
            "/users/profile",
            &alice,
            &[Part::File("profile_picture", "me.webp", PNG_BYTES)],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["bio"], "hello");
    let first_picture = response.body["profile_picture"].as_str().unwrap().to_string();
    assert!(first_picture.starts_with("/uploads/"));
    assert_eq!(app.uploaded_files().len(), 1);

    let response = app
        .multipart(
            Method::PUT,
            "/users/profile",
            &alice,
            &[Part::File("profile_picture", "me2.gif", PNG_BYTES)],
        )
        .await;
    let second_picture = response.body["profile_picture"].as_str().unwrap().to_string();
    assert_ne!(first_picture, second_picture);

    // The replaced picture is gone from disk
    let files = app.uploaded_files();
    assert_eq!(files.len(), 1);
    assert!(second_picture.ends_with(&files[0]));
}

#[tokio::test]
async fn test_update_profile_rejects_empty_and_bad_files() {
    let app = TestApp::new();
    let (_, alice) = app.register("alice").await;

    let response = app.multipart(Method::PUT, "/users/profile", &alice, &[]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .multipart(
            Method::PUT,
            "/users/profile",
            &alice,
            &[Part::File("profile_picture", "me.exe", b"MZ")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.uploaded_files().is_empty());
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::authentication::{issue_token_pair, test_settings};
use crate::db::memory::tests::{seed_user, seed_video};
use crate::db::{CommentRepo, LikeRepo, MemoryStore, PlaylistRepo, PageRequest, SortOrder, TweetRepo, UserRepo, VideoRepo, VideoSortField};
use crate::media::fake::RecordingGateway;
use crate::media::AssetKind;
use crate::models::{LikeTarget, User, VideoChanges, VideoFilter};
use crate::{create_app, InnerState};

const BOUNDARY: &str = "vidtube-test-boundary";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    assets: Arc<RecordingGateway>,
}

fn setup() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let assets = Arc::new(RecordingGateway::default());
    let state = InnerState {
        store: store.clone(),
        assets: assets.clone(),
        auth: Arc::new(test_settings()),
        default_page_limit: 10,
    };
    TestApp {
        router: create_app(state, 10 * 1024 * 1024),
        store,
        assets,
    }
}

fn token_for(user: &User) -> String {
    issue_token_pair(user, &test_settings()).unwrap().access_token
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        json!(null)
    } else {
        serde_json::from_slice(&bytes).unwrap_or(json!(null))
    };
    (status, json)
}

async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let body = match body {
        Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
        None => Body::empty(),
    };
    send(router, builder.body(body).unwrap()).await
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, contents) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(contents);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn call_multipart(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    send(router, builder.body(Body::from(multipart_body(parts))).unwrap()).await
}

fn all_videos() -> PageRequest<VideoSortField> {
    PageRequest::new(1, 100, VideoSortField::CreatedAt, SortOrder::Desc)
}

// ── Auth ──

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = setup();
    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/v1/tweets",
        None,
        Some(json!({ "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorKind"], "unauthenticated");
    assert_eq!(body["success"], false);

    let (status, _) = call(&app.router, Method::GET, "/api/v1/users/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_logout_round() {
    let app = setup();
    let register = [
        Part::Text("fullName", "Alice Liddell"),
        Part::Text("email", "alice@example.com"),
        Part::Text("username", "Alice"),
        Part::Text("password", "wonderland"),
        Part::File("avatar", "avatar.png", b"png-bytes"),
    ];

    let (status, body) =
        call_multipart(&app.router, Method::POST, "/api/v1/users/register", None, &register).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["avatar"], "https://media.test/image-1");
    assert_eq!(body["data"]["coverImage"], "");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) =
        call_multipart(&app.router, Method::POST, "/api/v1/users/register", None, &register).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User with email or username already exists");

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/v1/users/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wonderland" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access_token = body["data"]["accessToken"].as_str().unwrap().to_string();
    assert!(body["data"]["refreshToken"].is_string());
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");

    let user_id = body["data"]["user"]["id"].as_str().unwrap().parse().unwrap();
    let stored = app.store.find_user(user_id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_some());

    let (status, _) = call(
        &app.router,
        Method::POST,
        "/api/v1/users/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/v1/users/logout",
        Some(&access_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User logged out");
    let stored = app.store.find_user(user_id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn registration_without_avatar_is_rejected() {
    let app = setup();
    let (status, body) = call_multipart(
        &app.router,
        Method::POST,
        "/api/v1/users/register",
        None,
        &[
            Part::Text("fullName", "Bob"),
            Part::Text("email", "bob@example.com"),
            Part::Text("username", "bob"),
            Part::Text("password", "secret"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Avatar file is required");
    assert!(app.assets.uploads.lock().unwrap().is_empty());
}

// ── Videos ──

#[tokio::test]
async fn publishing_uploads_both_assets() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;

    let (status, body) = call_multipart(
        &app.router,
        Method::POST,
        "/api/v1/videos",
        Some(&token_for(&alice)),
        &[
            Part::Text("title", "Intro"),
            Part::Text("description", "first upload"),
            Part::File("videoFile", "intro.mp4", b"mp4-bytes"),
            Part::File("thumbnail", "intro.png", b"png-bytes"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["duration"], 42.0);
    assert_eq!(body["data"]["isPublished"], true);
    assert_eq!(body["data"]["videoFile"]["publicId"], "video-1");
    assert_eq!(body["data"]["thumbnail"]["publicId"], "image-2");
    assert_eq!(body["data"]["ownerId"], alice.id.to_string());
}

#[tokio::test]
async fn failed_thumbnail_upload_removes_the_video_asset() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    app.assets.fail_uploads_of(AssetKind::Image);

    let (status, _) = call_multipart(
        &app.router,
        Method::POST,
        "/api/v1/videos",
        Some(&token_for(&alice)),
        &[
            Part::Text("title", "Intro"),
            Part::Text("description", "first upload"),
            Part::File("videoFile", "intro.mp4", b"mp4-bytes"),
            Part::File("thumbnail", "intro.png", b"png-bytes"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(app.assets.deleted_ids(), vec!["video-1".to_string()]);

    let (_, total) = app
        .store
        .list_videos(&VideoFilter::default(), &all_videos())
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn public_listing_paginates_by_title() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    for title in ["e", "c", "a", "d", "b"] {
        seed_video(&app.store, &alice, title).await;
    }

    let (status, body) = call(
        &app.router,
        Method::GET,
        "/api/v1/videos?page=2&limit=2&sortBy=title&sortType=asc",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["c", "d"]);
    assert_eq!(body["pagination"]["currentPage"], 2);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["pagination"]["remainingPages"], 1);

    let (status, body) = call(
        &app.router,
        Method::GET,
        "/api/v1/videos?sortBy=owner",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorKind"], "invalid_argument");
}

#[tokio::test]
async fn unpublished_videos_are_visible_to_their_owner_only() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let bob = seed_user(&app.store, "bob").await;
    let video = seed_video(&app.store, &alice, "draft").await;
    let uri = format!("/api/v1/videos/{}", video.id);

    let (status, body) = call(
        &app.router,
        Method::PATCH,
        &format!("/api/v1/videos/toggle/publish/{}", video.id),
        Some(&token_for(&alice)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPublished"], false);

    let (status, _) = call(&app.router, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app.router, Method::GET, &uri, Some(&token_for(&bob)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) =
        call(&app.router, Method::GET, &uri, Some(&token_for(&alice)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["views"], 1);

    let (_, listed) = call(&app.router, Method::GET, "/api/v1/videos", None, None).await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn drafts_cannot_be_reached_through_related_routes() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let bob = seed_user(&app.store, "bob").await;
    let video = seed_video(&app.store, &alice, "draft").await;
    let comment = app
        .store
        .insert_comment(video.id, alice.id, "first".to_string())
        .await
        .unwrap();
    app.store
        .update_video(
            video.id,
            VideoChanges {
                is_published: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let playlist = app
        .store
        .insert_playlist(bob.id, "Later".to_string(), "watch later".to_string())
        .await
        .unwrap();
    let bob_token = token_for(&bob);
    let comments_uri = format!("/api/v1/comments/{}", video.id);

    let attempts = [
        (Method::POST, format!("/api/v1/likes/toggle/v/{}", video.id), None),
        (Method::POST, format!("/api/v1/likes/toggle/c/{}", comment.id), None),
        (Method::POST, comments_uri.clone(), Some(json!({ "content": "found it" }))),
        (Method::GET, comments_uri.clone(), None),
        (
            Method::PATCH,
            format!("/api/v1/playlists/add/{}/{}", video.id, playlist.id),
            None,
        ),
    ];
    for (method, uri, body) in attempts {
        let (status, _) = call(&app.router, method.clone(), &uri, Some(&bob_token), body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
    }
    let (status, _) = call(&app.router, Method::GET, &comments_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.store.liked_videos(bob.id).await.unwrap().is_empty());
    assert!(app.store.playlist_videos(playlist.id).await.unwrap().is_empty());

    let alice_token = token_for(&alice);
    let (status, _) = call(
        &app.router,
        Method::POST,
        &comments_uri,
        Some(&alice_token),
        Some(json!({ "content": "note to self" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app.router, Method::GET, &comments_uri, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn only_the_owner_can_delete_a_video() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let bob = seed_user(&app.store, "bob").await;
    let video = seed_video(&app.store, &alice, "clip").await;
    let uri = format!("/api/v1/videos/{}", video.id);

    let (status, body) =
        call(&app.router, Method::DELETE, &uri, Some(&token_for(&bob)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorKind"], "forbidden");
    assert!(app.store.find_video(video.id).await.unwrap().is_some());
    assert!(app.assets.deleted_ids().is_empty());

    let (status, _) =
        call(&app.router, Method::DELETE, &uri, Some(&token_for(&alice)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store.find_video(video.id).await.unwrap().is_none());
    assert_eq!(
        app.assets.deleted_ids(),
        vec!["video-clip".to_string(), "thumb-clip".to_string()]
    );

    let (status, _) =
        call(&app.router, Method::DELETE, &uri, Some(&token_for(&alice)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn replacing_a_thumbnail_drops_the_old_one() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let video = seed_video(&app.store, &alice, "clip").await;

    let (status, body) = call_multipart(
        &app.router,
        Method::PATCH,
        &format!("/api/v1/videos/{}", video.id),
        Some(&token_for(&alice)),
        &[
            Part::Text("title", "Renamed"),
            Part::File("thumbnail", "new.png", b"png-bytes"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Renamed");
    assert_eq!(body["data"]["description"], "about clip");
    assert_eq!(body["data"]["thumbnail"]["publicId"], "image-1");
    assert_eq!(app.assets.deleted_ids(), vec!["thumb-clip".to_string()]);

    let (status, _) = call_multipart(
        &app.router,
        Method::PATCH,
        &format!("/api/v1/videos/{}", video.id),
        Some(&token_for(&alice)),
        &[Part::Text("title", "   ")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Tweets and comments ──

#[tokio::test]
async fn foreign_tweets_cannot_be_edited() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let bob = seed_user(&app.store, "bob").await;
    let tweet = app
        .store
        .insert_tweet(alice.id, "original".to_string())
        .await
        .unwrap();

    let (status, _) = call(
        &app.router,
        Method::PATCH,
        &format!("/api/v1/tweets/{}", tweet.id),
        Some(&token_for(&bob)),
        Some(json!({ "content": "hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let stored = app.store.find_tweet(tweet.id).await.unwrap().unwrap();
    assert_eq!(stored.content, "original");

    let (status, body) = call(
        &app.router,
        Method::GET,
        &format!("/api/v1/tweets/user/{}", alice.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["content"], "original");
    assert_eq!(body["data"][0]["owner"]["username"], "alice");

    let (status, _) = call(
        &app.router,
        Method::GET,
        &format!("/api/v1/tweets/user/{}", uuid::Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_need_an_existing_video() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let video = seed_video(&app.store, &alice, "clip").await;
    let token = token_for(&alice);

    let (status, _) = call(
        &app.router,
        Method::POST,
        &format!("/api/v1/comments/{}", uuid::Uuid::new_v4()),
        Some(&token),
        Some(json!({ "content": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app.router,
        Method::POST,
        &format!("/api/v1/comments/{}", video.id),
        Some(&token),
        Some(json!({ "content": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app.router,
        Method::GET,
        &format!("/api/v1/comments/{}", video.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["content"], "hello");
    assert_eq!(body["data"][0]["owner"]["fullName"], "alice Full");
    assert_eq!(body["pagination"]["totalPages"], 1);
}

// ── Likes, subscriptions, playlists ──

#[tokio::test]
async fn liking_twice_leaves_no_like() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let bob = seed_user(&app.store, "bob").await;
    let video = seed_video(&app.store, &alice, "clip").await;
    let uri = format!("/api/v1/likes/toggle/v/{}", video.id);
    let token = token_for(&bob);

    let (status, body) = call(&app.router, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["liked"], true);
    assert_eq!(body["data"]["like"]["video"], video.id.to_string());

    let (_, liked) = call(&app.router, Method::GET, "/api/v1/likes/videos", Some(&token), None).await;
    assert_eq!(liked["data"][0]["video"]["title"], "clip");

    let (status, body) = call(&app.router, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["liked"], false);
    assert_eq!(
        app.store.count_likes(LikeTarget::Video(video.id)).await.unwrap(),
        0
    );

    let (status, _) = call(
        &app.router,
        Method::POST,
        &format!("/api/v1/likes/toggle/t/{}", uuid::Uuid::new_v4()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subscriptions_toggle_and_reject_self() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let bob = seed_user(&app.store, "bob").await;
    let uri = format!("/api/v1/subscriptions/c/{}", alice.id);

    let (status, _) = call(&app.router, Method::POST, &uri, Some(&token_for(&alice)), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app.router, Method::POST, &uri, Some(&token_for(&bob)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscribed"], true);

    let (_, body) = call(&app.router, Method::GET, &uri, None, None).await;
    assert_eq!(body["data"][0]["subscriber"]["username"], "bob");

    let (_, body) = call(
        &app.router,
        Method::GET,
        &format!("/api/v1/subscriptions/u/{}", bob.id),
        None,
        None,
    )
    .await;
    assert_eq!(body["data"][0]["username"], "alice");
}

#[tokio::test]
async fn user_scoped_listings_reject_unknown_users() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let ghost = uuid::Uuid::new_v4();

    for uri in [
        format!("/api/v1/subscriptions/c/{}", ghost),
        format!("/api/v1/subscriptions/u/{}", ghost),
        format!("/api/v1/playlists/user/{}", ghost),
    ] {
        let (status, body) = call(&app.router, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["success"], false);
    }

    let (status, body) = call(
        &app.router,
        Method::GET,
        &format!("/api/v1/playlists/user/{}", alice.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn playlist_entries_are_unique() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let video = seed_video(&app.store, &alice, "clip").await;
    let token = token_for(&alice);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/v1/playlists",
        Some(&token),
        Some(json!({ "name": "Favourites", "description": "best of" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let playlist_id = body["data"]["id"].as_str().unwrap().to_string();
    let add = format!("/api/v1/playlists/add/{}/{}", video.id, playlist_id);

    let (status, body) = call(&app.router, Method::PATCH, &add, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["videos"][0]["title"], "clip");

    let (status, _) = call(&app.router, Method::PATCH, &add, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app.router,
        Method::GET,
        &format!("/api/v1/playlists/user/{}", alice.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["videoCount"], 1);

    let remove = format!("/api/v1/playlists/remove/{}/{}", video.id, playlist_id);
    let (status, _) = call(&app.router, Method::PATCH, &remove, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app.router, Method::PATCH, &remove, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Dashboard and system ──

#[tokio::test]
async fn dashboard_reports_channel_totals() {
    let app = setup();
    let alice = seed_user(&app.store, "alice").await;
    let bob = seed_user(&app.store, "bob").await;
    let video = seed_video(&app.store, &alice, "clip").await;
    app.store
        .toggle_like(bob.id, LikeTarget::Video(video.id))
        .await
        .unwrap();
    app.store.record_view(video.id).await.unwrap();
    app.store
        .update_video(
            video.id,
            VideoChanges {
                title: Some("clip v2".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let token = token_for(&alice);
    let (status, body) = call(&app.router, Method::GET, "/api/v1/dashboard/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["videoCount"], 1);
    assert_eq!(body["data"]["likeCount"], 1);
    assert_eq!(body["data"]["viewSum"], 1);
    assert_eq!(body["data"]["subscriberCount"], 0);

    let (status, body) = call(&app.router, Method::GET, "/api/v1/dashboard/videos", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["title"], "clip v2");
    assert_eq!(body["data"][0]["likerNames"][0], "bob Full");
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = setup();
    let (status, body) = call(&app.router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["store"], "up");
}

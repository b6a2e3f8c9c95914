//! V1 API route definitions

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::api::common::middleware::{auth_middleware, optional_auth_middleware};
use crate::api::v1::{comments, dashboard, likes, playlists, subscriptions, tweets, users, videos};
use crate::InnerState;

#[tracing::instrument(name = "create_v1_routes", skip(state))]
pub fn create_v1_routes(state: InnerState) -> Router<InnerState> {
    tracing::info!("Setting up V1 API routes");

    let public = Router::new()
        .route("/users/register", post(users::register_user))
        .route("/users/login", post(users::login_user))
        .route("/videos", get(videos::list_videos))
        .route(
            "/videos/:videoId",
            get(videos::get_video).route_layer(middleware::from_fn_with_state(
                state.clone(),
                optional_auth_middleware,
            )),
        )
        .route(
            "/comments/:videoId",
            get(comments::list_comments).route_layer(middleware::from_fn_with_state(
                state.clone(),
                optional_auth_middleware,
            )),
        )
        .route("/tweets/user/:userId", get(tweets::list_user_tweets))
        .route("/playlists/user/:userId", get(playlists::list_user_playlists))
        .route("/playlists/:playlistId", get(playlists::get_playlist))
        .route(
            "/subscriptions/c/:channelId",
            get(subscriptions::channel_subscribers),
        )
        .route(
            "/subscriptions/u/:subscriberId",
            get(subscriptions::subscribed_channels),
        );

    let protected = Router::new()
        // Users
        .route("/users/logout", post(users::logout_user))
        .route("/users/me", get(users::current_user))
        // Videos
        .route("/videos", post(videos::publish_video))
        .route(
            "/videos/:videoId",
            patch(videos::update_video).delete(videos::delete_video),
        )
        .route(
            "/videos/toggle/publish/:videoId",
            patch(videos::toggle_publish_status),
        )
        // Comments
        .route("/comments/:videoId", post(comments::add_comment))
        .route(
            "/comments/c/:commentId",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        // Tweets
        .route("/tweets", post(tweets::create_tweet))
        .route(
            "/tweets/:tweetId",
            patch(tweets::update_tweet).delete(tweets::delete_tweet),
        )
        // Playlists
        .route("/playlists", post(playlists::create_playlist))
        .route(
            "/playlists/:playlistId",
            patch(playlists::update_playlist).delete(playlists::delete_playlist),
        )
        .route(
            "/playlists/add/:videoId/:playlistId",
            patch(playlists::add_video_to_playlist),
        )
        .route(
            "/playlists/remove/:videoId/:playlistId",
            patch(playlists::remove_video_from_playlist),
        )
        // Likes
        .route("/likes/toggle/v/:videoId", post(likes::toggle_video_like))
        .route("/likes/toggle/c/:commentId", post(likes::toggle_comment_like))
        .route("/likes/toggle/t/:tweetId", post(likes::toggle_tweet_like))
        .route("/likes/videos", get(likes::liked_videos))
        // Subscriptions
        .route(
            "/subscriptions/c/:channelId",
            post(subscriptions::toggle_subscription),
        )
        // Dashboard
        .route("/dashboard/stats", get(dashboard::channel_stats))
        .route("/dashboard/videos", get(dashboard::channel_videos))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

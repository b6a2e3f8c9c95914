//! API Version 1 endpoints

pub mod comments;
pub mod dashboard;
pub mod likes;
pub mod playlists;
pub mod routes;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

#[cfg(test)]
mod tests;

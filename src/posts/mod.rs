//! Posts, the feed, likes and comments.

pub mod handlers;
mod service;

pub use service::{NewPost, PostService};

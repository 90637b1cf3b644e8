//! Chat platform adapter speaking the Mattermost REST API v4.

mod client;

pub use client::MattermostClient;

use async_trait::async_trait;

use crate::contract::{
    error::PlatformError,
    model::{Channel, ChannelMember, Post, Team, TeamMember, User},
};

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Capabilities the gateway consumes from the chat platform.
///
/// Every call is independent; the gateway never retries or compensates.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn get_team_by_name(&self, name: &str) -> PlatformResult<Team>;

    async fn create_channel(&self, channel: &Channel) -> PlatformResult<Channel>;

    async fn get_channel(&self, channel_id: &str) -> PlatformResult<Channel>;

    async fn update_channel(&self, channel: &Channel) -> PlatformResult<Channel>;

    /// Archive (soft-delete) a channel.
    async fn delete_channel(&self, channel_id: &str) -> PlatformResult<()>;

    async fn create_team_member(&self, team_id: &str, user_id: &str)
        -> PlatformResult<TeamMember>;

    async fn add_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> PlatformResult<ChannelMember>;

    async fn remove_channel_member(&self, channel_id: &str, user_id: &str) -> PlatformResult<()>;

    async fn update_channel_member_roles(
        &self,
        channel_id: &str,
        user_id: &str,
        roles: &str,
    ) -> PlatformResult<ChannelMember>;

    async fn get_channel_members(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> PlatformResult<Vec<ChannelMember>>;

    async fn get_user(&self, user_id: &str) -> PlatformResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PlatformResult<User>;

    async fn create_user(&self, user: &User) -> PlatformResult<User>;

    async fn update_user(&self, user: &User) -> PlatformResult<User>;

    async fn update_user_active(&self, user_id: &str, active: bool) -> PlatformResult<()>;

    /// Permanently delete a user.
    async fn delete_user(&self, user_id: &str) -> PlatformResult<()>;

    async fn create_post(&self, post: &Post) -> PlatformResult<Post>;
}

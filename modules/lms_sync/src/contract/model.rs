//! Platform-side representations of the resources this gateway manages.
//!
//! Field names follow the platform's JSON wire format so that values can be
//! returned to callers verbatim. Users and channels also keep every field
//! they do not name in `extra`, so a record read from the platform can be
//! written back or returned without losing data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ROLE_CHANNEL_ADMIN: &str = "channel_admin";
pub const ROLE_CHANNEL_USER: &str = "channel_user";
pub const ROLE_CHANNEL_GUEST: &str = "channel_guest";

/// Channel role tags the platform accepts on a channel membership.
pub const CHANNEL_ROLES: &[&str] = &[ROLE_CHANNEL_USER, ROLE_CHANNEL_ADMIN, ROLE_CHANNEL_GUEST];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    pub id: String,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
    pub display_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub team_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelType {
    #[serde(rename = "O")]
    Open,
    #[default]
    #[serde(rename = "P")]
    Private,
    #[serde(rename = "D")]
    Direct,
    #[serde(rename = "G")]
    Group,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub id: String,
    pub create_at: i64,
    pub update_at: i64,
    /// Soft-delete marker: zero while active, archive time otherwise.
    pub delete_at: i64,
    pub team_id: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub display_name: String,
    pub name: String,
    pub header: String,
    pub purpose: String,
    pub last_post_at: i64,
    pub total_msg_count: i64,
    pub creator_id: String,
    /// Platform fields not modeled above (`props`, `group_constrained`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Channel {
    pub fn is_archived(&self) -> bool {
        self.delete_at != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub create_at: i64,
    pub update_at: i64,
    /// Soft-delete marker: zero while active, deactivation time otherwise.
    pub delete_at: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_data: Option<String>,
    pub auth_service: String,
    pub email: String,
    pub email_verified: bool,
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub roles: String,
    pub locale: String,
    pub is_bot: bool,
    /// Platform fields not modeled above (`notify_props`, `timezone`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn is_deactivated(&self) -> bool {
        self.delete_at != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
    pub team_id: String,
    pub user_id: String,
    pub roles: String,
    pub delete_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMember {
    pub channel_id: String,
    pub user_id: String,
    pub roles: String,
    pub last_viewed_at: i64,
    pub msg_count: i64,
    pub mention_count: i64,
    pub last_update_at: i64,
    pub scheme_guest: bool,
    pub scheme_user: bool,
    pub scheme_admin: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub create_at: i64,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

// Gateway inputs and projections. These never travel to the platform as-is.

/// Request to create a private channel inside a named team.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewChannel {
    pub name: String,
    pub team_name: String,
}

/// Get-or-create request for a user within a team.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewUser {
    /// Platform id to try first; empty when unknown.
    pub id: String,
    pub email: String,
    pub username: String,
    pub team_name: String,
    pub auth_service: String,
    pub auth_data: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
}

/// Sparse profile update; only `Some` fields are applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
}

impl UserPatch {
    pub fn apply_to(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email.clone_from(email);
        }
        if let Some(username) = &self.username {
            user.username.clone_from(username);
        }
        if let Some(first_name) = &self.first_name {
            user.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &self.last_name {
            user.last_name.clone_from(last_name);
        }
        if let Some(nickname) = &self.nickname {
            user.nickname.clone_from(nickname);
        }
    }
}

/// Membership change for one user in one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberChange {
    pub user_id: String,
    /// Space-separated channel roles; may be empty.
    pub role: String,
}

/// Member listing entry joined with the member's user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMemberWithUserInfo {
    pub user_id: String,
    pub channel_id: String,
    pub email: String,
    pub username: String,
    pub is_channel_admin: bool,
}

impl ChannelMemberWithUserInfo {
    pub fn new(member: &ChannelMember, user: &User) -> Self {
        Self {
            user_id: member.user_id.clone(),
            channel_id: member.channel_id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            is_channel_admin: member.scheme_admin,
        }
    }
}

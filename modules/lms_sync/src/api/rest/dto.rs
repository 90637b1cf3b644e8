use serde::{Deserialize, Serialize};

use crate::contract::model::{MemberChange, NewChannel, NewUser, UserPatch};

/// Body of `POST /channels`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelReq {
    pub name: String,
    pub team_name: String,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserReq {
    pub id: String,
    pub email: String,
    pub username: String,
    pub team_name: String,
    pub auth_service: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub auth_data: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
}

/// Body of `PATCH /users/{id}`. Absent and `null` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPatchReq {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
}

/// Body of the channel membership endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMemberReq {
    pub user_id: String,
    pub role: String,
}

/// Fixed payload for actions without a resource body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDto {
    pub status: String,
}

impl StatusDto {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}

impl From<ChannelReq> for NewChannel {
    fn from(req: ChannelReq) -> Self {
        Self {
            name: req.name,
            team_name: req.team_name,
        }
    }
}

impl From<UserReq> for NewUser {
    fn from(req: UserReq) -> Self {
        Self {
            id: req.id,
            email: req.email,
            username: req.username,
            team_name: req.team_name,
            auth_service: req.auth_service,
            auth_data: req.auth_data,
            first_name: req.first_name,
            last_name: req.last_name,
            nickname: req.nickname,
        }
    }
}

impl From<UserPatchReq> for UserPatch {
    fn from(req: UserPatchReq) -> Self {
        Self {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            nickname: req.nickname,
        }
    }
}

impl From<ChannelMemberReq> for MemberChange {
    fn from(req: ChannelMemberReq) -> Self {
        Self {
            user_id: req.user_id,
            role: req.role,
        }
    }
}

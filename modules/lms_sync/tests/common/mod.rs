#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use parking_lot::Mutex;
use tower::ServiceExt;

use lms_sync::{
    config::LmsSyncConfig,
    contract::{
        client::{PlatformApi, PlatformResult},
        error::PlatformError,
        model::{Channel, ChannelMember, Post, Team, TeamMember, User},
    },
    LmsSync,
};

pub const SECRET: &str = "1234567890abcdefghij";
pub const TEAM: &str = "physics-101";

pub fn bot_id() -> String {
    "b".repeat(26)
}

pub fn test_config() -> LmsSyncConfig {
    LmsSyncConfig {
        secret: SECRET.to_string(),
        bot_user_id: bot_id(),
        ..Default::default()
    }
}

/// In-memory platform that records every call it receives.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    teams: HashMap<String, Team>,
    channels: HashMap<String, Channel>,
    users: HashMap<String, User>,
    members: Vec<ChannelMember>,
    team_members: Vec<TeamMember>,
    posts: Vec<Post>,
    calls: Vec<String>,
    failures: HashMap<String, PlatformError>,
    panics: HashSet<String>,
}

impl State {
    fn new_id(&mut self) -> String {
        self.next_id += 1;
        format!("id{:024}", self.next_id)
    }

    fn begin(&mut self, call: String) -> PlatformResult<()> {
        let op = call.split(':').next().unwrap_or_default().to_string();
        self.calls.push(call);
        if self.panics.contains(&op) {
            panic!("{op} exploded");
        }
        match self.failures.get(&op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_team(&self, name: &str) -> Team {
        let mut s = self.state.lock();
        let team = Team {
            id: s.new_id(),
            name: name.to_string(),
            display_name: name.to_string(),
            team_type: "I".to_string(),
            ..Default::default()
        };
        s.teams.insert(name.to_string(), team.clone());
        team
    }

    pub fn add_user(&self, mut user: User) -> User {
        let mut s = self.state.lock();
        if user.id.is_empty() {
            user.id = s.new_id();
        }
        s.users.insert(user.id.clone(), user.clone());
        user
    }

    pub fn add_channel(&self, mut channel: Channel) -> Channel {
        let mut s = self.state.lock();
        if channel.id.is_empty() {
            channel.id = s.new_id();
        }
        s.channels.insert(channel.id.clone(), channel.clone());
        channel
    }

    pub fn add_member(&self, channel_id: &str, user_id: &str, admin: bool) {
        self.state.lock().members.push(ChannelMember {
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
            roles: if admin {
                "channel_user channel_admin".to_string()
            } else {
                "channel_user".to_string()
            },
            scheme_user: true,
            scheme_admin: admin,
            ..Default::default()
        });
    }

    /// Makes every later call of `op` fail with `error`.
    pub fn fail_on(&self, op: &str, error: PlatformError) {
        self.state.lock().failures.insert(op.to_string(), error);
    }

    pub fn panic_on(&self, op: &str) {
        self.state.lock().panics.insert(op.to_string());
    }

    pub fn clear_faults(&self) {
        let mut s = self.state.lock();
        s.failures.clear();
        s.panics.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state.lock().posts.clone()
    }

    pub fn channel(&self, id: &str) -> Option<Channel> {
        self.state.lock().channels.get(id).cloned()
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.state.lock().users.get(id).cloned()
    }

    pub fn team_members(&self) -> Vec<TeamMember> {
        self.state.lock().team_members.clone()
    }

    pub fn members_of(&self, channel_id: &str) -> Vec<ChannelMember> {
        self.state
            .lock()
            .members
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect()
    }
}

fn not_found(what: &str) -> PlatformError {
    PlatformError::not_found(format!("Unable to find the {what}."))
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn get_team_by_name(&self, name: &str) -> PlatformResult<Team> {
        let mut s = self.state.lock();
        s.begin(format!("get_team_by_name:{name}"))?;
        s.teams.get(name).cloned().ok_or_else(|| not_found("team"))
    }

    async fn create_channel(&self, channel: &Channel) -> PlatformResult<Channel> {
        let mut s = self.state.lock();
        s.begin(format!("create_channel:{}", channel.name))?;
        let mut created = channel.clone();
        created.id = s.new_id();
        created.create_at = 1_700_000_000_000;
        created.update_at = created.create_at;
        s.channels.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_channel(&self, channel_id: &str) -> PlatformResult<Channel> {
        let mut s = self.state.lock();
        s.begin(format!("get_channel:{channel_id}"))?;
        s.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| not_found("channel"))
    }

    async fn update_channel(&self, channel: &Channel) -> PlatformResult<Channel> {
        let mut s = self.state.lock();
        s.begin(format!("update_channel:{}", channel.id))?;
        if !s.channels.contains_key(&channel.id) {
            return Err(not_found("channel"));
        }
        s.channels.insert(channel.id.clone(), channel.clone());
        Ok(channel.clone())
    }

    async fn delete_channel(&self, channel_id: &str) -> PlatformResult<()> {
        let mut s = self.state.lock();
        s.begin(format!("delete_channel:{channel_id}"))?;
        let channel = s
            .channels
            .get_mut(channel_id)
            .ok_or_else(|| not_found("channel"))?;
        channel.delete_at = 1_700_000_100_000;
        Ok(())
    }

    async fn create_team_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> PlatformResult<TeamMember> {
        let mut s = self.state.lock();
        s.begin(format!("create_team_member:{team_id}:{user_id}"))?;
        let member = TeamMember {
            team_id: team_id.to_string(),
            user_id: user_id.to_string(),
            roles: "team_user".to_string(),
            delete_at: 0,
        };
        s.team_members.push(member.clone());
        Ok(member)
    }

    async fn add_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> PlatformResult<ChannelMember> {
        let mut s = self.state.lock();
        s.begin(format!("add_channel_member:{channel_id}:{user_id}"))?;
        let member = ChannelMember {
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
            roles: "channel_user".to_string(),
            scheme_user: true,
            ..Default::default()
        };
        s.members.push(member.clone());
        Ok(member)
    }

    async fn remove_channel_member(&self, channel_id: &str, user_id: &str) -> PlatformResult<()> {
        let mut s = self.state.lock();
        s.begin(format!("remove_channel_member:{channel_id}:{user_id}"))?;
        let before = s.members.len();
        s.members
            .retain(|m| !(m.channel_id == channel_id && m.user_id == user_id));
        if s.members.len() == before {
            return Err(not_found("channel member"));
        }
        Ok(())
    }

    async fn update_channel_member_roles(
        &self,
        channel_id: &str,
        user_id: &str,
        roles: &str,
    ) -> PlatformResult<ChannelMember> {
        let mut s = self.state.lock();
        s.begin(format!(
            "update_channel_member_roles:{channel_id}:{user_id}:{roles}"
        ))?;
        let member = s
            .members
            .iter_mut()
            .find(|m| m.channel_id == channel_id && m.user_id == user_id)
            .ok_or_else(|| not_found("channel member"))?;
        member.roles = roles.to_string();
        member.scheme_admin = roles.split_whitespace().any(|r| r == "channel_admin");
        Ok(member.clone())
    }

    async fn get_channel_members(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> PlatformResult<Vec<ChannelMember>> {
        let mut s = self.state.lock();
        s.begin(format!("get_channel_members:{channel_id}:{page}:{per_page}"))?;
        let skip = (page as usize).saturating_mul(per_page as usize);
        Ok(s.members
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .skip(skip)
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn get_user(&self, user_id: &str) -> PlatformResult<User> {
        let mut s = self.state.lock();
        s.begin(format!("get_user:{user_id}"))?;
        s.users.get(user_id).cloned().ok_or_else(|| not_found("user"))
    }

    async fn get_user_by_email(&self, email: &str) -> PlatformResult<User> {
        let mut s = self.state.lock();
        s.begin(format!("get_user_by_email:{email}"))?;
        s.users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| not_found("user"))
    }

    async fn create_user(&self, user: &User) -> PlatformResult<User> {
        let mut s = self.state.lock();
        s.begin(format!("create_user:{}", user.email))?;
        let mut created = user.clone();
        created.id = s.new_id();
        created.create_at = 1_700_000_000_000;
        s.users.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update_user(&self, user: &User) -> PlatformResult<User> {
        let mut s = self.state.lock();
        s.begin(format!("update_user:{}", user.id))?;
        if !s.users.contains_key(&user.id) {
            return Err(not_found("user"));
        }
        s.users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn update_user_active(&self, user_id: &str, active: bool) -> PlatformResult<()> {
        let mut s = self.state.lock();
        s.begin(format!("update_user_active:{user_id}:{active}"))?;
        let user = s.users.get_mut(user_id).ok_or_else(|| not_found("user"))?;
        user.delete_at = if active { 0 } else { 1 };
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> PlatformResult<()> {
        let mut s = self.state.lock();
        s.begin(format!("delete_user:{user_id}"))?;
        s.users
            .remove(user_id)
            .map(drop)
            .ok_or_else(|| not_found("user"))
    }

    async fn create_post(&self, post: &Post) -> PlatformResult<Post> {
        let mut s = self.state.lock();
        s.begin(format!("create_post:{}", post.channel_id))?;
        let mut created = post.clone();
        created.id = s.new_id();
        s.posts.push(created.clone());
        Ok(created)
    }
}

/// Router over `platform` configured with [`test_config`].
pub fn router_with(platform: Arc<FakePlatform>) -> Router {
    LmsSync::new(test_config(), platform)
        .expect("valid test config")
        .router(None)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("JSON body")
    }
}

/// Appends the shared secret to `path`.
pub fn with_secret(path: &str) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}secret={SECRET}")
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .expect("request");

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");

    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).expect("utf-8 body"),
    }
}

/// Sends `method path` with the secret attached.
pub async fn call(router: &Router, method: Method, path: &str, body: Option<&str>) -> TestResponse {
    send(router, method, &with_secret(path), body).await
}

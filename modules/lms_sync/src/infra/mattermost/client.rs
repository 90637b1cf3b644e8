use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::config::PlatformConfig;
use crate::contract::{
    client::{PlatformApi, PlatformResult},
    error::PlatformError,
    model::{Channel, ChannelMember, Post, Team, TeamMember, User},
};

const API_ROOT: [&str; 2] = ["api", "v4"];

/// [`PlatformApi`] over HTTP, authenticated with a bearer access token.
///
/// Non-2xx answers are decoded from the platform's JSON error envelope;
/// transport failures become 500s.
pub struct MattermostClient {
    http: Client,
    base: Url,
    token: String,
}

impl MattermostClient {
    pub fn new(cfg: &PlatformConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&cfg.url).context("invalid platform url")?;
        if base.cannot_be_a_base() {
            anyhow::bail!("platform url cannot be used as a base: {}", cfg.url);
        }

        let mut builder = Client::builder();
        if cfg.timeout_sec > 0 {
            builder = builder.timeout(Duration::from_secs(cfg.timeout_sec));
        }
        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base,
            token: cfg.access_token.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> PlatformResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PlatformError::internal("invalid platform base URL"))?
            .pop_if_empty()
            .extend(API_ROOT)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> PlatformResult<RequestBuilder> {
        let url = self.url(segments)?;
        debug!(%method, %url, "platform request");
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }

    async fn execute(&self, req: RequestBuilder) -> PlatformResult<Response> {
        let resp = req
            .send()
            .await
            .map_err(|e| PlatformError::internal(format!("platform request failed: {e}")))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(decode_error(resp).await)
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> PlatformResult<T> {
        let resp = self.execute(req).await?;
        resp.json::<T>()
            .await
            .map_err(|e| PlatformError::internal(format!("invalid platform response: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> PlatformResult<T> {
        self.fetch(self.request(Method::GET, segments)?).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> PlatformResult<T> {
        self.fetch(self.request(method, segments)?.json(body)).await
    }

    async fn send_status(&self, req: RequestBuilder) -> PlatformResult<()> {
        self.execute(req).await.map(drop)
    }
}

async fn decode_error(resp: Response) -> PlatformError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    match serde_json::from_str::<PlatformError>(&body) {
        Ok(mut e) if !e.message.is_empty() => {
            e.status_code = status.as_u16();
            e
        }
        _ => {
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().to_string()
            };
            PlatformError::new(status.as_u16(), message)
        }
    }
}

#[async_trait]
impl PlatformApi for MattermostClient {
    #[instrument(name = "lms_sync.platform.get_team_by_name", skip(self))]
    async fn get_team_by_name(&self, name: &str) -> PlatformResult<Team> {
        self.get(&["teams", "name", name]).await
    }

    #[instrument(name = "lms_sync.platform.create_channel", skip_all)]
    async fn create_channel(&self, channel: &Channel) -> PlatformResult<Channel> {
        self.send_json(Method::POST, &["channels"], channel).await
    }

    #[instrument(name = "lms_sync.platform.get_channel", skip(self))]
    async fn get_channel(&self, channel_id: &str) -> PlatformResult<Channel> {
        self.get(&["channels", channel_id]).await
    }

    /// Restores the channel first when the update clears the deletion marker
    /// of an archived channel; a plain update cannot do that.
    #[instrument(name = "lms_sync.platform.update_channel", skip_all, fields(channel_id = %channel.id))]
    async fn update_channel(&self, channel: &Channel) -> PlatformResult<Channel> {
        if !channel.is_archived() {
            let current: Channel = self.get(&["channels", &channel.id]).await?;
            if current.is_archived() {
                let restore = self.request(Method::POST, &["channels", &channel.id, "restore"])?;
                self.send_status(restore).await?;
            }
        }
        self.send_json(Method::PUT, &["channels", &channel.id], channel)
            .await
    }

    #[instrument(name = "lms_sync.platform.delete_channel", skip(self))]
    async fn delete_channel(&self, channel_id: &str) -> PlatformResult<()> {
        self.send_status(self.request(Method::DELETE, &["channels", channel_id])?)
            .await
    }

    #[instrument(name = "lms_sync.platform.create_team_member", skip(self))]
    async fn create_team_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> PlatformResult<TeamMember> {
        let body = json!({ "team_id": team_id, "user_id": user_id });
        self.send_json(Method::POST, &["teams", team_id, "members"], &body)
            .await
    }

    #[instrument(name = "lms_sync.platform.add_channel_member", skip(self))]
    async fn add_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> PlatformResult<ChannelMember> {
        let body = json!({ "user_id": user_id });
        self.send_json(Method::POST, &["channels", channel_id, "members"], &body)
            .await
    }

    #[instrument(name = "lms_sync.platform.remove_channel_member", skip(self))]
    async fn remove_channel_member(&self, channel_id: &str, user_id: &str) -> PlatformResult<()> {
        let req = self.request(Method::DELETE, &["channels", channel_id, "members", user_id])?;
        self.send_status(req).await
    }

    /// The roles endpoint answers with a bare status, so the updated
    /// membership is read back afterwards.
    #[instrument(name = "lms_sync.platform.update_channel_member_roles", skip(self))]
    async fn update_channel_member_roles(
        &self,
        channel_id: &str,
        user_id: &str,
        roles: &str,
    ) -> PlatformResult<ChannelMember> {
        let req = self
            .request(
                Method::PUT,
                &["channels", channel_id, "members", user_id, "roles"],
            )?
            .json(&json!({ "roles": roles }));
        self.send_status(req).await?;
        self.get(&["channels", channel_id, "members", user_id]).await
    }

    #[instrument(name = "lms_sync.platform.get_channel_members", skip(self))]
    async fn get_channel_members(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> PlatformResult<Vec<ChannelMember>> {
        let req = self
            .request(Method::GET, &["channels", channel_id, "members"])?
            .query(&[("page", page), ("per_page", per_page)]);
        self.fetch(req).await
    }

    #[instrument(name = "lms_sync.platform.get_user", skip(self))]
    async fn get_user(&self, user_id: &str) -> PlatformResult<User> {
        self.get(&["users", user_id]).await
    }

    #[instrument(name = "lms_sync.platform.get_user_by_email", skip(self))]
    async fn get_user_by_email(&self, email: &str) -> PlatformResult<User> {
        self.get(&["users", "email", email]).await
    }

    #[instrument(name = "lms_sync.platform.create_user", skip_all)]
    async fn create_user(&self, user: &User) -> PlatformResult<User> {
        self.send_json(Method::POST, &["users"], user).await
    }

    #[instrument(name = "lms_sync.platform.update_user", skip_all, fields(user_id = %user.id))]
    async fn update_user(&self, user: &User) -> PlatformResult<User> {
        self.send_json(Method::PUT, &["users", &user.id], user)
            .await
    }

    #[instrument(name = "lms_sync.platform.update_user_active", skip(self))]
    async fn update_user_active(&self, user_id: &str, active: bool) -> PlatformResult<()> {
        let req = self
            .request(Method::PUT, &["users", user_id, "active"])?
            .json(&json!({ "active": active }));
        self.send_status(req).await
    }

    #[instrument(name = "lms_sync.platform.delete_user", skip(self))]
    async fn delete_user(&self, user_id: &str) -> PlatformResult<()> {
        let req = self
            .request(Method::DELETE, &["users", user_id])?
            .query(&[("permanent", "true")]);
        self.send_status(req).await
    }

    #[instrument(name = "lms_sync.platform.create_post", skip_all, fields(channel_id = %post.channel_id))]
    async fn create_post(&self, post: &Post) -> PlatformResult<Post> {
        self.send_json(Method::POST, &["posts"], post).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::ChannelType;
    use httpmock::prelude::*;

    const TOKEN: &str = "token-123";

    fn client(server: &MockServer) -> MattermostClient {
        MattermostClient::new(&PlatformConfig {
            url: server.base_url(),
            access_token: TOKEN.into(),
            timeout_sec: 5,
        })
        .unwrap()
    }

    fn id(c: char) -> String {
        c.to_string().repeat(26)
    }

    #[test]
    fn url_building_keeps_base_path() {
        let c = MattermostClient::new(&PlatformConfig {
            url: "https://chat.example.com/mm/".into(),
            access_token: String::new(),
            timeout_sec: 0,
        })
        .unwrap();
        let url = c.url(&["users", "email", "a+b@example.com"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://chat.example.com/mm/api/v4/users/email/a+b@example.com"
        );
    }

    #[tokio::test]
    async fn get_team_sends_bearer_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v4/teams/name/physics-101")
                .header("authorization", format!("Bearer {TOKEN}"));
            then.status(200)
                .json_body(serde_json::json!({"id": id('t'), "name": "physics-101", "type": "I"}));
        });

        let team = client(&server).get_team_by_name("physics-101").await.unwrap();

        mock.assert();
        assert_eq!(team.id, id('t'));
        assert_eq!(team.team_type, "I");
    }

    #[tokio::test]
    async fn error_envelope_is_decoded() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(format!("/api/v4/users/{}", id('u')));
            then.status(404).json_body(serde_json::json!({
                "id": "app.user.missing.app_error",
                "message": "Unable to find the user.",
                "detailed_error": "resource: User id: uuu",
                "status_code": 404
            }));
        });

        let err = client(&server).get_user(&id('u')).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.id, "app.user.missing.app_error");
        assert_eq!(err.detailed_error, "resource: User id: uuu");
    }

    #[tokio::test]
    async fn non_json_error_keeps_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path(format!("/api/v4/channels/{}", id('c')));
            then.status(502).body("bad gateway");
        });

        let err = client(&server).delete_channel(&id('c')).await.unwrap_err();

        assert_eq!(err.status_code, 502);
        assert_eq!(err.message, "bad gateway");
    }

    #[tokio::test]
    async fn transport_failure_is_internal() {
        let c = MattermostClient::new(&PlatformConfig {
            url: "http://127.0.0.1:1".into(),
            access_token: TOKEN.into(),
            timeout_sec: 2,
        })
        .unwrap();

        let err = c.get_user(&id('u')).await.unwrap_err();
        assert_eq!(err.status_code, 500);
    }

    #[tokio::test]
    async fn update_of_archived_channel_restores_first() {
        let server = MockServer::start();
        let channel_id = id('c');
        let get = server.mock(|when, then| {
            when.method(GET).path(format!("/api/v4/channels/{channel_id}"));
            then.status(200)
                .json_body(serde_json::json!({"id": channel_id, "delete_at": 1700, "type": "P"}));
        });
        let restore = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/api/v4/channels/{channel_id}/restore"));
            then.status(200)
                .json_body(serde_json::json!({"id": channel_id, "delete_at": 0}));
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path(format!("/api/v4/channels/{channel_id}"));
            then.status(200)
                .json_body(serde_json::json!({"id": channel_id, "name": "lecture-1", "type": "P"}));
        });

        let update = Channel {
            id: channel_id.clone(),
            name: "lecture-1".into(),
            channel_type: ChannelType::Private,
            ..Default::default()
        };
        let updated = client(&server).update_channel(&update).await.unwrap();

        get.assert();
        restore.assert();
        put.assert();
        assert_eq!(updated.name, "lecture-1");
    }

    #[tokio::test]
    async fn member_roles_update_reads_back_membership() {
        let server = MockServer::start();
        let (channel_id, user_id) = (id('c'), id('u'));
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path(format!("/api/v4/channels/{channel_id}/members/{user_id}/roles"))
                .json_body(serde_json::json!({"roles": "channel_user channel_admin"}));
            then.status(200).json_body(serde_json::json!({"status": "OK"}));
        });
        let get = server.mock(|when, then| {
            when.method(GET)
                .path(format!("/api/v4/channels/{channel_id}/members/{user_id}"));
            then.status(200).json_body(serde_json::json!({
                "channel_id": channel_id,
                "user_id": user_id,
                "roles": "channel_user channel_admin",
                "scheme_admin": true
            }));
        });

        let member = client(&server)
            .update_channel_member_roles(&channel_id, &user_id, "channel_user channel_admin")
            .await
            .unwrap();

        put.assert();
        get.assert();
        assert!(member.scheme_admin);
    }

    #[tokio::test]
    async fn members_page_is_forwarded() {
        let server = MockServer::start();
        let channel_id = id('c');
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(format!("/api/v4/channels/{channel_id}/members"))
                .query_param("page", "2")
                .query_param("per_page", "50");
            then.status(200).json_body(serde_json::json!([]));
        });

        let members = client(&server)
            .get_channel_members(&channel_id, 2, 50)
            .await
            .unwrap();

        mock.assert();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn user_update_writes_back_the_full_record() {
        use crate::contract::model::{User, UserPatch};
        use crate::domain::{
            service::Service,
            settings::{Settings, SettingsHolder},
        };
        use std::sync::Arc;

        let server = MockServer::start();
        let user_id = id('u');
        let fetched = serde_json::json!({
            "id": user_id,
            "username": "jane.doe",
            "email": "jane.doe@example.com",
            "nickname": "jane",
            "notify_props": {"email": "true", "push": "mention"},
            "timezone": {"useAutomaticTimezone": "true", "automaticTimezone": "Europe/Berlin"},
            "props": {"customStatus": ""},
            "mfa_active": false
        });

        let mut expected: User = serde_json::from_value(fetched.clone()).unwrap();
        expected.nickname = "jd".into();
        let expected = serde_json::to_value(&expected).unwrap();
        assert_eq!(expected["notify_props"], fetched["notify_props"]);
        assert_eq!(expected["timezone"], fetched["timezone"]);

        let get = server.mock(|when, then| {
            when.method(GET).path(format!("/api/v4/users/{user_id}"));
            then.status(200).json_body(fetched.clone());
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path(format!("/api/v4/users/{user_id}"))
                .json_body(expected.clone());
            then.status(200).json_body(expected.clone());
        });

        let settings = Arc::new(SettingsHolder::new(Settings {
            secret: "s".into(),
            bot_user_id: id('b'),
        }));
        let service = Service::new(Arc::new(client(&server)), settings);
        let patch = UserPatch {
            nickname: Some("jd".into()),
            ..Default::default()
        };
        let updated = service.update_user(&user_id, patch).await.unwrap();

        get.assert();
        put.assert();
        assert_eq!(updated.nickname, "jd");
        let returned = serde_json::to_value(&updated).unwrap();
        assert_eq!(returned["notify_props"], fetched["notify_props"]);
        assert_eq!(returned["props"], fetched["props"]);
    }

    #[tokio::test]
    async fn delete_user_is_permanent() {
        let server = MockServer::start();
        let user_id = id('u');
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path(format!("/api/v4/users/{user_id}"))
                .query_param("permanent", "true");
            then.status(200).json_body(serde_json::json!({"status": "OK"}));
        });

        client(&server).delete_user(&user_id).await.unwrap();
        mock.assert();
    }
}

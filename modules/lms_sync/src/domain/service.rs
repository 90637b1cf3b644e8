use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::contract::{
    client::{PlatformApi, PlatformResult},
    error::PlatformError,
    model::{
        Channel, ChannelMemberWithUserInfo, ChannelType, MemberChange, NewChannel, NewUser, Post,
        User, UserPatch, ROLE_CHANNEL_ADMIN,
    },
};
use crate::domain::{
    error::DomainError,
    settings::SettingsHolder,
    validation::{
        is_valid_channel_identifier, is_valid_channel_roles, is_valid_email, is_valid_id,
        is_valid_team_name, is_valid_username,
    },
};

const AUTH_SERVICES: &[&str] = &["ldap", "saml"];

/// Result of a get-or-create user call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserOutcome {
    /// The user already existed (possibly reactivated).
    Existing(User),
    Created(User),
}

impl UserOutcome {
    pub fn into_user(self) -> User {
        match self {
            Self::Existing(user) | Self::Created(user) => user,
        }
    }
}

/// Gateway operations over the chat platform.
///
/// Each operation validates its input before touching the platform, then runs
/// the platform calls in order and stops at the first failure. Steps that
/// already succeeded are left in place.
pub struct Service {
    platform: Arc<dyn PlatformApi>,
    settings: Arc<SettingsHolder>,
}

impl Service {
    pub fn new(platform: Arc<dyn PlatformApi>, settings: Arc<SettingsHolder>) -> Self {
        Self { platform, settings }
    }

    fn bot_user_id(&self) -> String {
        self.settings.snapshot().bot_user_id.clone()
    }

    #[instrument(skip(self), fields(name = %req.name, team = %req.team_name))]
    pub async fn create_channel(&self, req: NewChannel) -> Result<Channel, DomainError> {
        validate_new_channel(&req)?;
        let bot_id = self.bot_user_id();

        let team = self
            .platform
            .get_team_by_name(&req.team_name)
            .await
            .map_err(|e| DomainError::platform("Invalid team name", e))?;

        let draft = Channel {
            name: req.name.clone(),
            display_name: req.name,
            team_id: team.id.clone(),
            channel_type: ChannelType::Private,
            creator_id: bot_id.clone(),
            ..Default::default()
        };
        let channel = self
            .platform
            .create_channel(&draft)
            .await
            .map_err(|e| failed("create channel", e))?;

        self.platform
            .create_team_member(&team.id, &bot_id)
            .await
            .map_err(|e| failed("add bot to team", e))?;
        self.platform
            .add_channel_member(&channel.id, &bot_id)
            .await
            .map_err(|e| failed("add bot to channel", e))?;

        info!(channel_id = %channel.id, "Created channel");
        Ok(channel)
    }

    #[instrument(skip(self))]
    pub async fn archive_channel(&self, channel_id: &str) -> Result<(), DomainError> {
        require_channel_id(channel_id)?;

        self.platform
            .delete_channel(channel_id)
            .await
            .map_err(|e| failed("archive channel", e))?;
        info!("Archived channel");
        Ok(())
    }

    /// Clears the deletion marker by resubmitting the channel's current
    /// identity fields. A restored channel is always private, like every
    /// channel this gateway creates.
    #[instrument(skip(self))]
    pub async fn unarchive_channel(&self, channel_id: &str) -> Result<(), DomainError> {
        require_channel_id(channel_id)?;

        let current = self
            .platform
            .get_channel(channel_id)
            .await
            .map_err(|e| DomainError::platform("Invalid channel id", e))?;

        let restored = Channel {
            id: current.id,
            display_name: current.display_name,
            name: current.name,
            channel_type: ChannelType::Private,
            team_id: current.team_id,
            create_at: current.create_at,
            delete_at: 0,
            ..Default::default()
        };
        self.platform
            .update_channel(&restored)
            .await
            .map_err(|e| failed("unarchive channel", e))?;
        info!("Unarchived channel");
        Ok(())
    }

    /// Resolves a user by id, then by email, creating one in the team when
    /// neither lookup finds it. A deactivated match is reactivated.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn get_or_create_user(&self, req: NewUser) -> Result<UserOutcome, DomainError> {
        let req = normalize_new_user(req)?;

        if !req.id.is_empty() {
            let found = self.platform.get_user(&req.id).await;
            if let Some(user) = self.existing_user(found).await? {
                return Ok(UserOutcome::Existing(user));
            }
        }

        let found = self.platform.get_user_by_email(&req.email).await;
        if let Some(user) = self.existing_user(found).await? {
            return Ok(UserOutcome::Existing(user));
        }

        let team = self
            .platform
            .get_team_by_name(&req.team_name)
            .await
            .map_err(|e| DomainError::platform("Invalid team name", e))?;

        let draft = User {
            email: req.email,
            email_verified: true,
            auth_service: req.auth_service,
            auth_data: Some(req.auth_data),
            first_name: req.first_name,
            last_name: req.last_name,
            username: req.username,
            nickname: req.nickname,
            ..Default::default()
        };
        let user = self
            .platform
            .create_user(&draft)
            .await
            .map_err(|e| failed("create user", e))?;

        self.platform
            .create_team_member(&team.id, &user.id)
            .await
            .map_err(|e| failed("add user to team", e))?;

        info!(user_id = %user.id, "Created user");
        Ok(UserOutcome::Created(user))
    }

    /// Interprets one lookup of get-or-create. Not-found means "keep looking";
    /// other failures end the operation.
    async fn existing_user(
        &self,
        found: PlatformResult<User>,
    ) -> Result<Option<User>, DomainError> {
        let mut user = match found {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                warn!(error = %e, "Failed to get user by id");
                return Ok(None);
            }
            Err(e) => return Err(failed("get user", e)),
        };

        if user.is_deactivated() {
            self.platform
                .update_user_active(&user.id, true)
                .await
                .map_err(|e| failed("activate user", e))?;
            user.delete_at = 0;
            info!(user_id = %user.id, "Reactivated user");
        }
        Ok(Some(user))
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DomainError> {
        let email = email.to_lowercase();
        if !is_valid_email(&email) {
            error!("email is not valid");
            return Err(DomainError::validation("email is not valid"));
        }

        self.platform
            .get_user_by_email(&email)
            .await
            .map_err(|e| DomainError::platform("", e))
    }

    #[instrument(skip(self, patch))]
    pub async fn update_user(&self, user_id: &str, patch: UserPatch) -> Result<User, DomainError> {
        require_user_id(user_id)?;
        let patch = normalize_patch(patch)?;

        let mut user = self
            .platform
            .get_user(user_id)
            .await
            .map_err(|e| failed("get user by id", e))?;
        patch.apply_to(&mut user);

        let updated = self
            .platform
            .update_user(&user)
            .await
            .map_err(|e| failed("update user", e))?;
        info!("Updated user");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: &str) -> Result<(), DomainError> {
        require_user_id(user_id)?;

        self.platform
            .delete_user(user_id)
            .await
            .map_err(|e| failed("delete user", e))?;
        info!("Deleted user");
        Ok(())
    }

    /// Adds a member; the `channel_admin` role additionally promotes the
    /// member and announces it in the channel.
    #[instrument(skip(self, change), fields(user_id = %change.user_id, role = %change.role))]
    pub async fn add_channel_member(
        &self,
        channel_id: &str,
        change: MemberChange,
    ) -> Result<(), DomainError> {
        require_channel_id(channel_id)?;
        validate_member_change(&change)?;

        self.platform
            .add_channel_member(channel_id, &change.user_id)
            .await
            .map_err(|e| failed("add user to channel", e))?;

        if change.role == ROLE_CHANNEL_ADMIN {
            self.platform
                .update_channel_member_roles(channel_id, &change.user_id, &change.role)
                .await
                .map_err(|e| failed("make user the channel admin", e))?;
            let user = self
                .platform
                .get_user(&change.user_id)
                .await
                .map_err(|e| failed("get user", e))?;
            self.announce(channel_id, format!("@{} was made channel admin.", user.username))
                .await;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), DomainError> {
        require_channel_id(channel_id)?;
        require_user_id(user_id)?;

        self.platform
            .remove_channel_member(channel_id, user_id)
            .await
            .map_err(|e| failed("remove user from channel", e))?;
        Ok(())
    }

    #[instrument(skip(self, change), fields(user_id = %change.user_id, role = %change.role))]
    pub async fn update_channel_member_roles(
        &self,
        channel_id: &str,
        change: MemberChange,
    ) -> Result<(), DomainError> {
        require_channel_id(channel_id)?;
        validate_member_change(&change)?;
        if change.role.is_empty() {
            return Err(DomainError::validation("role cannot be empty"));
        }

        self.platform
            .update_channel_member_roles(channel_id, &change.user_id, &change.role)
            .await
            .map_err(|e| failed("update roles for the user and channel", e))?;
        let user = self
            .platform
            .get_user(&change.user_id)
            .await
            .map_err(|e| failed("get user", e))?;

        let message = if change.role == ROLE_CHANNEL_ADMIN {
            format!("@{} was made channel admin", user.username)
        } else {
            format!("@{} was made member", user.username)
        };
        self.announce(channel_id, message).await;
        Ok(())
    }

    /// One page of channel members, bots excluded.
    #[instrument(skip(self))]
    pub async fn list_channel_members(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ChannelMemberWithUserInfo>, DomainError> {
        require_channel_id(channel_id)?;

        let members = self
            .platform
            .get_channel_members(channel_id, page, per_page)
            .await
            .map_err(|e| failed("fetch channel members", e))?;

        let mut listed = Vec::with_capacity(members.len());
        for member in &members {
            let user = self
                .platform
                .get_user(&member.user_id)
                .await
                .map_err(|e| failed("fetch user", e))?;
            if user.is_bot {
                continue;
            }
            listed.push(ChannelMemberWithUserInfo::new(member, &user));
        }
        debug!(total = members.len(), listed = listed.len(), "Listed channel members");
        Ok(listed)
    }

    /// Best effort: a failed post is logged and otherwise ignored.
    async fn announce(&self, channel_id: &str, message: String) {
        let post = Post {
            channel_id: channel_id.to_string(),
            user_id: self.bot_user_id(),
            message,
            ..Default::default()
        };
        if let Err(e) = self.platform.create_post(&post).await {
            warn!(error = %e, channel_id, "Failed to post announcement");
        }
    }
}

fn failed(action: &str, e: PlatformError) -> DomainError {
    debug!(error = %e, "Failed to {action}");
    DomainError::failed(action, e)
}

fn require_channel_id(channel_id: &str) -> Result<(), DomainError> {
    if is_valid_id(channel_id) {
        return Ok(());
    }
    error!(channel_id, "channel id is not valid");
    Err(DomainError::validation("channel id is not valid"))
}

fn require_user_id(user_id: &str) -> Result<(), DomainError> {
    if is_valid_id(user_id) {
        return Ok(());
    }
    error!(user_id, "user id is not valid");
    Err(DomainError::validation("user id is not valid"))
}

fn validate_new_channel(req: &NewChannel) -> Result<(), DomainError> {
    if !is_valid_channel_identifier(&req.name) {
        return Err(DomainError::invalid_field("name"));
    }
    if !is_valid_team_name(&req.team_name) {
        return Err(DomainError::invalid_field("team_name"));
    }
    Ok(())
}

/// Lowercases the email and checks fields in a fixed order so the first
/// problem found is the one reported.
fn normalize_new_user(mut req: NewUser) -> Result<NewUser, DomainError> {
    if !req.id.is_empty() && !is_valid_id(&req.id) {
        return Err(DomainError::invalid_field("id"));
    }

    req.email = req.email.to_lowercase();
    if !is_valid_email(&req.email) {
        return Err(DomainError::invalid_field("email"));
    }

    if !is_valid_team_name(&req.team_name) {
        return Err(DomainError::invalid_field("team_name"));
    }

    if !req.username.is_empty() && !is_valid_username(&req.username) {
        return Err(DomainError::invalid_field("username"));
    }

    if req.auth_service.is_empty() {
        return Err(DomainError::validation(
            "error: auth_service cannot be empty",
        ));
    }
    if !AUTH_SERVICES.contains(&req.auth_service.as_str()) {
        return Err(DomainError::validation(
            "error: auth_service can only be 'ldap' or 'saml'",
        ));
    }

    if req.auth_data.is_empty() {
        return Err(DomainError::validation("error: auth_data cannot be empty"));
    }

    Ok(req)
}

fn normalize_patch(mut patch: UserPatch) -> Result<UserPatch, DomainError> {
    if let Some(email) = patch.email.as_mut() {
        *email = email.to_lowercase();
        if !is_valid_email(email) {
            return Err(DomainError::invalid_field("email"));
        }
    }
    if let Some(username) = &patch.username {
        if !is_valid_username(username) {
            return Err(DomainError::invalid_field("username"));
        }
    }
    Ok(patch)
}

fn validate_member_change(change: &MemberChange) -> Result<(), DomainError> {
    if !is_valid_id(&change.user_id) {
        return Err(DomainError::invalid_field("user_id"));
    }
    if !change.role.is_empty() && !is_valid_channel_roles(&change.role) {
        return Err(DomainError::invalid_field("role"));
    }
    Ok(())
}

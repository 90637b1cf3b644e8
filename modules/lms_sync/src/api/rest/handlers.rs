use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api::rest::{
    dto::{ChannelMemberReq, ChannelReq, StatusDto, UserPatchReq, UserReq},
    error::ApiError,
    pagination::PageParams,
};
use crate::contract::model::{Channel, ChannelMemberWithUserInfo, User};
use crate::domain::{
    error::DomainError,
    service::{Service, UserOutcome},
};

type Svc = Extension<Arc<Service>>;

/// Decodes the first JSON value of a request body. Anything after it is
/// ignored.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    match serde_json::Deserializer::from_slice(body)
        .into_iter::<T>()
        .next()
    {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => {
            debug!(error = %e, "Failed to decode request body");
            Err(DomainError::invalid_body().into())
        }
        None => Err(DomainError::invalid_body().into()),
    }
}

/// Liveness check for callers holding the secret.
pub async fn test() -> Json<StatusDto> {
    Json(StatusDto::ok())
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

pub async fn create_channel(
    Extension(svc): Svc,
    body: Bytes,
) -> Result<(StatusCode, Json<Channel>), ApiError> {
    let req: ChannelReq = parse_body(&body)?;
    info!("Creating channel: {:?}", req);

    let channel = svc.create_channel(req.into()).await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn archive_channel(
    Extension(svc): Svc,
    Path(channel_id): Path<String>,
) -> Result<Json<StatusDto>, ApiError> {
    info!("Archiving channel: {}", channel_id);

    svc.archive_channel(&channel_id).await?;
    Ok(Json(StatusDto::ok()))
}

pub async fn unarchive_channel(
    Extension(svc): Svc,
    Path(channel_id): Path<String>,
) -> Result<Json<StatusDto>, ApiError> {
    info!("Unarchiving channel: {}", channel_id);

    svc.unarchive_channel(&channel_id).await?;
    Ok(Json(StatusDto::ok()))
}

/// 201 when the user had to be created, 200 when an existing one was found.
pub async fn get_or_create_user(
    Extension(svc): Svc,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: UserReq = parse_body(&body)?;
    info!("Get or create user: {}", req.email);

    let response = match svc.get_or_create_user(req.into()).await? {
        UserOutcome::Existing(user) => (StatusCode::OK, Json(user)),
        UserOutcome::Created(user) => (StatusCode::CREATED, Json(user)),
    };
    Ok(response)
}

pub async fn get_user_by_email(
    Extension(svc): Svc,
    Path(email): Path<String>,
) -> Result<Json<User>, ApiError> {
    info!("Getting user by email: {}", email);

    let user = svc.get_user_by_email(&email).await?;
    Ok(Json(user))
}

pub async fn update_user(
    Extension(svc): Svc,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Json<User>, ApiError> {
    let req: UserPatchReq = parse_body(&body)?;
    info!("Updating user {} with: {:?}", user_id, req);

    let user = svc.update_user(&user_id, req.into()).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    Extension(svc): Svc,
    Path(user_id): Path<String>,
) -> Result<Json<StatusDto>, ApiError> {
    info!("Deleting user: {}", user_id);

    svc.delete_user(&user_id).await?;
    Ok(Json(StatusDto::ok()))
}

pub async fn add_channel_member(
    Extension(svc): Svc,
    Path(channel_id): Path<String>,
    body: Bytes,
) -> Result<Json<StatusDto>, ApiError> {
    let req: ChannelMemberReq = parse_body(&body)?;
    info!("Adding member to channel {}: {:?}", channel_id, req);

    svc.add_channel_member(&channel_id, req.into()).await?;
    Ok(Json(StatusDto::ok()))
}

pub async fn remove_channel_member(
    Extension(svc): Svc,
    Path((channel_id, user_id)): Path<(String, String)>,
) -> Result<Json<StatusDto>, ApiError> {
    info!("Removing user {} from channel {}", user_id, channel_id);

    svc.remove_channel_member(&channel_id, &user_id).await?;
    Ok(Json(StatusDto::ok()))
}

pub async fn update_channel_member_roles(
    Extension(svc): Svc,
    Path(channel_id): Path<String>,
    body: Bytes,
) -> Result<Json<StatusDto>, ApiError> {
    let req: ChannelMemberReq = parse_body(&body)?;
    info!("Updating member roles in channel {}: {:?}", channel_id, req);

    svc.update_channel_member_roles(&channel_id, req.into())
        .await?;
    Ok(Json(StatusDto::ok()))
}

pub async fn list_channel_members(
    Extension(svc): Svc,
    Path(channel_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<ChannelMemberWithUserInfo>>, ApiError> {
    let params = PageParams::from_query(query.as_deref());
    info!(
        "Listing members of channel {} (page {}, per_page {})",
        channel_id, params.page, params.per_page
    );

    let members = svc
        .list_channel_members(&channel_id, params.page, params.per_page)
        .await?;
    Ok(Json(members))
}

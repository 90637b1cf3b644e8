use std::{sync::Arc, time::Duration};

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
    Extension, Router,
};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
};

use crate::api::rest::{handlers, middleware};
use crate::config::LmsSyncConfig;
use crate::domain::{service::Service, settings::SettingsHolder};

/// Registers the secret-protected gateway routes on `router`, nested under
/// `prefix` (empty for the root).
pub fn register_routes(
    router: Router,
    prefix: &str,
    service: Arc<Service>,
    settings: Arc<SettingsHolder>,
) -> Router {
    let api = Router::new()
        .route("/test", post(handlers::test))
        .route("/channels", post(handlers::create_channel))
        .route("/channels/{channel_id}", delete(handlers::archive_channel))
        .route(
            "/channels/{channel_id}/unarchive",
            post(handlers::unarchive_channel),
        )
        .route(
            "/channels/{channel_id}/members",
            post(handlers::add_channel_member).get(handlers::list_channel_members),
        )
        .route(
            "/channels/{channel_id}/members/roles",
            patch(handlers::update_channel_member_roles),
        )
        .route(
            "/channels/{channel_id}/members/{user_id}",
            delete(handlers::remove_channel_member),
        )
        .route("/users", post(handlers::get_or_create_user))
        // One parameter name per path shape: an email for GET, an id otherwise.
        .route(
            "/users/{user}",
            get(handlers::get_user_by_email)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route_layer(from_fn_with_state(settings, middleware::require_secret))
        .layer(Extension(service));

    if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(prefix, api)
    }
}

/// Full application router: gateway routes, liveness, optional static
/// assets, and the request pipeline around them.
pub fn build_router(
    config: &LmsSyncConfig,
    service: Arc<Service>,
    settings: Arc<SettingsHolder>,
    timeout: Option<Duration>,
) -> Router {
    middleware::install_panic_hook();

    let mut router = Router::new().route("/healthz", get(handlers::healthz));
    router = register_routes(router, config.normalized_prefix(), service, settings);

    if let Some(dir) = &config.assets_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    router = router
        .fallback(handlers::not_found)
        .layer(from_fn(middleware::recover_panics));

    if let Some(timeout) = timeout {
        router = router.layer(TimeoutLayer::new(timeout));
    }

    let x_request_id = middleware::request_id_header();
    router
        .layer(RequestBodyLimitLayer::new(middleware::BODY_LIMIT_BYTES))
        .layer(middleware::create_trace_layer())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, middleware::MakeReqId))
}

use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(auth_routes())
        .merge(role_routes())
        .merge(group_routes())
        .merge(user_routes())
        .merge(upload_routes(config.storage.max_upload_size))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::logout))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(handlers::csrf::issue_csrf_token))
}

fn role_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::role::list_roles,
            handlers::role::create_role
        ))
        .routes(routes!(
            handlers::role::get_role,
            handlers::role::update_role,
            handlers::role::delete_role
        ))
}

fn group_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::group::list_groups,
            handlers::group::create_group
        ))
        .routes(routes!(
            handlers::group::get_group,
            handlers::group::update_group,
            handlers::group::delete_group
        ))
        .routes(routes!(handlers::group::set_group_members))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::user::list_users))
        .routes(routes!(
            handlers::user::get_user,
            handlers::user::update_user,
            handlers::user::delete_user
        ))
        .routes(routes!(handlers::user::set_user_groups))
        .routes(routes!(handlers::user::save_user_profile))
}

fn upload_routes(max_upload_size: u64) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::upload::list_uploads,
            handlers::upload::upload_file
        ))
        .routes(routes!(handlers::upload::download_upload))
        .routes(routes!(handlers::upload::delete_upload))
        .layer(handlers::upload::upload_body_limit(max_upload_size))
}

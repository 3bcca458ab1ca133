//! API routes

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::extractors::AppState;
use crate::handlers::{admin, auth, evaluations, media, profile};

/// Create the complete application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api_root))
        .nest("/api", api_router())
        .nest("/admin", admin_router())
        .route("/media/*key", get(media::get_media))
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/invitations/validate", post(auth::validate_token))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route(
            "/profile",
            get(profile::get_profile).patch(profile::update_profile),
        )
        .route("/assignments", get(evaluations::list_own_assignments))
        .route("/evaluations", post(evaluations::submit_evaluation))
        .route("/evaluations/next", get(evaluations::next_image))
}

fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/panel", get(admin::panel))
        .route("/clinicians/:id/stats", get(admin::clinician_stats))
        .route("/evaluations/export", post(admin::export_evaluations))
        .route(
            "/invitations",
            get(admin::list_invitations).post(admin::create_invitations),
        )
        .route("/image-sets", get(admin::list_image_sets))
        .route("/assignments", post(admin::create_assignment))
}

async fn api_root(State(state): State<AppState>) -> Json<ApiRoot> {
    Json(ApiRoot {
        type_name: "Root",
        instance_name: state.config.instance.app_title.clone(),
        core_version: env!("CARGO_PKG_VERSION"),
        links: Links {
            register: "/api/register",
            login: "/api/login",
            profile: "/api/profile",
            next_image: "/api/evaluations/next",
            admin_panel: "/admin/panel",
        },
    })
}

#[derive(Serialize)]
struct ApiRoot {
    #[serde(rename = "_type")]
    type_name: &'static str,
    #[serde(rename = "instanceName")]
    instance_name: String,
    #[serde(rename = "coreVersion")]
    core_version: &'static str,
    #[serde(rename = "_links")]
    links: Links,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Links {
    register: &'static str,
    login: &'static str,
    profile: &'static str,
    next_image: &'static str,
    admin_panel: &'static str,
}

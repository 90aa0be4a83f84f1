//! Route definitions.
//!
//! Route hierarchy under `/api/v1`:
//!
//! ```text
//! /artifacts                                 register (POST)
//! /artifacts/{id}                            get, update, delete
//! /artifacts/{id}/images                     ingest upload (POST), delete (DELETE)
//! /artifacts/{id}/annotations                read (GET), upsert (PUT)
//! /artifacts/{id}/protect                    protected export (POST)
//! /artifacts/{id}/unprotect                  protected import (POST)
//! /artifacts/{id}/timelapse                  record frame (POST)
//! /artifacts/{id}/timelapse/{timeline_id}    list frames (GET)
//! ```

pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/artifacts", post(handlers::artifact::create_artifact))
        .route(
            "/artifacts/{id}",
            get(handlers::artifact::get_artifact)
                .put(handlers::artifact::update_artifact)
                .delete(handlers::artifact::delete_artifact),
        )
        .route(
            "/artifacts/{id}/images",
            post(handlers::upload::upload_image).delete(handlers::upload::remove_image),
        )
        .route(
            "/artifacts/{id}/annotations",
            get(handlers::annotation::get_annotations).put(handlers::annotation::put_annotations),
        )
        .route("/artifacts/{id}/protect", post(handlers::protect::protect))
        .route("/artifacts/{id}/unprotect", post(handlers::protect::unprotect))
        .route(
            "/artifacts/{id}/timelapse",
            post(handlers::timelapse::record_frame),
        )
        .route(
            "/artifacts/{id}/timelapse/{timeline_id}",
            get(handlers::timelapse::list_frames),
        )
}

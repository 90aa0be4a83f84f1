//! Request handlers.
//!
//! Each submodule provides async handler functions for one boundary.
//! Handlers delegate to `reliquary_db` repositories and the
//! `reliquary_pipeline` services, mapping errors via [`crate::error::AppError`].

pub mod annotation;
pub mod artifact;
pub mod protect;
pub mod timelapse;
pub mod upload;

pub mod aggregate;
pub mod backup;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod logging;
pub mod ordering;

use axum::Router;

pub use crate::{
    config::{Config, Environment},
    db::Database,
    error::{BoardError, BoardResult},
};

/// The full HTTP application, rooted at `/api`, over an opened database.
pub fn app(db: Database) -> Router {
    controllers::router(db)
}

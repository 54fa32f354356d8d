// lookbook - terminal client for the outfit-analysis service
//
// Imports image boards into the backend, drives the server-side AI
// analysis job, and browses the detected outfits through faceted
// filters.
//
// Architecture:
// - api: HTTP request client (reqwest) with one error shape, bearer
//   injection, and the snake_case -> camelCase response rewrite
// - analysis: lifecycle controller (trigger, poll, terminal states)
//   plus the derived progress/phase view models
// - filters: selection state for the two filtered views and the
//   generation-counted refetch composers
// - session: token storage behind a trait so the client never touches
//   the filesystem directly
// - config: defaults < config file < environment variables

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod filters;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use config::Config;

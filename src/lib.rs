//! Mitti Mitra crop recommendation API library
//!
//! Gathers soil readings from the farmer, fetches current weather for their
//! location, asks an external prediction engine for ranked crops, and returns
//! the combined result as JSON or as a PDF report.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Recommendation pipeline, domain models and errors.
//! - `integrations`: External collaborators (weather API, prediction engine).
//! - `aggregator`: Validation, orchestration and the fallback policy.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `fertilizer`: Rule-based fertilizer advice.
//! - `handlers`: HTTP request handlers.
//! - `models`: Request, domain and engine wire models.
//! - `report`: Report layout and PDF output.
//! - `routes`: Router assembly.
//! - `services`: Weather and prediction engine clients.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod aggregator;
pub mod config;
pub mod errors;
pub mod fertilizer;
pub mod handlers;
pub mod models;
pub mod report;
pub mod routes;
pub mod services;

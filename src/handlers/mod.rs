//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (database queries, validation)
//! 3. Returns HTTP response (JSON, status code)

/// Device registry endpoints
pub mod devices;
/// Dashboard push channel (WebSocket)
pub mod events;
/// Health check endpoint
pub mod health;
/// Scan ingestion endpoint
pub mod scans;
/// Session lifecycle and read endpoints
pub mod sessions;
/// Student registration endpoints
pub mod students;

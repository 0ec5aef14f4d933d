//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Attendance record model
pub mod attendance;
/// Scanner device model
pub mod device;
/// Class session model
pub mod session;
/// Student model
pub mod student;

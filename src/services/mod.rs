//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

pub mod attendance_service;
pub mod device_service;
pub mod scan_service;
pub mod session_service;

pub mod error;
pub mod export;
pub mod rules;
pub mod service;
pub mod summary;

pub use rules::AttendancePolicy;
pub use service::AttendanceService;

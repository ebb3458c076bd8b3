pub mod analyze;
pub mod check_config;

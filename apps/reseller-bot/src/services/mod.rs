pub mod account_service;
pub mod rate_service;

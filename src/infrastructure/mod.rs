pub mod config;
pub mod cycle_api_client;
pub mod error;
pub mod period_day_mapper;
pub mod session_store;

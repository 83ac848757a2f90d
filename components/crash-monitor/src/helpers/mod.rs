pub mod errors;
pub mod load_config;

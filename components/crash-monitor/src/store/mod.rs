pub mod incident_store;
pub mod models;

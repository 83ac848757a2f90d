pub mod table;
pub mod views;

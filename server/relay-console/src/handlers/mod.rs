pub mod accounts;
pub mod audit_logs;
pub mod health;
pub mod profile;
pub mod resources;

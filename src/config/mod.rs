pub mod schema;

pub use schema::MaintenanceConfig;

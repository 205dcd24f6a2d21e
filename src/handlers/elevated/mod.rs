// handlers/elevated/mod.rs - Elevated handlers (staff required)
//
// Non-staff users get 404 so the routes stay invisible to them.
pub mod reports;

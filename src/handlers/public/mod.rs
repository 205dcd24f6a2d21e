// handlers/public/mod.rs - Public handlers (no sign-in required)
//
// Browsing pages, dap pages, reports, user profiles, the login entry points
// and the read-only JSON API.
pub mod account;
pub mod api;
pub mod browse;
pub mod dap;
pub mod report;

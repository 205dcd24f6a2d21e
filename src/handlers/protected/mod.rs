// handlers/protected/mod.rs - Protected handlers (signed-in user required)
//
// Anonymous visitors are redirected to /login/?next=<path>. Handlers then
// check dap or profile permissions and answer with a flash error on failure.
pub mod account;
pub mod admin;
pub mod maintain;
pub mod rank;
pub mod upload;

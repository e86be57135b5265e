pub mod api;
pub mod config;
pub mod endpoints;
pub mod health;
pub mod items;
pub mod orders;
pub mod prometheus;
pub mod router;
pub mod server;
pub mod users;

// Compiled into the library so integration tests can share the seeding
// helpers.
pub mod test_utils;

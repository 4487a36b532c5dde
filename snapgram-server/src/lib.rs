// Library exports for snapgram-server
// The binary and the integration tests both build the app from these modules

pub mod api;
pub mod config;
pub mod credentials;
pub mod db;
pub mod middleware;
pub mod router;
pub mod state;
pub mod uploads;

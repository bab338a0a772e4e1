pub mod auth;
pub mod items;
pub mod metrics;
pub mod transfers;

pub mod audit;
pub mod auth;
pub mod request;
pub mod vehicle;
pub mod workflow;

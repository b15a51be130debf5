pub mod access_policy;
pub mod audit_service;
pub mod auth;
pub mod availability_service;
pub mod fleet_service;
pub mod lifecycle_service;
pub mod status_normalizer;
pub mod workflow_catalog;

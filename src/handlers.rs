pub mod auth;
pub mod bookings;
pub mod fleet;
pub mod onboarding;
pub mod requests;
pub mod workflows;

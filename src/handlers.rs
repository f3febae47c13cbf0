pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod members;
pub mod notifications;
pub mod resources;
pub mod users;

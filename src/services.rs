pub mod auth;
pub mod dashboard_service;
pub mod document_service;
pub mod mailer;
pub mod member_service;
pub mod notification_service;
pub mod rbac_service;
pub mod resource_service;
pub mod setup_token;
pub mod storage;
pub mod user_service;

pub mod assignment_repo;
pub use assignment_repo::AssignmentRepository;
pub mod document_repo;
pub use document_repo::DocumentRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod resource_repo;
pub use resource_repo::{ListFilter, ResourceRepository};
pub mod user_repo;
pub use user_repo::UserRepository;

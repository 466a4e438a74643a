//! Data models for the Elidune portal

pub mod admin_action;
pub mod borrow_request;
pub mod credential;
pub mod health;
pub mod search_history;
pub mod waitlist;

// Re-export commonly used types
pub use admin_action::AdminAction;
pub use borrow_request::{BookId, BorrowRequest, BorrowStatus, UserId};
pub use credential::Credential;
pub use health::{format_storage_size, ComponentStatus, HealthSnapshot};
pub use search_history::SearchHistoryEntry;
pub use waitlist::WaitlistEntry;

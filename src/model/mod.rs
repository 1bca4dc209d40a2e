pub mod conversation;
pub mod message;
pub mod pagination;
pub mod user;

pub use conversation::Conversation;
pub use message::{Attachment, Language, Message, MessageBody, MessagePatch, MessageStatus};
pub use pagination::{ApiEnvelope, Page, PaginationInfo};
pub use user::UserSummary;

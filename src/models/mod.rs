pub mod message;
pub mod user;

pub use message::{Message, MessageResponse, MessageType, NewMessage};
pub use user::UserProfile;

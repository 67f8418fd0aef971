pub mod messages;
pub mod users;

pub use messages::MessageRepository;
pub use users::UserRepository;

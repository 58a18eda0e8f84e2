mod chat;
mod user;

pub use chat::{Chat, ChatView, Group, GroupView};
pub use user::{PublicUser, User};

#[cfg(test)]
pub(crate) use user::sample_user;

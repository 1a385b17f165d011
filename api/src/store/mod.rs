pub mod posts;
pub mod users;

pub use posts::{PostFilter, PostStore};
pub use users::{ProfilePatch, UserStore};

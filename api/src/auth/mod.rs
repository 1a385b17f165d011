pub mod cookie;
pub mod extract;
pub mod guard;
pub mod password;
pub mod session;

pub use extract::{refresh_session, CurrentUser, MaybeUser};
pub use guard::{can_mutate, Decision};
pub use session::{Claims, IssuedSession, SessionManager, SessionSettings};

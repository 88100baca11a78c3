//! Data models shared between the API layer and the repository.

mod aspiration;
mod member;
mod session;

pub use aspiration::*;
pub use member::*;
pub use session::*;

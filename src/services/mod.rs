pub mod session;

pub use session::{ProcessEvent, Session, DEFAULT_PROMPT};

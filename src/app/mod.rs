mod controller;
mod session;

pub use controller::AppController;
pub use session::{ChatSession, CHAT_WORKFLOW};

pub mod handler;
pub mod session;

pub use handler::create_auth_router;
pub use session::{SessionData, SessionService};

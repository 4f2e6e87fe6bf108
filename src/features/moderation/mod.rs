pub mod guard;
pub mod handler;
pub mod middleware;

pub use guard::ModerationGuard;
pub use handler::create_admin_router;
pub use middleware::ban_guard_middleware;

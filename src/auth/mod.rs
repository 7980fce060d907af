pub mod directory;
pub mod router;
pub mod user;

pub use directory::{DEMO_PASSWORD, UserDirectory};
pub use user::{AuthSession, Backend};

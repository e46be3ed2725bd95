//! Storage backends. Services depend on the repository traits only; a
//! backend implements all of them on one handle so multi-entity units of
//! work (event + notifications, password reset + sessions) stay atomic.

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use crate::modules::auth::interface::{BlacklistRepository, RefreshTokenRepository, UserRepository};
use crate::modules::event::interface::EventRepository;
use crate::modules::notification::interface::NotificationRepository;
use crate::modules::password::interface::{OtpRepository, ResetTokenRepository};

pub trait Store:
    UserRepository
    + RefreshTokenRepository
    + BlacklistRepository
    + OtpRepository
    + ResetTokenRepository
    + EventRepository
    + NotificationRepository
{
}

impl<T> Store for T where
    T: UserRepository
        + RefreshTokenRepository
        + BlacklistRepository
        + OtpRepository
        + ResetTokenRepository
        + EventRepository
        + NotificationRepository
{
}

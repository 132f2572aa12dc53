pub mod apple;
pub mod token;

pub use apple::AppleMusicClient;
pub use token::{FallbackToken, WebPlayerToken};

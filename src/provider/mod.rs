pub mod description;
pub mod oauth;
mod traits;
mod types;
pub mod youtube;

pub use oauth::YoutubeAuth;
pub use traits::{Authenticator, PlaylistStore};
pub use types::*;
pub use youtube::YoutubeClient;

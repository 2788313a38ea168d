pub mod auth;
pub mod config;
pub mod edit;
pub mod history;
pub mod items;
pub mod playlists;
pub mod reorder;
pub mod utils;

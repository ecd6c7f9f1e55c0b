//! Taiga credential adapters

pub mod refresher;

pub use refresher::{TaigaTokenRefresher, REFRESH_PATH};

pub mod config_io;
pub mod elevate;
pub mod homes;
pub mod plist_io;
pub mod prefs;
pub mod reload;
pub mod session;
pub mod store;

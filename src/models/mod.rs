pub mod import;
pub mod profile;
pub mod saved_text;
pub mod session;
pub mod settings;

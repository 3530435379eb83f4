pub mod alt_text;
pub mod meta;

pub use alt_text::build_alt_text;

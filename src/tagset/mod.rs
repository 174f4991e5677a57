//! Tags and tagsets: the typing layer carried by annotations.

pub mod property;
pub mod tag;
pub mod tagset;

pub use property::Property;
pub use tag::{Tag, PROP_DISPLAY_COLOR, PROP_MARKUP_AUTHOR};
pub use tagset::Tagset;

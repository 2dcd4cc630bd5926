#![forbid(unsafe_code)]

mod entry;
mod lists;
mod strings;

pub use entry::Entry;
pub use lists::ListStore;
pub use strings::StringStore;

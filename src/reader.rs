pub mod json;
pub use json::Container;
pub use json::Gene;
pub use json::Transcript;

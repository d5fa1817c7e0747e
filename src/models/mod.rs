pub mod api;
pub mod credentials;
pub mod generation;
pub mod image;
pub mod job;

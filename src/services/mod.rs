pub mod credentials;
pub mod export;
pub mod queue;
pub mod whisk;

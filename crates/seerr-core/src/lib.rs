pub mod classify;
pub mod error;
pub mod resolver;
pub mod settings;

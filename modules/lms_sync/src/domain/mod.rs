pub mod error;
pub mod secret;
pub mod service;
pub mod settings;
pub mod validation;

pub mod environment_service;

pub use environment_service::*;

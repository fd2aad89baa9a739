pub mod aas;
pub mod common;
pub mod concept_description;
pub mod entity;
pub mod environment;
pub mod passport;
pub mod shell;
pub mod submodel;
pub mod template;

pub use aas::*;
pub use common::*;
pub use concept_description::*;
pub use entity::*;
pub use environment::*;
pub use passport::*;
pub use shell::*;
pub use submodel::*;
pub use template::*;

pub mod context;
pub mod entity;
pub mod error;
pub mod persona;
pub mod port;
pub mod rate;

pub use context::*;
pub use entity::*;
pub use error::DomainError;
pub use persona::*;
pub use port::*;
pub use rate::*;

//! Request handlers.

pub mod frame;
pub mod health;
pub mod pages;
pub mod stream;

pub use frame::*;
pub use health::*;
pub use pages::*;
pub use stream::*;

mod action_marker;
mod authority;
mod chat;
mod error;
mod event;
mod integration;
mod message;
mod request;
mod session;
mod workflow;

pub use action_marker::*;
pub use authority::*;
pub use chat::*;
pub use error::*;
pub use event::*;
pub use integration::*;
pub use message::*;
pub use request::*;
pub use session::*;
pub use workflow::*;

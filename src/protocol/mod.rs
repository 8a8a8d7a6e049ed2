mod command;
pub mod constants;
mod data;
mod message;

pub use command::*;
pub use constants::*;
pub use data::*;
pub use message::*;

#![forbid(unsafe_code)]

mod command;
mod frame;
mod parse;
mod request;

pub use command::{Arity, COMMAND_TABLE, Command, CommandSpec};
pub use frame::Frame;
pub use parse::Parse;
pub use request::decode_request;

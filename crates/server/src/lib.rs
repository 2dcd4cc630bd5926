#![forbid(unsafe_code)]

pub mod blocking;
mod connection;
pub mod handler;
mod server;

pub use blocking::{ClientId, Coordinator, Delivery};
pub use connection::Connection;
pub use handler::{Dispatcher, Outcome};
pub use server::{Server, ServerConfig};

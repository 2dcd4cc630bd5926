#![forbid(unsafe_code)]

mod error;

pub use error::*;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const MAX_CONNECTIONS: usize = 1024;
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024; // 4 KB
pub const READ_CHUNK_SIZE: usize = 16 * 1024; // 16 KB
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024; // 512 MB
pub const MAX_MULTIBULK_LEN: usize = 1024 * 1024;
/// Teto dos bytes recebidos e ainda não executados por conexão (cabe um bulk máximo).
pub const MAX_QUERY_BUFFER: usize = 1024 * 1024 * 1024; // 1 GB
/// Teto do intervalo entre ticks do reactor, em milissegundos.
pub const DEFAULT_TICK_MS: u64 = 100;

use std::io::{self, Read, Write};

use bytes::{Buf, Bytes, BytesMut};
use mio::net::TcpStream;
use mio::{Interest, Registry, Token};

use tidedb_common::{ConnectionError, INITIAL_BUFFER_CAPACITY, ProtocolError, READ_CHUNK_SIZE};
use tidedb_protocol::{Frame, decode_request};

/// Estado de uma conexão no event loop: socket não bloqueante, bytes recebidos
/// ainda não decodificados e respostas ainda não escritas.
pub struct Connection {
    stream: TcpStream,
    read_buf: BytesMut,
    write_buf: BytesMut,
    /// Parado em BLPOP: os próximos requests ficam no buffer.
    blocked: bool,
    writable_interest: bool,
    max_query_buffer: usize,
}

impl Connection {
    pub fn new(stream: TcpStream, max_query_buffer: usize) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            write_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            blocked: false,
            writable_interest: false,
            max_query_buffer,
        }
    }

    pub fn register(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        registry.register(&mut self.stream, token, Interest::READABLE)
    }

    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.stream)
    }

    /// Lê tudo o que o socket tiver até `WouldBlock`.
    /// Retorna `false` quando o peer fechou a conexão. Passar de
    /// `max_query_buffer` bytes pendentes é erro de protocolo.
    pub fn fill_buffer(&mut self) -> Result<bool, ConnectionError> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.read_buf.extend_from_slice(&chunk[..n]);
                    if self.read_buf.len() > self.max_query_buffer {
                        return Err(ProtocolError::QueryBufferLimit(self.max_query_buffer).into());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Próximo request completo do buffer, se houver.
    pub fn next_request(&mut self) -> Result<Option<Vec<Bytes>>, ProtocolError> {
        decode_request(&mut self.read_buf)
    }

    /// Enfileira uma resposta; só vai para o socket no `flush`.
    pub fn queue(&mut self, frame: &Frame) {
        frame.encode(&mut self.write_buf);
    }

    /// Escreve o que o socket aceitar. O resto espera o próximo evento de escrita.
    pub fn flush(&mut self) -> Result<(), ConnectionError> {
        while !self.write_buf.is_empty() {
            match self.stream.write(&self.write_buf) {
                Ok(0) => return Err(ConnectionError::ConnectionReset),
                Ok(n) => self.write_buf.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Pede evento de escrita só enquanto houver saída pendente.
    pub fn refresh_interest(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        let want_writable = self.has_pending_output();
        if want_writable == self.writable_interest {
            return Ok(());
        }

        let interest = if want_writable {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        registry.reregister(&mut self.stream, token, interest)?;
        self.writable_interest = want_writable;
        Ok(())
    }

    pub fn has_pending_output(&self) -> bool {
        !self.write_buf.is_empty()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }
}

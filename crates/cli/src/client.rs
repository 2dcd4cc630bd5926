use std::io::Cursor;

use anyhow::{Context, bail};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use tidedb_common::{INITIAL_BUFFER_CAPACITY, ProtocolError};
use tidedb_protocol::Frame;

/// Conexão do CLI com o servidor. Bytes além da resposta atual ficam no buffer.
pub struct Client {
    stream: TcpStream,
    buffer: BytesMut,
}

impl Client {
    pub async fn connect(addr: &str) -> anyhow::Result<Client> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("não foi possível conectar a {addr}"))?;
        Ok(Client {
            stream,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        })
    }

    /// Envia um comando e espera a resposta. BLPOP espera o tempo que for.
    pub async fn request(&mut self, args: &[String]) -> anyhow::Result<Frame> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let mut buf = BytesMut::new();
        Frame::array_from_strs(&args).encode(&mut buf);

        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        self.read_frame().await
    }

    async fn read_frame(&mut self) -> anyhow::Result<Frame> {
        loop {
            let mut cursor = Cursor::new(&self.buffer[..]);
            match Frame::check(&mut cursor) {
                Ok(()) => {
                    let len = cursor.position() as usize;
                    cursor.set_position(0);
                    let frame = Frame::parse(&mut cursor).context("resposta inválida")?;
                    self.buffer.advance(len);
                    return Ok(frame);
                }
                Err(ProtocolError::Incomplete) => {}
                Err(e) => bail!("resposta inválida: {e}"),
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                bail!("servidor fechou a conexão");
            }
        }
    }
}

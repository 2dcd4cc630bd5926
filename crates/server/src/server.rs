use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, warn};

use tidedb_common::{
    ConnectionError, DEFAULT_PORT, DEFAULT_TICK_MS, MAX_CONNECTIONS, MAX_QUERY_BUFFER, TideResult,
};
use tidedb_protocol::Frame;

use crate::Connection;
use crate::blocking::{ClientId, Delivery};
use crate::handler::{Dispatcher, Outcome};

const LISTENER: Token = Token(0);
const FIRST_CLIENT_TOKEN: usize = 1;
const EVENTS_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub max_connections: usize,
    /// Espera máxima do poll; garante que o tick dos BLPOPs rode.
    pub tick: Duration,
    /// Bytes pendentes aceitos por conexão antes de derrubá-la.
    pub max_query_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_connections: MAX_CONNECTIONS,
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            max_query_buffer: MAX_QUERY_BUFFER,
        }
    }
}

/// Event loop de uma thread só: listener, conexões e o `Dispatcher`.
pub struct Server {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    connections: HashMap<Token, Connection>,
    dispatcher: Dispatcher,
    config: ServerConfig,
    next_token: usize,
}

impl Server {
    pub fn bind(config: ServerConfig, dispatcher: Dispatcher) -> TideResult<Self> {
        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(config.addr)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            listener,
            connections: HashMap::new(),
            dispatcher,
            config,
            next_token: FIRST_CLIENT_TOKEN,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Roda o loop até um erro fatal de poll.
    pub fn run(&mut self) -> TideResult<()> {
        loop {
            self.poll_once()?;
        }
    }

    /// Uma iteração: espera limitada, eventos, tick dos BLPOPs e entrega das
    /// respostas adiadas. Retorna quantos eventos chegaram.
    pub fn poll_once(&mut self) -> TideResult<usize> {
        let timeout = self.poll_timeout(Instant::now());
        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(e) => return Err(e.into()),
        }

        let ready: Vec<(Token, bool, bool)> = self
            .events
            .iter()
            .map(|event| {
                let readable = event.is_readable() || event.is_read_closed() || event.is_error();
                (event.token(), readable, event.is_writable())
            })
            .collect();

        for &(token, readable, writable) in &ready {
            if token == LISTENER {
                self.accept_connections();
            } else {
                self.handle_connection_event(token, readable, writable);
            }
        }

        self.dispatcher.tick(Instant::now());
        self.route_deliveries();
        Ok(ready.len())
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        match self.dispatcher.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(self.config.tick),
            None => self.config.tick,
        }
    }

    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    if self.connections.len() >= self.config.max_connections {
                        warn!("limite de conexões atingido, recusando {peer}");
                        let mut buf = BytesMut::new();
                        Frame::err("max number of clients reached").encode(&mut buf);
                        if let Err(e) = stream.write_all(&buf) {
                            debug!("falha ao avisar {peer} da recusa: {e}");
                        }
                        continue;
                    }

                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("TCP_NODELAY indisponível para {peer}: {e}");
                    }
                    let token = self.allocate_token();
                    let mut conn = Connection::new(stream, self.config.max_query_buffer);
                    if let Err(e) = conn.register(self.poll.registry(), token) {
                        warn!("falha ao registrar conexão {peer}: {e}");
                        continue;
                    }
                    self.connections.insert(token, conn);
                    debug!("nova conexão: {peer} (cliente {})", token.0);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("erro ao aceitar conexão: {e}");
                    return;
                }
            }
        }
    }

    fn handle_connection_event(&mut self, token: Token, readable: bool, writable: bool) {
        let Some(mut conn) = self.connections.remove(&token) else {
            return;
        };

        let result = self.serve(token, &mut conn, readable, writable);
        self.settle(token, conn, result);
    }

    /// Retorna `Ok(false)` quando o peer fechou.
    fn serve(
        &mut self,
        token: Token,
        conn: &mut Connection,
        readable: bool,
        writable: bool,
    ) -> Result<bool, ConnectionError> {
        let open = if readable { conn.fill_buffer()? } else { true };
        self.process_requests(token, conn)?;
        if writable {
            conn.flush()?;
        }
        Ok(open)
    }

    /// Executa os requests completos do buffer, na ordem, até esgotar ou até
    /// um BLPOP estacionar a conexão.
    fn process_requests(
        &mut self,
        token: Token,
        conn: &mut Connection,
    ) -> Result<(), ConnectionError> {
        let client = ClientId(token.0);
        while !conn.is_blocked() {
            let Some(args) = conn.next_request()? else {
                break;
            };
            match self.dispatcher.dispatch(client, args, Instant::now()) {
                Outcome::Reply(frame) => conn.queue(&frame),
                Outcome::Blocked => conn.set_blocked(true),
            }
        }
        conn.flush()
    }

    /// Devolve a conexão ao mapa ou a fecha, conforme o resultado.
    fn settle(&mut self, token: Token, mut conn: Connection, result: Result<bool, ConnectionError>) {
        match result {
            Ok(true) => match conn.refresh_interest(self.poll.registry(), token) {
                Ok(()) => {
                    self.connections.insert(token, conn);
                }
                Err(e) => {
                    warn!("falha ao atualizar interesse da conexão {}: {e}", token.0);
                    self.close_connection(token, conn);
                }
            },
            Ok(false) => self.close_connection(token, conn),
            Err(ConnectionError::Protocol(e)) => {
                warn!("erro de protocolo na conexão {}: {e}", token.0);
                conn.queue(&Frame::err(ConnectionError::Protocol(e)));
                if let Err(e) = conn.flush() {
                    debug!("erro de protocolo não entregue à conexão {}: {e}", token.0);
                }
                self.close_connection(token, conn);
            }
            Err(e) => {
                warn!("erro na conexão {}: {e}", token.0);
                self.close_connection(token, conn);
            }
        }
    }

    /// Entrega as respostas adiadas. Conexão que sai do BLPOP retoma os
    /// requests que ficaram no buffer, o que pode gerar novas entregas.
    fn route_deliveries(&mut self) {
        loop {
            let deliveries = self.dispatcher.take_deliveries();
            if deliveries.is_empty() {
                return;
            }

            for Delivery { client, frame } in deliveries {
                let token = Token(client.0);
                let Some(mut conn) = self.connections.remove(&token) else {
                    debug!("resposta descartada: cliente {} já saiu", client.0);
                    continue;
                };
                conn.queue(&frame);
                conn.set_blocked(false);
                let result = self.process_requests(token, &mut conn).map(|()| true);
                self.settle(token, conn, result);
            }
        }
    }

    fn close_connection(&mut self, token: Token, mut conn: Connection) {
        if let Err(e) = conn.deregister(self.poll.registry()) {
            debug!("falha ao remover conexão {} do poll: {e}", token.0);
        }
        self.dispatcher.disconnect(ClientId(token.0));
        debug!("conexão encerrada: cliente {}", token.0);
    }

    fn allocate_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token = self.next_token.saturating_add(1);
        token
    }
}

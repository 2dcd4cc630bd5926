use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

use tidedb_common::CommandError;
use tidedb_protocol::{Command, Frame};
use tidedb_storage::{ListStore, StringStore};

use crate::blocking::{ClientId, Coordinator, Delivery};

/// Resultado de executar um request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Resposta imediata, na ordem do request.
    Reply(Frame),
    /// BLPOP estacionado; a resposta chega depois como `Delivery`.
    Blocked,
}

/// Dono de todo o estado do servidor: strings, listas e waiters de BLPOP.
///
/// Uma instância por servidor, acessada só pela thread do event loop.
#[derive(Debug, Default)]
pub struct Dispatcher {
    strings: StringStore,
    lists: ListStore,
    blocking: Coordinator,
    outbox: Vec<Delivery>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve e executa um request já decodificado.
    pub fn dispatch(&mut self, client: ClientId, args: Vec<Bytes>, now: Instant) -> Outcome {
        match Command::from_args(args) {
            Ok(cmd) => {
                debug!("cliente {}: {}", client.0, cmd.name());
                self.execute(client, cmd, now)
            }
            Err(e) => Outcome::Reply(Frame::err(e)),
        }
    }

    /// Executa um comando e retorna a resposta (ou `Blocked`).
    pub fn execute(&mut self, client: ClientId, cmd: Command, now: Instant) -> Outcome {
        let frame = match cmd {
            Command::Ping(msg) => match msg {
                Some(m) => Frame::Bulk(m),
                None => Frame::Simple("PONG".into()),
            },
            Command::Echo(msg) => Frame::Bulk(msg),
            Command::Get(key) => match self.strings.get(&key, now) {
                Some(value) => Frame::Bulk(value),
                None => Frame::Null,
            },
            Command::Set {
                key,
                value,
                expire_ms,
            } => {
                let expires_at = match expire_ms {
                    // PX <= 0: gravado já vencido, o próximo GET não o vê
                    Some(ms) if ms <= 0 => Some(now),
                    Some(ms) => match now.checked_add(Duration::from_millis(ms.unsigned_abs())) {
                        Some(at) => Some(at),
                        None => {
                            return Outcome::Reply(Frame::err(CommandError::InvalidExpireTime(
                                "set".into(),
                            )));
                        }
                    },
                    None => None,
                };
                self.strings.set(key, value, expires_at);
                Frame::Simple("OK".into())
            }
            Command::RPush { key, values } => {
                let len = self.lists.rpush(&key, &values);
                self.blocking.wake(&mut self.lists, &key, &mut self.outbox);
                Frame::Integer(len as i64)
            }
            Command::LPush { key, values } => {
                let len = self.lists.lpush(&key, &values);
                self.blocking.wake(&mut self.lists, &key, &mut self.outbox);
                Frame::Integer(len as i64)
            }
            Command::LRange { key, start, stop } => {
                Frame::array_from_bulks(self.lists.lrange(&key, start, stop))
            }
            Command::LLen(key) => Frame::Integer(self.lists.size(&key) as i64),
            Command::LPop { key, count } => match count {
                Some(n) => Frame::array_from_bulks(self.lists.lpop_many(&key, n)),
                None => match self.lists.lpop(&key) {
                    Some(value) => Frame::Bulk(value),
                    None => Frame::Null,
                },
            },
            Command::BLPop { key, timeout } => {
                // timeout grande demais para somar ao relógio conta como espera infinita
                let deadline = timeout.and_then(|t| now.checked_add(t));
                match self.blocking.blpop(&mut self.lists, &key, client, deadline) {
                    Some(frame) => frame,
                    None => return Outcome::Blocked,
                }
            }
            Command::Unknown(name) => Frame::err(CommandError::Unknown(name)),
        };

        Outcome::Reply(frame)
    }

    /// Expira os BLPOPs vencidos; as respostas vão para o outbox.
    pub fn tick(&mut self, now: Instant) {
        self.blocking.sweep(now, &mut self.outbox);
    }

    /// Conexão fechou: nenhum waiter dela pode sobreviver.
    pub fn disconnect(&mut self, client: ClientId) {
        let removed = self.blocking.remove_client(client);
        if removed > 0 {
            debug!("{removed} BLPOP(s) descartado(s) do cliente {}", client.0);
        }
    }

    /// Retira as respostas adiadas acumuladas até agora.
    pub fn take_deliveries(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.outbox)
    }

    /// Deadline de BLPOP mais próximo, se houver.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.blocking.next_deadline()
    }

    pub fn parked(&self) -> usize {
        self.blocking.parked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ClientId = ClientId(1);
    const B: ClientId = ClientId(2);

    fn run(d: &mut Dispatcher, client: ClientId, args: &[&str], now: Instant) -> Outcome {
        let args = args.iter().map(|a| Bytes::from(a.to_string())).collect();
        d.dispatch(client, args, now)
    }

    fn reply(d: &mut Dispatcher, args: &[&str], now: Instant) -> Frame {
        match run(d, A, args, now) {
            Outcome::Reply(frame) => frame,
            Outcome::Blocked => panic!("unexpected block for {args:?}"),
        }
    }

    fn bulk(s: &str) -> Frame {
        Frame::bulk(s)
    }

    #[test]
    fn ping_and_echo() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert_eq!(reply(&mut d, &["PING"], now), Frame::Simple("PONG".into()));
        assert_eq!(reply(&mut d, &["ping", "hey"], now), bulk("hey"));
        assert_eq!(reply(&mut d, &["ECHO", "hello"], now), bulk("hello"));
    }

    #[test]
    fn set_then_get() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert_eq!(
            reply(&mut d, &["SET", "foo", "bar"], now),
            Frame::Simple("OK".into())
        );
        assert_eq!(reply(&mut d, &["GET", "foo"], now), bulk("bar"));
        assert_eq!(reply(&mut d, &["GET", "missing"], now), Frame::Null);
    }

    #[test]
    fn set_overwrites_and_clears_expiry() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        reply(&mut d, &["SET", "k", "old", "PX", "10"], now);
        reply(&mut d, &["SET", "k", "new"], now);
        assert_eq!(
            reply(&mut d, &["GET", "k"], now + Duration::from_secs(60)),
            bulk("new")
        );
    }

    #[test]
    fn px_expires_on_access() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        reply(&mut d, &["SET", "k", "v", "px", "100"], now);
        assert_eq!(
            reply(&mut d, &["GET", "k"], now + Duration::from_millis(99)),
            bulk("v")
        );
        assert_eq!(
            reply(&mut d, &["GET", "k"], now + Duration::from_millis(100)),
            Frame::Null
        );
    }

    #[test]
    fn set_errors_are_replies() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert_eq!(
            reply(&mut d, &["SET", "k", "v", "NX"], now),
            Frame::Error("ERR syntax error".into())
        );
        assert_eq!(
            reply(&mut d, &["SET", "k", "v", "PX", "soon"], now),
            Frame::Error("ERR value is not an integer or out of range".into())
        );
        assert_eq!(reply(&mut d, &["GET", "k"], now), Frame::Null);
    }

    #[test]
    fn non_positive_px_stores_an_expired_key() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        for px in ["0", "-100"] {
            assert_eq!(
                reply(&mut d, &["SET", "k", "v", "PX", px], now),
                Frame::Simple("OK".into())
            );
            assert_eq!(reply(&mut d, &["GET", "k"], now), Frame::Null);
        }
    }


    #[test]
    fn push_range_len() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert_eq!(
            reply(&mut d, &["RPUSH", "l", "a", "b", "c"], now),
            Frame::Integer(3)
        );
        assert_eq!(reply(&mut d, &["LPUSH", "l", "z"], now), Frame::Integer(4));
        assert_eq!(
            reply(&mut d, &["LRANGE", "l", "0", "-1"], now),
            Frame::array_from_strs(&["z", "a", "b", "c"])
        );
        assert_eq!(
            reply(&mut d, &["LRANGE", "l", "5", "10"], now),
            Frame::Array(vec![])
        );
        assert_eq!(reply(&mut d, &["LLEN", "l"], now), Frame::Integer(4));
        assert_eq!(reply(&mut d, &["LLEN", "nope"], now), Frame::Integer(0));
    }

    #[test]
    fn lpush_prepends_one_at_a_time() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        reply(&mut d, &["LPUSH", "l", "a", "b", "c"], now);
        assert_eq!(
            reply(&mut d, &["LRANGE", "l", "0", "-1"], now),
            Frame::array_from_strs(&["c", "b", "a"])
        );
    }

    #[test]
    fn lpop_with_and_without_count() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        reply(&mut d, &["RPUSH", "l", "a", "b", "c"], now);
        assert_eq!(reply(&mut d, &["LPOP", "l"], now), bulk("a"));
        assert_eq!(
            reply(&mut d, &["LPOP", "l", "5"], now),
            Frame::array_from_strs(&["b", "c"])
        );
        assert_eq!(reply(&mut d, &["LPOP", "l"], now), Frame::Null);
        assert_eq!(reply(&mut d, &["LPOP", "l", "2"], now), Frame::Array(vec![]));
        assert_eq!(reply(&mut d, &["LLEN", "l"], now), Frame::Integer(0));
    }

    #[test]
    fn strings_and_lists_do_not_collide() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        reply(&mut d, &["SET", "k", "v"], now);
        assert_eq!(reply(&mut d, &["RPUSH", "k", "x"], now), Frame::Integer(1));
        assert_eq!(reply(&mut d, &["GET", "k"], now), bulk("v"));
    }

    #[test]
    fn command_errors() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert_eq!(
            reply(&mut d, &["FLY", "away"], now),
            Frame::Error("ERR unknown command 'FLY'".into())
        );
        assert_eq!(
            reply(&mut d, &["GET"], now),
            Frame::Error("ERR wrong number of arguments for 'GET'".into())
        );
        assert_eq!(
            reply(&mut d, &[], now),
            Frame::Error("ERR empty command".into())
        );
        assert_eq!(
            reply(&mut d, &["BLPOP", "l", "soon"], now),
            Frame::Error("ERR timeout is not a float or out of range".into())
        );
    }

    #[test]
    fn blpop_pops_immediately_when_list_has_data() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        reply(&mut d, &["RPUSH", "l", "x"], now);
        assert_eq!(
            reply(&mut d, &["BLPOP", "l", "0"], now),
            Frame::array_from_strs(&["l", "x"])
        );
        assert_eq!(d.parked(), 0);
    }

    #[test]
    fn blpop_is_served_by_a_later_push() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert_eq!(run(&mut d, A, &["BLPOP", "l", "0"], now), Outcome::Blocked);

        assert_eq!(
            run(&mut d, B, &["RPUSH", "l", "x"], now),
            Outcome::Reply(Frame::Integer(1))
        );
        assert_eq!(
            d.take_deliveries(),
            vec![Delivery {
                client: A,
                frame: Frame::array_from_strs(&["l", "x"]),
            }]
        );
        assert!(d.take_deliveries().is_empty());
        assert_eq!(reply(&mut d, &["LLEN", "l"], now), Frame::Integer(0));
    }

    #[test]
    fn blpop_times_out_on_tick() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        assert_eq!(run(&mut d, A, &["BLPOP", "l", "0.05"], now), Outcome::Blocked);
        assert_eq!(d.next_deadline(), Some(now + Duration::from_millis(50)));

        d.tick(now + Duration::from_millis(40));
        assert!(d.take_deliveries().is_empty());

        d.tick(now + Duration::from_millis(50));
        assert_eq!(
            d.take_deliveries(),
            vec![Delivery {
                client: A,
                frame: Frame::NullArray,
            }]
        );
        assert_eq!(d.next_deadline(), None);
    }

    #[test]
    fn disconnect_drops_waiters() {
        let mut d = Dispatcher::new();
        let now = Instant::now();
        run(&mut d, A, &["BLPOP", "l", "0"], now);
        d.disconnect(A);
        assert_eq!(d.parked(), 0);

        reply(&mut d, &["RPUSH", "l", "x"], now);
        assert!(d.take_deliveries().is_empty());
        assert_eq!(reply(&mut d, &["LLEN", "l"], now), Frame::Integer(1));
    }
}

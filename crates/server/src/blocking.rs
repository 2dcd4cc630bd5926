use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use bytes::Bytes;
use tracing::debug;

use tidedb_protocol::Frame;
use tidedb_storage::ListStore;

/// Identificador estável de uma conexão (nunca reutilizado durante a vida do servidor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub usize);

/// Resposta adiada, produzida para um cliente que estava parado em BLPOP.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub client: ClientId,
    pub frame: Frame,
}

#[derive(Debug)]
struct Waiter {
    client: ClientId,
    deadline: Option<Instant>,
}

/// Filas FIFO, por chave, de clientes bloqueados em BLPOP.
///
/// Cada waiter sai da fila exatamente uma vez: atendido por um push, expirado
/// pelo tick ou descartado quando a conexão fecha.
#[derive(Debug, Default)]
pub struct Coordinator {
    waiters: HashMap<String, VecDeque<Waiter>>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// BLPOP: tenta o pop imediato; se a lista está vazia, estaciona o cliente
    /// no fim da fila da chave e retorna `None` (sem resposta por enquanto).
    pub fn blpop(
        &mut self,
        lists: &mut ListStore,
        key: &str,
        client: ClientId,
        deadline: Option<Instant>,
    ) -> Option<Frame> {
        if let Some(value) = lists.lpop(key) {
            return Some(pop_reply(key, value));
        }

        self.waiters
            .entry(key.to_string())
            .or_default()
            .push_back(Waiter { client, deadline });
        debug!("cliente {} bloqueado em '{key}'", client.0);
        None
    }

    /// Chamado depois de RPUSH/LPUSH: atende os waiters da chave em ordem FIFO
    /// enquanto houver elementos.
    pub fn wake(&mut self, lists: &mut ListStore, key: &str, out: &mut Vec<Delivery>) {
        let Some(queue) = self.waiters.get_mut(key) else {
            return;
        };

        while !queue.is_empty() {
            let Some(value) = lists.lpop(key) else {
                break;
            };
            if let Some(waiter) = queue.pop_front() {
                out.push(Delivery {
                    client: waiter.client,
                    frame: pop_reply(key, value),
                });
            }
        }

        if queue.is_empty() {
            self.waiters.remove(key);
        }
    }

    /// Tick: responde null array a todo waiter com `now >= deadline`.
    /// Waiters sem deadline nunca são tocados.
    pub fn sweep(&mut self, now: Instant, out: &mut Vec<Delivery>) {
        self.waiters.retain(|key, queue| {
            queue.retain(|waiter| match waiter.deadline {
                Some(deadline) if now >= deadline => {
                    debug!("BLPOP do cliente {} em '{key}' expirou", waiter.client.0);
                    out.push(Delivery {
                        client: waiter.client,
                        frame: Frame::NullArray,
                    });
                    false
                }
                _ => true,
            });
            !queue.is_empty()
        });
    }

    /// Descarta os waiters de uma conexão que fechou. Retorna quantos saíram.
    pub fn remove_client(&mut self, client: ClientId) -> usize {
        let mut removed = 0;
        self.waiters.retain(|_, queue| {
            let before = queue.len();
            queue.retain(|waiter| waiter.client != client);
            removed += before - queue.len();
            !queue.is_empty()
        });
        removed
    }

    /// Deadline mais próximo entre todos os waiters, para limitar a espera do reactor.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.waiters
            .values()
            .flatten()
            .filter_map(|waiter| waiter.deadline)
            .min()
    }

    /// Total de clientes estacionados.
    pub fn parked(&self) -> usize {
        self.waiters.values().map(VecDeque::len).sum()
    }
}

fn pop_reply(key: &str, value: Bytes) -> Frame {
    Frame::Array(vec![Frame::bulk(key), Frame::Bulk(value)])
}

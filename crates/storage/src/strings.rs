use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use tracing::debug;

use crate::entry::Entry;

/// Mapa chave → string com expiração passiva (checada só no acesso).
#[derive(Debug, Default)]
pub struct StringStore {
    data: HashMap<String, Entry>,
}

impl StringStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert incondicional; substitui qualquer TTL anterior.
    pub fn set(&mut self, key: String, value: Bytes, expires_at: Option<Instant>) {
        self.data.insert(key, Entry::new(value, expires_at));
    }

    /// Retorna o valor, removendo a entrada antes se já expirou.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<Bytes> {
        let entry = self.data.get(key)?;
        if entry.is_expired(now) {
            self.data.remove(key);
            debug!("chave expirada removida: {key}");
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn exists(&mut self, key: &str, now: Instant) -> bool {
        self.get(key, now).is_some()
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    /// Entradas guardadas, incluindo expiradas que ainda não foram acessadas.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

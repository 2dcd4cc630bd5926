use std::collections::{HashMap, VecDeque};

use bytes::Bytes;

/// Mapa chave → lista. Uma lista que esvazia sai do mapa: ausente e vazia
/// são indistinguíveis.
#[derive(Debug, Default)]
pub struct ListStore {
    lists: HashMap<String, VecDeque<Bytes>>,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anexa os valores ao fim, criando a lista se preciso. Retorna o novo tamanho.
    pub fn rpush(&mut self, key: &str, values: &[Bytes]) -> usize {
        let list = self.lists.entry(key.to_string()).or_default();
        list.extend(values.iter().cloned());
        list.len()
    }

    /// Insere cada valor na cabeça, na ordem dos argumentos: `[a, b, c]` vira `c, b, a`.
    pub fn lpush(&mut self, key: &str, values: &[Bytes]) -> usize {
        let list = self.lists.entry(key.to_string()).or_default();
        for v in values {
            list.push_front(v.clone());
        }
        list.len()
    }

    /// Fatia inclusiva `[start, stop]` com índices negativos estilo Redis.
    /// Um índice negativo que continua abaixo de zero vira `0`.
    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> Vec<Bytes> {
        let Some(list) = self.lists.get(key) else {
            return Vec::new();
        };

        match normalize_range(start, stop, list.len()) {
            Some((s, e)) => list.range(s..=e).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn lpop(&mut self, key: &str) -> Option<Bytes> {
        let list = self.lists.get_mut(key)?;
        let value = list.pop_front();
        if list.is_empty() {
            self.lists.remove(key);
        }
        value
    }

    /// Remove até `count` elementos da cabeça. `count <= 0` não remove nada.
    pub fn lpop_many(&mut self, key: &str, count: i64) -> Vec<Bytes> {
        if count <= 0 {
            return Vec::new();
        }
        let Some(list) = self.lists.get_mut(key) else {
            return Vec::new();
        };

        let n = usize::try_from(count).unwrap_or(usize::MAX).min(list.len());
        let removed: Vec<Bytes> = list.drain(..n).collect();
        if list.is_empty() {
            self.lists.remove(key);
        }
        removed
    }

    pub fn size(&self, key: &str) -> usize {
        self.lists.get(key).map_or(0, VecDeque::len)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lists.contains_key(key)
    }
}

fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = i64::try_from(len).unwrap_or(i64::MAX);

    let resolve = |idx: i64| {
        if idx < 0 {
            len.saturating_add(idx).max(0)
        } else {
            idx
        }
    };
    let start = resolve(start);
    let stop = resolve(stop).min(len - 1);

    if start >= len || start > stop {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(items: &[&str]) -> Vec<Bytes> {
        items.iter().map(|s| Bytes::from(s.to_string())).collect()
    }

    #[test]
    fn lpush_rpush() {
        let mut store = ListStore::new();
        assert_eq!(store.rpush("list", &b(&["a", "b"])), 2);
        assert_eq!(store.lpush("list", &b(&["c"])), 3);
        assert_eq!(store.lrange("list", 0, -1), b(&["c", "a", "b"]));
    }

    #[test]
    fn lpush_prepends_in_argument_order() {
        let mut store = ListStore::new();
        store.lpush("list", &b(&["a", "b", "c"]));
        assert_eq!(store.lrange("list", 0, -1), b(&["c", "b", "a"]));
    }

    #[test]
    fn lrange_missing_key() {
        let store = ListStore::new();
        assert!(store.lrange("nope", 0, -1).is_empty());
    }

    #[test]
    fn lrange_negative_indices() {
        let mut store = ListStore::new();
        store.rpush("list", &b(&["a", "b", "c", "d"]));

        assert_eq!(store.lrange("list", -2, -1), b(&["c", "d"]));
        assert_eq!(store.lrange("list", 0, -2), b(&["a", "b", "c"]));
        assert_eq!(store.lrange("list", -100, -1), b(&["a", "b", "c", "d"]));
        // stop negativo fora do range também vira 0
        assert_eq!(store.lrange("list", 0, -100), b(&["a"]));
    }

    #[test]
    fn lrange_out_of_bounds() {
        let mut store = ListStore::new();
        store.rpush("list", &b(&["c", "a", "b"]));

        assert_eq!(store.lrange("list", 0, 100), b(&["c", "a", "b"]));
        assert!(store.lrange("list", 5, 10).is_empty());
        assert!(store.lrange("list", 3, 3).is_empty());
        assert!(store.lrange("list", 2, 1).is_empty());
        assert_eq!(store.lrange("list", i64::MIN, i64::MAX), b(&["c", "a", "b"]));
    }

    #[test]
    fn lpop_removes_key_when_emptied() {
        let mut store = ListStore::new();
        store.rpush("list", &b(&["a", "b"]));

        assert_eq!(store.lpop("list"), Some(Bytes::from("a")));
        assert!(store.contains("list"));
        assert_eq!(store.lpop("list"), Some(Bytes::from("b")));
        assert!(!store.contains("list"));
        assert_eq!(store.lpop("list"), None);
    }

    #[test]
    fn lpop_many_partial_and_full() {
        let mut store = ListStore::new();
        store.rpush("list", &b(&["a", "b", "c"]));

        assert_eq!(store.lpop_many("list", 2), b(&["a", "b"]));
        assert_eq!(store.size("list"), 1);

        assert_eq!(store.lpop_many("list", 2), b(&["c"]));
        assert_eq!(store.size("list"), 0);
        assert!(!store.contains("list"));
    }

    #[test]
    fn lpop_many_non_positive_count() {
        let mut store = ListStore::new();
        store.rpush("list", &b(&["a"]));

        assert!(store.lpop_many("list", 0).is_empty());
        assert!(store.lpop_many("list", -1).is_empty());
        assert!(store.lpop_many("missing", 3).is_empty());
        assert_eq!(store.size("list"), 1);
    }

    #[test]
    fn lrange_returns_a_copy() {
        let mut store = ListStore::new();
        store.rpush("list", &b(&["a", "b"]));
        let snapshot = store.lrange("list", 0, -1);
        store.lpop("list");
        assert_eq!(snapshot, b(&["a", "b"]));
    }
}

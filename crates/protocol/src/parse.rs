use bytes::Bytes;
use tidedb_common::CommandError;

/// Cursor sobre os argumentos de um request para extraí-los sequencialmente.
///
/// A aridade já foi validada pela tabela de comandos; faltar argumento aqui é
/// erro de sintaxe das opções.
pub struct Parse {
    parts: Vec<Bytes>,
    pos: usize,
}

impl Parse {
    pub fn new(parts: Vec<Bytes>) -> Parse {
        Parse { parts, pos: 0 }
    }

    /// Retorna o próximo argumento como String (chaves e nomes de opção).
    pub fn next_string(&mut self) -> Result<String, CommandError> {
        let data = self.next()?;
        String::from_utf8(data.to_vec()).map_err(|_| CommandError::InvalidUtf8)
    }

    /// Retorna o próximo argumento cru.
    pub fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        self.next()
    }

    /// Retorna o próximo argumento como i64.
    pub fn next_int(&mut self) -> Result<i64, CommandError> {
        let data = self.next()?;
        std::str::from_utf8(&data)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(CommandError::NotAnInteger)
    }

    /// Retorna o próximo argumento como f64 finito, com o erro indicado.
    pub fn next_float(&mut self, err: CommandError) -> Result<f64, CommandError> {
        let data = self.next()?;
        std::str::from_utf8(&data)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|f| f.is_finite())
            .ok_or(err)
    }

    /// Consome todos os argumentos restantes.
    pub fn rest(&mut self) -> Vec<Bytes> {
        let rest = self.parts.split_off(self.pos);
        self.pos = self.parts.len();
        rest
    }

    /// Verifica se ainda há argumentos restantes.
    pub fn has_remaining(&self) -> bool {
        self.pos < self.parts.len()
    }

    fn next(&mut self) -> Result<Bytes, CommandError> {
        let part = self.parts.get(self.pos).cloned().ok_or(CommandError::Syntax)?;
        self.pos += 1;
        Ok(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_of(args: &[&str]) -> Parse {
        Parse::new(args.iter().map(|a| Bytes::from(a.to_string())).collect())
    }

    #[test]
    fn parse_extracts_strings() {
        let mut parse = parse_of(&["key", "value"]);
        assert_eq!(parse.next_string().unwrap(), "key");
        assert_eq!(parse.next_bytes().unwrap(), Bytes::from("value"));
        assert!(!parse.has_remaining());
    }

    #[test]
    fn parse_int_rejects_garbage() {
        let mut parse = parse_of(&["-5", "abc"]);
        assert_eq!(parse.next_int().unwrap(), -5);
        assert_eq!(parse.next_int(), Err(CommandError::NotAnInteger));
    }

    #[test]
    fn parse_float_rejects_non_finite() {
        let mut parse = parse_of(&["0.05", "inf", "nope"]);
        assert_eq!(parse.next_float(CommandError::InvalidTimeout).unwrap(), 0.05);
        assert_eq!(
            parse.next_float(CommandError::InvalidTimeout),
            Err(CommandError::InvalidTimeout)
        );
        assert_eq!(
            parse.next_float(CommandError::InvalidTimeout),
            Err(CommandError::InvalidTimeout)
        );
    }

    #[test]
    fn parse_rest_takes_everything_left() {
        let mut parse = parse_of(&["list", "a", "b"]);
        parse.next_string().unwrap();
        assert_eq!(parse.rest(), vec![Bytes::from("a"), Bytes::from("b")]);
        assert!(!parse.has_remaining());
    }

    #[test]
    fn parse_insufficient_args() {
        let mut parse = parse_of(&[]);
        assert_eq!(parse.next_string(), Err(CommandError::Syntax));
    }

    #[test]
    fn parse_invalid_utf8_key() {
        let mut parse = Parse::new(vec![Bytes::from_static(&[0xff, 0xfe])]);
        assert_eq!(parse.next_string(), Err(CommandError::InvalidUtf8));
    }
}

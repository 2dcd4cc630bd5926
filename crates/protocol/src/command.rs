use std::time::Duration;

use bytes::Bytes;
use tidedb_common::CommandError;

use crate::Parse;

/// Restrição de aridade (argumentos depois do nome do comando).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(want) => n == want,
            Arity::Range(min, max) => (min..=max).contains(&n),
            Arity::AtLeast(min) => n >= min,
        }
    }
}

/// Entrada da tabela de comandos: nome canônico, aridade e parser dos argumentos.
pub struct CommandSpec {
    pub name: &'static str,
    pub arity: Arity,
    parse: fn(&mut Parse) -> Result<Command, CommandError>,
}

/// Tabela fechada de comandos suportados.
#[rustfmt::skip]
pub const COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec { name: "PING", arity: Arity::Range(0, 1), parse: parse_ping },
    CommandSpec { name: "ECHO", arity: Arity::Exact(1), parse: parse_echo },
    CommandSpec { name: "SET", arity: Arity::AtLeast(2), parse: parse_set },
    CommandSpec { name: "GET", arity: Arity::Exact(1), parse: parse_get },
    CommandSpec { name: "RPUSH", arity: Arity::AtLeast(2), parse: parse_rpush },
    CommandSpec { name: "LPUSH", arity: Arity::AtLeast(2), parse: parse_lpush },
    CommandSpec { name: "LRANGE", arity: Arity::Exact(3), parse: parse_lrange },
    CommandSpec { name: "LLEN", arity: Arity::Exact(1), parse: parse_llen },
    CommandSpec { name: "LPOP", arity: Arity::Range(1, 2), parse: parse_lpop },
    CommandSpec { name: "BLPOP", arity: Arity::Exact(2), parse: parse_blpop },
];

/// Enum com todos os comandos suportados.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping(Option<Bytes>),
    Echo(Bytes),
    Get(String),
    Set {
        key: String,
        value: Bytes,
        /// TTL relativo (PX) em milissegundos; `<= 0` já nasce expirado.
        expire_ms: Option<i64>,
    },
    RPush {
        key: String,
        values: Vec<Bytes>,
    },
    LPush {
        key: String,
        values: Vec<Bytes>,
    },
    LRange {
        key: String,
        start: i64,
        stop: i64,
    },
    LLen(String),
    LPop {
        key: String,
        count: Option<i64>,
    },
    BLPop {
        key: String,
        /// `None` = espera indefinida.
        timeout: Option<Duration>,
    },
    Unknown(String),
}

impl Command {
    /// Resolve o nome na tabela, valida a aridade e faz o parse dos argumentos.
    pub fn from_args(mut args: Vec<Bytes>) -> Result<Command, CommandError> {
        if args.is_empty() {
            return Err(CommandError::Empty);
        }
        let rest = args.split_off(1);
        let name = String::from_utf8_lossy(&args[0]).to_uppercase();

        let Some(spec) = COMMAND_TABLE.iter().find(|spec| spec.name == name) else {
            return Ok(Command::Unknown(name));
        };
        if !spec.arity.accepts(rest.len()) {
            return Err(CommandError::WrongArity(spec.name.to_string()));
        }

        let mut parse = Parse::new(rest);
        (spec.parse)(&mut parse)
    }

    /// Nome canônico, para logs.
    pub fn name(&self) -> &str {
        match self {
            Command::Ping(_) => "PING",
            Command::Echo(_) => "ECHO",
            Command::Get(_) => "GET",
            Command::Set { .. } => "SET",
            Command::RPush { .. } => "RPUSH",
            Command::LPush { .. } => "LPUSH",
            Command::LRange { .. } => "LRANGE",
            Command::LLen(_) => "LLEN",
            Command::LPop { .. } => "LPOP",
            Command::BLPop { .. } => "BLPOP",
            Command::Unknown(name) => name,
        }
    }
}

fn parse_ping(parse: &mut Parse) -> Result<Command, CommandError> {
    let msg = if parse.has_remaining() {
        Some(parse.next_bytes()?)
    } else {
        None
    };
    Ok(Command::Ping(msg))
}

fn parse_echo(parse: &mut Parse) -> Result<Command, CommandError> {
    Ok(Command::Echo(parse.next_bytes()?))
}

fn parse_get(parse: &mut Parse) -> Result<Command, CommandError> {
    Ok(Command::Get(parse.next_string()?))
}

fn parse_set(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string()?;
    let value = parse.next_bytes()?;
    let mut expire_ms = None;

    while parse.has_remaining() {
        let opt = parse.next_string()?.to_uppercase();
        match opt.as_str() {
            "PX" => expire_ms = Some(parse.next_int()?),
            _ => return Err(CommandError::Syntax),
        }
    }

    Ok(Command::Set {
        key,
        value,
        expire_ms,
    })
}

fn parse_rpush(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string()?;
    Ok(Command::RPush {
        key,
        values: parse.rest(),
    })
}

fn parse_lpush(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string()?;
    Ok(Command::LPush {
        key,
        values: parse.rest(),
    })
}

fn parse_lrange(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string()?;
    let start = parse.next_int()?;
    let stop = parse.next_int()?;
    Ok(Command::LRange { key, start, stop })
}

fn parse_llen(parse: &mut Parse) -> Result<Command, CommandError> {
    Ok(Command::LLen(parse.next_string()?))
}

fn parse_lpop(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string()?;
    let count = if parse.has_remaining() {
        Some(parse.next_int()?)
    } else {
        None
    };
    Ok(Command::LPop { key, count })
}

fn parse_blpop(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string()?;
    let secs = parse.next_float(CommandError::InvalidTimeout)?;
    let timeout = if secs <= 0.0 {
        None
    } else {
        Some(Duration::try_from_secs_f64(secs).map_err(|_| CommandError::InvalidTimeout)?)
    };
    Ok(Command::BLPop { key, timeout })
}

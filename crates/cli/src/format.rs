use tidedb_protocol::Frame;

/// Tokeniza a linha de input com suporte a strings quoted.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    // distingue "" (argumento vazio) de nenhum token
    let mut has_token = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) if c == '\\' => match chars.next() {
                Some('n') => current.push('\n'),
                Some('t') => current.push('\t'),
                Some('r') => current.push('\r'),
                Some(other) => current.push(other),
                None => current.push('\\'),
            },
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                has_token = true;
            }
            None if c.is_whitespace() => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            None => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        tokens.push(current);
    }
    tokens
}

/// Formata uma resposta no estilo do redis-cli.
pub fn format_frame(frame: &Frame) -> String {
    format_nested(frame, 0)
}

fn format_nested(frame: &Frame, indent: usize) -> String {
    match frame {
        Frame::Simple(s) => s.clone(),
        Frame::Error(s) => format!("(error) {s}"),
        Frame::Integer(n) => format!("(integer) {n}"),
        Frame::Bulk(data) => match std::str::from_utf8(data) {
            Ok(s) => format!("\"{}\"", s.escape_debug()),
            Err(_) => format!("(binary) {} bytes", data.len()),
        },
        Frame::Null | Frame::NullArray => "(nil)".to_string(),
        Frame::Array(frames) if frames.is_empty() => "(empty array)".to_string(),
        Frame::Array(frames) => {
            let width = frames.len().to_string().len();
            let pad = " ".repeat(indent);
            frames
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    let prefix = format!("{:>width$}) ", i + 1);
                    let body = format_nested(f, indent + prefix.len());
                    if i == 0 {
                        format!("{prefix}{body}")
                    } else {
                        format!("{pad}{prefix}{body}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_simple() {
        assert_eq!(tokenize("RPUSH list a b"), vec!["RPUSH", "list", "a", "b"]);
    }

    #[test]
    fn tokenize_quoted() {
        assert_eq!(
            tokenize(r#"SET key "hello world""#),
            vec!["SET", "key", "hello world"]
        );
        assert_eq!(
            tokenize("SET key 'hello world'"),
            vec!["SET", "key", "hello world"]
        );
    }

    #[test]
    fn tokenize_escaped() {
        assert_eq!(
            tokenize(r#"ECHO "a\"b\nc""#),
            vec!["ECHO", "a\"b\nc"]
        );
    }

    #[test]
    fn tokenize_keeps_empty_quoted_argument() {
        assert_eq!(tokenize(r#"SET k """#), vec!["SET", "k", ""]);
    }

    #[test]
    fn tokenize_blank_line() {
        assert_eq!(tokenize("   "), Vec::<String>::new());
    }

    #[test]
    fn format_scalars() {
        assert_eq!(format_frame(&Frame::Simple("PONG".into())), "PONG");
        assert_eq!(format_frame(&Frame::Integer(3)), "(integer) 3");
        assert_eq!(format_frame(&Frame::bulk("bar")), "\"bar\"");
        assert_eq!(
            format_frame(&Frame::Error("ERR syntax error".into())),
            "(error) ERR syntax error"
        );
    }

    #[test]
    fn format_nils() {
        assert_eq!(format_frame(&Frame::Null), "(nil)");
        assert_eq!(format_frame(&Frame::NullArray), "(nil)");
        assert_eq!(format_frame(&Frame::Array(vec![])), "(empty array)");
    }

    #[test]
    fn format_blpop_reply() {
        let frame = Frame::array_from_strs(&["queue", "job"]);
        assert_eq!(format_frame(&frame), "1) \"queue\"\n2) \"job\"");
    }

    #[test]
    fn format_aligns_numbers() {
        let items: Vec<String> = (1..=10).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = items.iter().map(String::as_str).collect();
        let out = format_frame(&Frame::array_from_strs(&refs));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], " 1) \"1\"");
        assert_eq!(lines[9], "10) \"10\"");
    }
}

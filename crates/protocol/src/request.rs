use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;
use tidedb_common::{MAX_MULTIBULK_LEN, ProtocolError};

use crate::frame::{bulk_len, get_decimal, get_u8};

/// Tenta extrair um request completo (array de bulk strings) do início do buffer.
///
/// - `Ok(Some(args))`: frame completo; exatamente os bytes consumidos saem da
///   frente do buffer. Os argumentos compartilham a memória do frame, sem cópia.
/// - `Ok(None)`: dados insuficientes; o buffer fica intacto e a chamada pode ser
///   repetida quando chegarem mais bytes.
/// - `Err(_)`: bytes que nunca vão formar um frame válido.
///
/// `*0` e `*-1` viram um request vazio.
pub fn decode_request(buf: &mut BytesMut) -> Result<Option<Vec<Bytes>>, ProtocolError> {
    let (consumed, spans) = match scan_request(&buf[..]) {
        Ok(found) => found,
        Err(ProtocolError::Incomplete) => return Ok(None),
        Err(e) => return Err(e),
    };

    let frame = buf.split_to(consumed).freeze();
    let args = spans
        .into_iter()
        .map(|(start, len)| frame.slice(start..start + len))
        .collect();
    Ok(Some(args))
}

/// Valida um request sem alocar os argumentos. Retorna o tamanho total do frame
/// e a posição `(início, tamanho)` de cada bulk string.
fn scan_request(src: &[u8]) -> Result<(usize, Vec<(usize, usize)>), ProtocolError> {
    let mut cursor = Cursor::new(src);

    let marker = get_u8(&mut cursor)?;
    if marker != b'*' {
        return Err(ProtocolError::InvalidFrameType {
            expected: '*',
            found: marker as char,
        });
    }

    let count = get_decimal(&mut cursor)?;
    if count == 0 || count == -1 {
        return Ok((cursor.position() as usize, Vec::new()));
    }
    if count < 0 || count as usize > MAX_MULTIBULK_LEN {
        return Err(ProtocolError::InvalidMultibulkLength(count));
    }

    // cada elemento ocupa ao menos 4 bytes (`$0\r\n`); o cabeçalho sozinho não reserva memória
    let mut spans = Vec::with_capacity((count as usize).min(src.len() / 4));
    for _ in 0..count {
        let marker = get_u8(&mut cursor)?;
        if marker != b'$' {
            return Err(ProtocolError::InvalidFrameType {
                expected: '$',
                found: marker as char,
            });
        }

        let len = bulk_len(get_decimal(&mut cursor)?)?;
        if cursor.remaining() < len + 2 {
            return Err(ProtocolError::Incomplete);
        }

        let start = cursor.position() as usize;
        if &src[start + len..start + len + 2] != b"\r\n" {
            return Err(ProtocolError::MissingTerminator);
        }
        cursor.set_position((start + len + 2) as u64);
        spans.push((start, len));
    }

    Ok((cursor.position() as usize, spans))
}

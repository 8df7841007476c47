// Meowkov Engine — RESP2 codec
//
// Just enough of the Redis serialization protocol for the corpus commands:
// commands go out as arrays of bulk strings, replies come back as simple
// strings, errors, integers, bulk strings or flat arrays of those.

use crate::atoms::error::{EngineError, EngineResult};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Bulk/simple payload as UTF-8 (lossy); `None` for nil replies.
    pub fn into_string(self) -> EngineResult<Option<String>> {
        match self {
            RespValue::Bulk(Some(bytes)) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            RespValue::Bulk(None) | RespValue::Array(None) => Ok(None),
            RespValue::Simple(s) => Ok(Some(s)),
            other => Err(EngineError::Protocol(format!("expected bulk string, got {:?}", other))),
        }
    }
}

/// `SADD key value` → `*3\r\n$4\r\nSADD\r\n$3\r\nkey\r\n$5\r\nvalue\r\n`
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let payload: usize = args.iter().map(|a| a.len() + 16).sum();
    let mut out = Vec::with_capacity(payload + 16);
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Read one reply. Arrays may only contain scalar values.
pub async fn read_value<R: AsyncBufRead + Unpin>(reader: &mut R) -> EngineResult<RespValue> {
    let (kind, line) = read_header(reader).await?;
    if kind != b'*' {
        return read_scalar(reader, kind, line).await;
    }

    let count = parse_int(&line)?;
    if count < 0 {
        return Ok(RespValue::Array(None));
    }
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (kind, line) = read_header(reader).await?;
        if kind == b'*' {
            return Err(EngineError::Protocol("nested arrays are not supported".into()));
        }
        items.push(read_scalar(reader, kind, line).await?);
    }
    Ok(RespValue::Array(Some(items)))
}

async fn read_header<R: AsyncBufRead + Unpin>(reader: &mut R) -> EngineResult<(u8, String)> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    if !buf.ends_with(b"\r\n") || buf.len() < 3 {
        return Err(EngineError::Protocol(format!(
            "malformed reply line: {:?}",
            String::from_utf8_lossy(&buf)
        )));
    }
    let kind = buf[0];
    let line = String::from_utf8_lossy(&buf[1..buf.len() - 2]).into_owned();
    Ok((kind, line))
}

async fn read_scalar<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    kind: u8,
    line: String,
) -> EngineResult<RespValue> {
    match kind {
        b'+' => Ok(RespValue::Simple(line)),
        b'-' => Ok(RespValue::Error(line)),
        b':' => Ok(RespValue::Integer(parse_int(&line)?)),
        b'$' => {
            let len = parse_int(&line)?;
            if len < 0 {
                return Ok(RespValue::Bulk(None));
            }
            let mut data = vec![0u8; len as usize + 2];
            reader.read_exact(&mut data).await?;
            if !data.ends_with(b"\r\n") {
                return Err(EngineError::Protocol("bulk string not terminated by CRLF".into()));
            }
            data.truncate(len as usize);
            Ok(RespValue::Bulk(Some(data)))
        }
        other => Err(EngineError::Protocol(format!("unknown reply type byte {:?}", other as char))),
    }
}

fn parse_int(line: &str) -> EngineResult<i64> {
    line.trim()
        .parse::<i64>()
        .map_err(|e| EngineError::Protocol(format!("bad integer {:?}: {}", line, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn decode(data: &[u8]) -> EngineResult<RespValue> {
        let mut reader = BufReader::new(data);
        read_value(&mut reader).await
    }

    #[test]
    fn encodes_command_as_bulk_array() {
        let out = encode_command(&[b"SADD", b"a\x02b", b"c"]);
        assert_eq!(out, b"*3\r\n$4\r\nSADD\r\n$3\r\na\x02b\r\n$1\r\nc\r\n".to_vec());
    }

    #[tokio::test]
    async fn decodes_simple_and_error() {
        assert_eq!(decode(b"+OK\r\n").await.unwrap(), RespValue::Simple("OK".into()));
        assert_eq!(
            decode(b"-ERR unknown command\r\n").await.unwrap(),
            RespValue::Error("ERR unknown command".into())
        );
    }

    #[tokio::test]
    async fn decodes_integer() {
        assert_eq!(decode(b":1\r\n").await.unwrap(), RespValue::Integer(1));
    }

    #[tokio::test]
    async fn decodes_bulk_and_nil() {
        assert_eq!(
            decode(b"$5\r\nhe\r\nl\r\n").await.unwrap(),
            RespValue::Bulk(Some(b"he\r\nl".to_vec()))
        );
        assert_eq!(decode(b"$-1\r\n").await.unwrap(), RespValue::Bulk(None));
        assert_eq!(decode(b"$-1\r\n").await.unwrap().into_string().unwrap(), None);
    }

    #[tokio::test]
    async fn decodes_flat_array() {
        let v = decode(b"*2\r\n$1\r\na\r\n$2\r\nbc\r\n").await.unwrap();
        assert_eq!(
            v,
            RespValue::Array(Some(vec![
                RespValue::Bulk(Some(b"a".to_vec())),
                RespValue::Bulk(Some(b"bc".to_vec())),
            ]))
        );
        assert_eq!(decode(b"*-1\r\n").await.unwrap(), RespValue::Array(None));
    }

    #[tokio::test]
    async fn rejects_garbage() {
        assert!(matches!(decode(b"?what\r\n").await, Err(EngineError::Protocol(_))));
        assert!(matches!(decode(b"+OK\n").await, Err(EngineError::Protocol(_))));
        assert!(matches!(decode(b"*1\r\n*0\r\n").await, Err(EngineError::Protocol(_))));
        assert!(matches!(decode(b"").await, Err(EngineError::Io(_))));
    }
}

//! Parses inbound response header blocks and dispatches on status and
//! `Result-Type`: read a fixed framing unit, then branch on a small set of
//! discriminants to build the typed result the caller actually wants.

use crate::conn::transport::Transport;
use crate::error::{FourDError, FourDResult};
use crate::protocol::value::{self, Value, ValueKind};
use byteorder::{LittleEndian, ReadBytesExt};

/// The parsed header block of one response, with base64 values already
/// decoded and header names already stripped of any `-Base64` suffix.
pub(crate) struct ResponseHeader {
    pub(crate) status_code: i32,
    pub(crate) fields: Vec<(String, String)>,
}

impl ResponseHeader {
    fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, name: &str) -> FourDResult<&str> {
        self.get(name).ok_or_else(|| {
            FourDError::operational(format!("response is missing header {name}"))
        })
    }
}

/// Reads and parses the status line plus `Name: value` header lines up to
/// the blank-line terminator. CRLF is normalized to LF before splitting.
pub(crate) fn read_header(transport: &mut Transport) -> FourDResult<ResponseHeader> {
    let raw = transport.recv_header()?;
    let text = String::from_utf8_lossy(&raw).replace("\r\n", "\n");
    let mut lines = text.split('\n').filter(|l| !l.is_empty());
    let status_line = lines.next().ok_or_else(|| {
        FourDError::operational("empty response header")
    })?;
    let mut parts = status_line.split_whitespace();
    let _statement_code = parts.next();
    let status_code: i32 = parts
        .next()
        .ok_or_else(|| FourDError::operational("missing status code"))?
        .parse()
        .map_err(|_| FourDError::operational("non-numeric status code"))?;

    let mut fields = Vec::new();
    for line in lines {
        let (name, value) = line.split_once(':').ok_or_else(|| {
            FourDError::operational(format!("malformed header line: {line}"))
        })?;
        let name = name.trim();
        let value = value.trim();
        if let Some(stripped) = name.strip_suffix("-Base64") {
            let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, value)
                .map_err(|e| {
                    FourDError::operational(format!("invalid base64 in header {name}: {e}"))
                })?;
            let decoded = String::from_utf8(decoded).map_err(|e| {
                FourDError::operational(format!("non-UTF-8 base64 header {name}: {e}"))
            })?;
            fields.push((stripped.to_string(), decoded));
        } else {
            fields.push((name.to_string(), value.to_string()));
        }
    }
    Ok(ResponseHeader {
        status_code,
        fields,
    })
}

/// If the header reports a non-OK status, builds and returns the
/// corresponding [`FourDError::ServerError`].
pub(crate) fn check_status(header: &ResponseHeader) -> FourDResult<()> {
    const OK: i32 = 0;
    if header.status_code == OK {
        return Ok(());
    }
    let code = header.get("Error-Code").unwrap_or("").to_string();
    let component_code = header.get("Error-Component-Code").unwrap_or("").to_string();
    let description = header.get("Error-Description").unwrap_or("").to_string();
    Err(FourDError::ServerError {
        code,
        component_code,
        description,
    })
}

/// Like [`check_status`], but for `LOGIN`: a non-OK status builds a
/// structured [`FourDError::OperationalError`] carrying the same
/// `Error-Code`/`Error-Component-Code`/`Error-Description` fields, since a
/// failed login is an operational failure (the caller never gets a usable
/// connection), not a mid-session server error.
pub(crate) fn check_login_status(header: &ResponseHeader) -> FourDResult<()> {
    const OK: i32 = 0;
    if header.status_code == OK {
        return Ok(());
    }
    let code = header.get("Error-Code").unwrap_or("").to_string();
    let component_code = header.get("Error-Component-Code").unwrap_or("").to_string();
    let description = header.get("Error-Description").unwrap_or("").to_string();
    Err(FourDError::login_failed(code, component_code, description))
}

/// One column's metadata, decoded from `Column-Aliases`/`Column-Types`/
/// `Column-Updateability`.
#[derive(Clone, Debug)]
pub(crate) struct ColumnMeta {
    pub(crate) name: String,
    pub(crate) kind: ValueKind,
    pub(crate) updatable: bool,
}

/// The outcome of parsing an `EXECUTE-STATEMENT`/`FETCH-RESULT` response
/// header: either a described result set (with its piggybacked first page
/// still to be read) or a plain update count.
pub(crate) enum ExecuteOutcome {
    ResultSet {
        statement_id: i64,
        columns: Vec<ColumnMeta>,
        row_count: i64,
        row_count_sent: i64,
    },
    UpdateCount,
}

fn parse_bracketed_list(raw: &str) -> Vec<String> {
    raw.split(']')
        .filter_map(|chunk| chunk.trim().strip_prefix('['))
        .map(str::to_string)
        .collect()
}

/// Classifies an already-read header as a result-set or update-count
/// response, per the `Result-Type` discriminant.
pub(crate) fn classify_execute(header: &ResponseHeader) -> FourDResult<ExecuteOutcome> {
    check_status(header)?;
    match header.get("Result-Type") {
        Some("Result-Set") => {
            let statement_id: i64 = header.require("Statement-ID")?.parse().map_err(|_| {
                FourDError::operational("non-numeric Statement-ID")
            })?;
            let names = parse_bracketed_list(header.require("Column-Aliases")?);
            let types: Vec<&str> = header.require("Column-Types")?.split_whitespace().collect();
            let updatability: Vec<&str> = header
                .require("Column-Updateability")?
                .split_whitespace()
                .collect();
            if names.len() != types.len() || names.len() != updatability.len() {
                return Err(FourDError::operational(
                    "column metadata headers have mismatched lengths",
                ));
            }
            let mut columns = Vec::with_capacity(names.len());
            for ((name, ty), upd) in names.into_iter().zip(types).zip(updatability) {
                columns.push(ColumnMeta {
                    name,
                    kind: ValueKind::parse(ty)?,
                    updatable: upd == "Y",
                });
            }
            let row_count: i64 = header.require("Row-Count")?.parse().map_err(|_| {
                FourDError::operational("non-numeric Row-Count")
            })?;
            let row_count_sent: i64 = header.require("Row-Count-Sent")?.parse().map_err(|_| {
                FourDError::operational("non-numeric Row-Count-Sent")
            })?;
            Ok(ExecuteOutcome::ResultSet {
                statement_id,
                columns,
                row_count,
                row_count_sent,
            })
        }
        Some("Update-Count") => Ok(ExecuteOutcome::UpdateCount),
        other => Err(FourDError::operational(format!(
            "unrecognized Result-Type: {other:?}"
        ))),
    }
}

/// Reads the single `VK_LONG8` affected-row count that follows an
/// `Update-Count` header, preceded by one discarded status byte.
pub(crate) fn read_update_count(transport: &mut Transport) -> FourDResult<i64> {
    let _status_byte = transport.recv_u8()?;
    let bytes = transport.recv_exact(8)?;
    Ok((&bytes[..]).read_i64::<LittleEndian>()?)
}

/// Reads one row in column order. If `updatable` is set, a leading status
/// byte and `VK_LONG` row-id precede the per-column cells.
pub(crate) fn read_row(
    transport: &mut Transport,
    columns: &[ColumnMeta],
    updatable: bool,
) -> FourDResult<(Option<i64>, Vec<Value>)> {
    let row_id = if updatable {
        let _status = transport.recv_u8()?;
        let bytes = transport.recv_exact(4)?;
        Some(i64::from((&bytes[..]).read_i32::<LittleEndian>()?))
    } else {
        None
    };
    let mut cells = Vec::with_capacity(columns.len());
    for column in columns {
        let status = transport.recv_u8()?;
        let cell = match status {
            0 => Value::Null,
            1 => value::decode(column.kind, transport)?,
            2 => {
                let bytes = transport.recv_exact(8)?;
                let code = (&bytes[..]).read_i64::<LittleEndian>()?;
                return Err(FourDError::DataError(format!(
                    "server reported per-cell error {code} in column {}",
                    column.name
                )));
            }
            other => {
                return Err(FourDError::operational(format!(
                    "unrecognized cell status byte: {other}"
                )))
            }
        };
        cells.push(cell);
    }
    Ok((row_id, cells))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bracketed_list_splits_names() {
        assert_eq!(
            parse_bracketed_list("[a] [b] [c]"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn check_status_ok_passes() {
        let header = ResponseHeader {
            status_code: 0,
            fields: vec![],
        };
        assert!(check_status(&header).is_ok());
    }

    #[test]
    fn check_status_error_builds_server_error() {
        let header = ResponseHeader {
            status_code: 1000,
            fields: vec![
                ("Error-Code".to_string(), "1000".to_string()),
                ("Error-Component-Code".to_string(), "42".to_string()),
                ("Error-Description".to_string(), "bad credentials".to_string()),
            ],
        };
        match check_status(&header) {
            Err(FourDError::ServerError {
                code, description, ..
            }) => {
                assert_eq!(code, "1000");
                assert_eq!(description, "bad credentials");
            }
            other => panic!("expected ServerError, got {other:?}"),
        }
    }
}

//! Builds outbound command frames: a status line, zero or more header
//! parameters (some base64-wrapped), an optional suffix line, and an
//! optional binary payload.

use crate::protocol::value::ValueKind;
use base64::Engine;

const CRLF: &[u8] = b"\r\n";

/// A single outbound command: `<id> <text>\r\n` followed by headers, an
/// optional suffix line, a blank line, and an optional binary payload.
pub(crate) struct Command {
    id: u16,
    text: &'static str,
    headers: Vec<(String, String)>,
    suffix: Option<String>,
    payload: Vec<u8>,
}

impl Command {
    fn new(id: u16, text: &'static str) -> Self {
        Self {
            id,
            text,
            headers: Vec::new(),
            suffix: None,
            payload: Vec::new(),
        }
    }

    /// Adds a plain-text header. If `name` ends in `-BASE64`, `value` is
    /// base64-encoded and the `-BASE64` suffix stays on the wire name.
    fn header(mut self, name: &str, value: &str) -> Self {
        let rendered = if name.ends_with("-BASE64") {
            base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
        } else {
            value.to_string()
        };
        self.headers.push((name.to_string(), rendered));
        self
    }

    fn header_bool(self, name: &str, value: bool) -> Self {
        self.header(name, if value { "Y" } else { "N" })
    }

    fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Serializes the command to its wire representation.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(format!("{:03} {}", self.id, self.text).as_bytes());
        out.extend_from_slice(CRLF);
        for (name, value) in &self.headers {
            out.extend_from_slice(format!("{name}: {value}").as_bytes());
            out.extend_from_slice(CRLF);
        }
        if let Some(suffix) = &self.suffix {
            out.extend_from_slice(suffix.as_bytes());
            out.extend_from_slice(CRLF);
        }
        out.extend_from_slice(CRLF);
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Builds the `LOGIN` command (id 1), choosing the base64 header variant
/// per [`crate::config::login_use_base64`].
pub(crate) fn login(user: &str, password: &str, image_type: &str, use_base64: bool) -> Command {
    let (user_name_key, password_key) = if use_base64 {
        ("USER-NAME-BASE64", "USER-PASSWORD-BASE64")
    } else {
        ("USER-NAME", "USER-PASSWORD")
    };
    Command::new(1, "LOGIN")
        .header(user_name_key, user)
        .header(password_key, password)
        .header_bool("REPLY-WITH-BASE64-TEXT", true)
        .header("PREFERRED-IMAGE-TYPES", image_type)
        .suffix("PROTOCOL-VERSION: 13.0")
}

pub(crate) fn logout() -> Command {
    Command::new(4, "LOGOUT")
}

pub(crate) fn quit() -> Command {
    Command::new(5, "QUIT")
}

/// A bound parameter, ready to be written into a statement command's
/// `PARAMETER-TYPES` header and binary payload.
pub(crate) struct BoundParam<'a> {
    pub(crate) kind: ValueKind,
    pub(crate) encoded: Option<&'a [u8]>,
}

fn parameter_types_header(params: &[BoundParam<'_>]) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    Some(
        params
            .iter()
            .map(|p| p.kind.name())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn parameter_payload(params: &[BoundParam<'_>]) -> Vec<u8> {
    let mut payload = Vec::new();
    for param in params {
        match param.encoded {
            Some(bytes) => {
                payload.push(1);
                payload.extend_from_slice(bytes);
            }
            None => payload.push(0),
        }
    }
    payload
}

/// Builds `PREPARE-STATEMENT` (id 3).
pub(crate) fn prepare_statement(
    statement: &str,
    params: &[BoundParam<'_>],
    use_base64: bool,
) -> Command {
    let statement_key = if use_base64 {
        "STATEMENT-BASE64"
    } else {
        "STATEMENT"
    };
    let mut cmd = Command::new(3, "PREPARE-STATEMENT").header(statement_key, statement);
    if let Some(types) = parameter_types_header(params) {
        cmd = cmd.header("PARAMETER-TYPES", &types);
    }
    cmd.payload(parameter_payload(params))
}

/// Builds `EXECUTE-STATEMENT` (id 3) with `FIRST-PAGE-SIZE`,
/// `OUTPUT-MODE: Release` and `FULL-ERROR-STACK: Y`.
pub(crate) fn execute_statement(
    statement: &str,
    params: &[BoundParam<'_>],
    first_page_size: u32,
    use_base64: bool,
) -> Command {
    let statement_key = if use_base64 {
        "STATEMENT-BASE64"
    } else {
        "STATEMENT"
    };
    let mut cmd = Command::new(3, "EXECUTE-STATEMENT").header(statement_key, statement);
    if let Some(types) = parameter_types_header(params) {
        cmd = cmd.header("PARAMETER-TYPES", &types);
    }
    cmd.header("FIRST-PAGE-SIZE", &first_page_size.to_string())
        .header("OUTPUT-MODE", "Release")
        .header_bool("FULL-ERROR-STACK", true)
        .payload(parameter_payload(params))
}

/// Builds `FETCH-RESULT` (id 123) for a page `[first_row, last_row]` (inclusive).
pub(crate) fn fetch_result(statement_id: i64, first_row: i64, last_row: i64) -> Command {
    Command::new(123, "FETCH-RESULT")
        .header("STATEMENT-ID", &statement_id.to_string())
        .header("COMMAND-INDEX", "0")
        .header("FIRST-ROW-INDEX", &first_row.to_string())
        .header("LAST-ROW-INDEX", &last_row.to_string())
        .header("OUTPUT-MODE", "Release")
        .header_bool("FULL-ERROR-STACK", true)
}

/// Builds `CLOSE-STATEMENT` (id 0).
pub(crate) fn close_statement(statement_id: i64) -> Command {
    Command::new(0, "CLOSE-STATEMENT").header("STATEMENT-ID", &statement_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_frame_matches_scenario() {
        let cmd = login("alice", "secret", "png", false);
        let bytes = cmd.to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("001 LOGIN\r\n"));
        assert!(text.contains("USER-NAME: alice\r\n"));
        assert!(text.contains("USER-PASSWORD: secret\r\n"));
        assert!(text.contains("REPLY-WITH-BASE64-TEXT: Y\r\n"));
        assert!(text.contains("PREFERRED-IMAGE-TYPES: png\r\n"));
        assert!(text.contains("PROTOCOL-VERSION: 13.0\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn login_base64_wraps_credentials() {
        let cmd = login("alice", "secret", "png", true);
        let text = String::from_utf8(cmd.to_bytes()).unwrap();
        let expect_user = base64::engine::general_purpose::STANDARD.encode("alice");
        assert!(text.contains(&format!("USER-NAME-BASE64: {expect_user}\r\n")));
    }

    #[test]
    fn execute_statement_carries_parameter_types_and_payload() {
        let encoded = [7_i64.to_le_bytes()].concat();
        let params = vec![BoundParam {
            kind: ValueKind::Long8,
            encoded: Some(&encoded),
        }];
        let cmd = execute_statement("SELECT a,b FROM t WHERE id = ?", &params, 100, false);
        let bytes = cmd.to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("PARAMETER-TYPES: VK_LONG8\r\n"));
        assert!(text.contains("FIRST-PAGE-SIZE: 100\r\n"));
        assert!(text.contains("OUTPUT-MODE: Release\r\n"));
        assert!(text.contains("FULL-ERROR-STACK: Y\r\n"));
        assert!(bytes.ends_with(&[1, 7, 0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn null_parameter_encodes_as_zero_byte() {
        let params = vec![BoundParam {
            kind: ValueKind::Unknown,
            encoded: None,
        }];
        assert_eq!(parameter_payload(&params), vec![0]);
    }

    #[test]
    fn fetch_result_has_expected_headers() {
        let cmd = fetch_result(42, 100, 199);
        let text = String::from_utf8(cmd.to_bytes()).unwrap();
        assert!(text.starts_with("123 FETCH-RESULT\r\n"));
        assert!(text.contains("STATEMENT-ID: 42\r\n"));
        assert!(text.contains("FIRST-ROW-INDEX: 100\r\n"));
        assert!(text.contains("LAST-ROW-INDEX: 199\r\n"));
    }
}

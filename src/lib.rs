//! A pure-Rust driver for the 4D database server's text-framed
//! command/response wire protocol.
//!
//! ```no_run
//! use fourd::{connect, rewriter::Params};
//!
//! let conn = connect(Some("host=localhost;user=me;password=secret"), None, None, None, None, None)?;
//! let mut cursor = conn.cursor();
//! cursor.execute("SELECT a, b FROM t WHERE id = ?", &Params::Positional(vec![1_i64.into()]))?;
//! for row in cursor {
//!     let row = row?;
//!     println!("{row:?}");
//! }
//! # Ok::<(), fourd::FourDError>(())
//! ```

pub mod config;
mod conn;
mod connection;
mod cursor;
mod protocol;
pub mod rewriter;

mod error;

pub use conn::params::ConnectParams;
pub use connection::{connect, Connection};
pub use cursor::result::Column;
pub use cursor::Cursor;
pub use error::{FourDError, FourDResult};
pub use protocol::value::{Value, ValueKind};
pub use rewriter::{Param, Params};

//! The buffered row state behind a [`crate::cursor::Cursor`]: column
//! metadata plus whatever rows have already been read off the wire.
//!
//! A plain owned buffer: there is no async streaming or server-side cursor
//! holdability to manage here.

use crate::protocol::response::ColumnMeta;
use crate::protocol::value::Value;
use std::collections::VecDeque;

/// One column's descriptor, as surfaced through [`crate::Cursor::description`].
#[derive(Clone, Debug)]
pub struct Column {
    pub name: String,
    pub host_type: &'static str,
}

/// The outcome of the most recently executed statement on a cursor.
pub(crate) enum ResultState {
    /// A `SELECT`-shaped response: columns plus a row buffer that may
    /// still need paging in from the server.
    Rows(RowResult),
    /// A DML response: only an affected-row count.
    UpdateCount(i64),
}

pub(crate) struct RowResult {
    pub(crate) statement_id: i64,
    pub(crate) columns: Vec<ColumnMeta>,
    pub(crate) updatable: bool,
    pub(crate) row_count: i64,
    pub(crate) buffer: VecDeque<Vec<Value>>,
    pub(crate) next_unfetched_row: i64,
}

impl RowResult {
    pub(crate) fn new(statement_id: i64, columns: Vec<ColumnMeta>, row_count: i64) -> Self {
        let updatable = columns.iter().any(|c| c.updatable);
        Self {
            statement_id,
            columns,
            updatable,
            row_count,
            buffer: VecDeque::new(),
            next_unfetched_row: 0,
        }
    }

    pub(crate) fn has_more_on_server(&self) -> bool {
        self.next_unfetched_row < self.row_count
    }

    pub(crate) fn description(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                host_type: c.kind.host_type_name(),
            })
            .collect()
    }
}

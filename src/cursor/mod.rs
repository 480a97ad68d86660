//! The application-facing statement handle: execute, fetch, and describe.
//!
//! Prepare, execute and fetch are collapsed into one type: this protocol's
//! prepare/execute/fetch triad is always driven by a single statement id
//! rather than split across a statement handle and a detachable result set.

pub mod result;

use crate::connection::{Connection, StatementOutcome};
use crate::error::{FourDError, FourDResult};
use crate::protocol::value::Value;
use crate::rewriter::Params;
use result::{Column, ResultState, RowResult};

/// Default `fetchmany` batch size, absent an explicit `size` argument or a
/// cursor-level override.
const DEFAULT_ARRAY_SIZE: i64 = 1;

/// A statement handle bound to one [`Connection`]: execute a query, then
/// fetch its rows or read its affected-row count.
pub struct Cursor {
    connection: Connection,
    prepared_for: Option<String>,
    result: Option<ResultState>,
    row_number: i64,
    /// Server-side first-page hint (`FIRST-PAGE-SIZE`/`FETCH-RESULT` window
    /// size); distinct from `array_size`, which only governs `fetchmany`'s
    /// default batch size.
    page_size: i64,
    array_size: i64,
    closed: bool,
}

impl Cursor {
    pub(crate) fn new(connection: Connection) -> Self {
        let page_size = connection.default_res_size();
        Self {
            connection,
            prepared_for: None,
            result: None,
            row_number: 0,
            page_size,
            array_size: DEFAULT_ARRAY_SIZE,
            closed: false,
        }
    }

    /// The server-side first-page/fetch-window size. Default 100.
    #[must_use]
    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn set_page_size(&mut self, value: i64) {
        self.page_size = value;
    }

    /// The default batch size `fetchmany` uses when called with no explicit
    /// `size`. Default 1.
    #[must_use]
    pub fn array_size(&self) -> i64 {
        self.array_size
    }

    pub fn set_array_size(&mut self, value: i64) {
        self.array_size = value;
    }

    fn check_open(&self) -> FourDResult<()> {
        if self.closed {
            return Err(FourDError::interface("cursor is closed"));
        }
        Ok(())
    }

    /// Executes `query` with the given bound parameters.
    ///
    /// Re-prepares only when the rewritten query text differs from what
    /// this cursor last prepared; the server-held statement is reused
    /// across repeated calls with the same query.
    pub fn execute(&mut self, query: &str, params: &Params) -> FourDResult<()> {
        self.check_open()?;
        let (rewritten, values) = crate::rewriter::rewrite(query, params)?;
        self.run(&rewritten, &values)
    }

    /// Executes `query` once per entry in `params_seq`, preparing only
    /// once. Clears the prepared-query cache afterward: a one-shot
    /// prepare-for-a-batch, not a persistent cache across calls.
    pub fn executemany(&mut self, query: &str, params_seq: &[Params]) -> FourDResult<()> {
        self.check_open()?;
        for params in params_seq {
            let (rewritten, values) = crate::rewriter::rewrite(query, params)?;
            self.run(&rewritten, &values)?;
        }
        self.prepared_for = None;
        Ok(())
    }

    fn run(&mut self, rewritten: &str, values: &[Value]) -> FourDResult<()> {
        if self.prepared_for.as_deref() != Some(rewritten) {
            self.connection.prepare_on_core(rewritten, values)?;
            self.prepared_for = Some(rewritten.to_string());
        }
        let outcome = self
            .connection
            .execute_on_core(rewritten, values, self.page_size as u32)?;
        self.row_number = 0;
        self.result = Some(match outcome {
            StatementOutcome::ResultSet {
                statement_id,
                columns,
                row_count,
                rows_fetched,
                rows,
            } => {
                let mut row_result = RowResult::new(statement_id, columns, row_count);
                row_result.next_unfetched_row = rows_fetched;
                row_result.buffer.extend(rows);
                ResultState::Rows(row_result)
            }
            StatementOutcome::UpdateCount(count) => ResultState::UpdateCount(count),
        });
        Ok(())
    }

    /// Column metadata for the current result: `(name, host-type-name)`
    /// pairs, one per column.
    #[must_use]
    pub fn description(&self) -> Option<Vec<Column>> {
        match &self.result {
            Some(ResultState::Rows(r)) => Some(r.description()),
            _ => None,
        }
    }

    /// The server-declared row count for a result set, the affected-row
    /// count for an update, or `-1` if no statement has been executed yet.
    #[must_use]
    pub fn rowcount(&self) -> i64 {
        match &self.result {
            Some(ResultState::Rows(r)) => r.row_count,
            Some(ResultState::UpdateCount(n)) => *n,
            None => -1,
        }
    }

    /// The index of the next row to be fetched, or `None` if the current
    /// result is not a result set (or there is none).
    #[must_use]
    pub fn rownumber(&self) -> Option<i64> {
        match &self.result {
            Some(ResultState::Rows(_)) => Some(self.row_number),
            _ => None,
        }
    }

    fn refill_if_empty(&mut self) -> FourDResult<()> {
        let Some(ResultState::Rows(row_result)) = &mut self.result else {
            return Ok(());
        };
        if !row_result.buffer.is_empty() || !row_result.has_more_on_server() {
            return Ok(());
        }
        let first_row = row_result.next_unfetched_row;
        let last_row = (first_row + self.page_size - 1).min(row_result.row_count - 1);
        let statement_id = row_result.statement_id;
        let columns = row_result.columns.clone();
        let updatable = row_result.updatable;
        let rows = self
            .connection
            .fetch_page_on_core(statement_id, &columns, updatable, first_row, last_row)?;
        let row_result = match &mut self.result {
            Some(ResultState::Rows(r)) => r,
            _ => unreachable!(),
        };
        row_result.next_unfetched_row = last_row + 1;
        row_result.buffer.extend(rows);
        Ok(())
    }

    /// Returns the next row, or `None` once the current result is
    /// exhausted or is an update count. Raises `DataError` only when no
    /// statement has been executed yet.
    pub fn fetchone(&mut self) -> FourDResult<Option<Vec<Value>>> {
        self.check_open()?;
        self.refill_if_empty()?;
        match &mut self.result {
            Some(ResultState::Rows(row_result)) => match row_result.buffer.pop_front() {
                Some(row) => {
                    self.row_number += 1;
                    Ok(Some(row))
                }
                None => Ok(None),
            },
            Some(ResultState::UpdateCount(_)) => Ok(None),
            None => Err(FourDError::data("no statement has been executed yet")),
        }
    }

    /// Returns up to `size` rows (default the cursor's array size).
    pub fn fetchmany(&mut self, size: Option<usize>) -> FourDResult<Vec<Vec<Value>>> {
        self.check_open()?;
        let size = size.unwrap_or(self.array_size as usize);
        let mut rows = Vec::with_capacity(size);
        while rows.len() < size {
            match self.fetchone()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// Drains all remaining rows.
    pub fn fetchall(&mut self) -> FourDResult<Vec<Vec<Value>>> {
        self.check_open()?;
        let mut rows = Vec::new();
        while let Some(row) = self.fetchone()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Sends `CLOSE-STATEMENT` for the held result (if any) and marks the
    /// cursor unusable. Closing a cursor with unread rows is not an error.
    pub fn close(&mut self) -> FourDResult<()> {
        if self.closed {
            return Ok(());
        }
        if let Some(ResultState::Rows(row_result)) = self.result.take() {
            self.connection
                .close_statement_on_core(row_result.statement_id)?;
        }
        self.closed = true;
        self.prepared_for = None;
        Ok(())
    }
}

impl Iterator for Cursor {
    type Item = FourDResult<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.fetchone() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

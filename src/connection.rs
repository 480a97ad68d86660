//! The session controller: connection lifecycle, implicit transaction
//! bracketing, and the prepare/execute/fetch/close statement state machine
//! that every [`crate::Cursor`] drives through a shared core.
//!
//! A shared, mutex-guarded core owns the transport and session state; the
//! public `Connection` is a thin, cloneable handle onto it.

use crate::conn::params::ConnectParams;
use crate::conn::transport::Transport;
use crate::cursor::Cursor;
use crate::error::{FourDError, FourDResult};
use crate::protocol::command::{self, BoundParam};
use crate::protocol::response::{self, ColumnMeta, ExecuteOutcome};
use crate::protocol::value::{self, Value, ValueKind};
use crate::config;
use log::{debug, trace, warn};
use std::sync::{Arc, Mutex};

/// Page size used for on-demand `FETCH-RESULT` calls and for a cursor's
/// initial `FIRST-PAGE-SIZE`, absent any per-cursor override.
const DEFAULT_RES_SIZE: i64 = 100;

pub(crate) type AmConnCore = Arc<Mutex<ConnectionCore>>;

/// The shared, single-threaded-at-a-time session state: the socket, the
/// transaction flag, and the statement lifecycle primitives every cursor
/// calls through.
pub(crate) struct ConnectionCore {
    transport: Transport,
    in_transaction: bool,
    closed: bool,
}

impl ConnectionCore {
    fn ack(&mut self) -> FourDResult<()> {
        let header = response::read_header(&mut self.transport)?;
        response::check_status(&header)
    }

    fn send(&mut self, cmd: &command::Command) -> FourDResult<()> {
        self.transport.send(&cmd.to_bytes())
    }

    /// Sends `LOGIN` and checks its reply. A non-OK status raises a
    /// structured [`FourDError::OperationalError`] (not the generic
    /// `ServerError` other commands raise): a rejected login never yields a
    /// usable connection, so it is an operational failure rather than an
    /// error encountered mid-session.
    fn login(&mut self, user: &str, password: &str) -> FourDResult<()> {
        let cmd = command::login(
            user,
            password,
            &config::default_image_type(),
            config::login_use_base64(),
        );
        self.send(&cmd)?;
        let header = response::read_header(&mut self.transport)?;
        response::check_login_status(&header)
    }

    /// Sends `LOGOUT` then `QUIT`, swallowing I/O errors on either: the
    /// socket is about to be dropped regardless.
    fn logout_and_quit(&mut self) {
        if self.send(&command::logout()).is_ok() {
            let _ = self.ack();
        }
        if self.send(&command::quit()).is_ok() {
            let _ = self.ack();
        }
    }

    fn bind(values: &[Value]) -> FourDResult<(Vec<ValueKind>, Vec<Option<Vec<u8>>>)> {
        let mut kinds = Vec::with_capacity(values.len());
        let mut encoded = Vec::with_capacity(values.len());
        for v in values {
            if v.is_null() {
                kinds.push(ValueKind::Unknown);
                encoded.push(None);
                continue;
            }
            let kind = v.inferred_kind();
            let mut buf = Vec::new();
            value::encode(v, kind, &mut buf)?;
            kinds.push(kind);
            encoded.push(Some(buf));
        }
        Ok((kinds, encoded))
    }

    fn bound_params<'a>(kinds: &[ValueKind], encoded: &'a [Option<Vec<u8>>]) -> Vec<BoundParam<'a>> {
        kinds
            .iter()
            .zip(encoded.iter())
            .map(|(kind, enc)| BoundParam {
                kind: *kind,
                encoded: enc.as_deref(),
            })
            .collect()
    }

    fn prepare_statement(&mut self, sql: &str, values: &[Value]) -> FourDResult<()> {
        let (kinds, encoded) = Self::bind(values)?;
        let params = Self::bound_params(&kinds, &encoded);
        let cmd = command::prepare_statement(sql, &params, config::statement_use_base64());
        trace!("PREPARE-STATEMENT: {sql}");
        self.send(&cmd)?;
        self.ack()
    }

    fn execute_statement(
        &mut self,
        sql: &str,
        values: &[Value],
        first_page_size: u32,
    ) -> FourDResult<StatementOutcome> {
        let (kinds, encoded) = Self::bind(values)?;
        let params = Self::bound_params(&kinds, &encoded);
        let cmd = command::execute_statement(
            sql,
            &params,
            first_page_size,
            config::statement_use_base64(),
        );
        debug!("EXECUTE-STATEMENT: {sql}");
        self.send(&cmd)?;
        let header = response::read_header(&mut self.transport)?;
        match response::classify_execute(&header)? {
            ExecuteOutcome::ResultSet {
                statement_id,
                columns,
                row_count,
                row_count_sent,
            } => {
                let updatable = columns.iter().any(|c| c.updatable);
                let mut rows = Vec::with_capacity(row_count_sent.max(0) as usize);
                for _ in 0..row_count_sent {
                    let (_, cells) = response::read_row(&mut self.transport, &columns, updatable)?;
                    rows.push(cells);
                }
                Ok(StatementOutcome::ResultSet {
                    statement_id,
                    columns,
                    row_count,
                    rows_fetched: row_count_sent,
                    rows,
                })
            }
            ExecuteOutcome::UpdateCount => {
                let count = response::read_update_count(&mut self.transport)?;
                Ok(StatementOutcome::UpdateCount(count))
            }
        }
    }

    fn fetch_page(
        &mut self,
        statement_id: i64,
        columns: &[ColumnMeta],
        updatable: bool,
        first_row: i64,
        last_row: i64,
    ) -> FourDResult<Vec<Vec<Value>>> {
        let cmd = command::fetch_result(statement_id, first_row, last_row);
        self.send(&cmd)?;
        let header = response::read_header(&mut self.transport)?;
        response::check_status(&header)?;
        let count = last_row - first_row + 1;
        let mut rows = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let (_, cells) = response::read_row(&mut self.transport, columns, updatable)?;
            rows.push(cells);
        }
        Ok(rows)
    }

    fn close_statement(&mut self, statement_id: i64) -> FourDResult<()> {
        let cmd = command::close_statement(statement_id);
        self.send(&cmd)?;
        self.ack()
    }

    /// Prepares and executes a statement with no result expected, discarding
    /// any response rows. Used for `START TRANSACTION`/`COMMIT`/`ROLLBACK`.
    fn run_housekeeping_statement(&mut self, sql: &str) -> FourDResult<()> {
        self.prepare_statement(sql, &[])?;
        match self.execute_statement(sql, &[], DEFAULT_RES_SIZE as u32)? {
            StatementOutcome::ResultSet { statement_id, .. } => {
                self.close_statement(statement_id)?;
            }
            StatementOutcome::UpdateCount(_) => {}
        }
        Ok(())
    }

    fn ensure_transaction_started(&mut self) -> FourDResult<()> {
        if self.in_transaction {
            return Ok(());
        }
        self.run_housekeeping_statement("START TRANSACTION;")?;
        self.in_transaction = true;
        Ok(())
    }
}

/// The non-network-visible shape of an `EXECUTE-STATEMENT`/`FETCH-RESULT`
/// response, after its piggybacked rows (if any) have been read.
pub(crate) enum StatementOutcome {
    ResultSet {
        statement_id: i64,
        columns: Vec<ColumnMeta>,
        row_count: i64,
        rows_fetched: i64,
        rows: Vec<Vec<Value>>,
    },
    UpdateCount(i64),
}

/// An authenticated session with a 4D server.
///
/// Cloning a `Connection` shares the same underlying socket and session
/// state; see the crate-level concurrency notes before using clones from
/// more than one thread.
#[derive(Clone)]
pub struct Connection {
    core: AmConnCore,
}

impl Connection {
    pub(crate) fn execute_on_core(
        &self,
        sql: &str,
        values: &[Value],
        first_page_size: u32,
    ) -> FourDResult<StatementOutcome> {
        let mut core = self.lock();
        core.ensure_transaction_started()?;
        core.execute_statement(sql, values, first_page_size)
    }

    pub(crate) fn prepare_on_core(&self, sql: &str, values: &[Value]) -> FourDResult<()> {
        self.lock().prepare_statement(sql, values)
    }

    pub(crate) fn fetch_page_on_core(
        &self,
        statement_id: i64,
        columns: &[ColumnMeta],
        updatable: bool,
        first_row: i64,
        last_row: i64,
    ) -> FourDResult<Vec<Vec<Value>>> {
        self.lock()
            .fetch_page(statement_id, columns, updatable, first_row, last_row)
    }

    pub(crate) fn close_statement_on_core(&self, statement_id: i64) -> FourDResult<()> {
        self.lock().close_statement(statement_id)
    }

    pub(crate) fn default_res_size(&self) -> i64 {
        DEFAULT_RES_SIZE
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectionCore> {
        self.core
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Opens a new cursor on this connection.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.clone())
    }

    /// Commits the current transaction, if one is open. A no-op otherwise.
    pub fn commit(&self) -> FourDResult<()> {
        let mut core = self.lock();
        if !core.in_transaction {
            return Ok(());
        }
        core.run_housekeeping_statement("COMMIT;")?;
        core.in_transaction = false;
        Ok(())
    }

    /// Rolls back the current transaction, if one is open. A no-op otherwise.
    pub fn rollback(&self) -> FourDResult<()> {
        let mut core = self.lock();
        if !core.in_transaction {
            return Ok(());
        }
        core.run_housekeeping_statement("ROLLBACK;")?;
        core.in_transaction = false;
        Ok(())
    }

    /// Closes the connection: rolls back any open transaction, sends
    /// `LOGOUT`/`QUIT` best-effort, then drops the socket.
    pub fn close(&self) -> FourDResult<()> {
        let mut core = self.lock();
        if core.closed {
            return Ok(());
        }
        if core.in_transaction {
            if let Err(e) = core.run_housekeeping_statement("ROLLBACK;") {
                warn!("rollback during close failed: {e}");
            }
            core.in_transaction = false;
        }
        core.logout_and_quit();
        core.closed = true;
        Ok(())
    }
}

/// Opens a new authenticated connection.
///
/// `dsn` and the explicit keyword arguments are reconciled per
/// [`ConnectParams::build`]; explicit arguments win.
///
/// `database` is accepted for DSN compatibility and kept on
/// [`ConnectParams`], but is not sent as part of `LOGIN`: the wire protocol's
/// login command has no database/catalog selector, only user and password.
#[allow(clippy::too_many_arguments)]
pub fn connect(
    dsn: Option<&str>,
    host: Option<&str>,
    port: Option<u16>,
    user: Option<&str>,
    password: Option<&str>,
    database: Option<&str>,
) -> FourDResult<Connection> {
    let params = ConnectParams::build(dsn, host, port, user, password, database)?;
    if params.host().is_empty() {
        return Err(FourDError::interface("no host given in DSN or arguments"));
    }
    let transport = Transport::connect(params.host(), params.port())?;
    let mut core = ConnectionCore {
        transport,
        in_transaction: false,
        closed: false,
    };
    core.login(params.user(), &params.password)?;
    debug!("connected to {}:{}", params.host(), params.port());
    Ok(Connection {
        core: Arc::new(Mutex::new(core)),
    })
}

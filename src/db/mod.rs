/// Database Module
///
/// This module handles all warehouse session management:
/// - Opening a single connection per pipeline run
/// - Per-statement transactional boundaries (lazy BEGIN, explicit COMMIT)
/// - Idempotent session release
/// - Schema setup for the staging and analytics tables
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

use crate::config::WarehouseConfig;

/// One live warehouse session, exclusively owned by a single pipeline run.
///
/// `execute` submits one statement; `commit` makes its effects durable before
/// the next statement is submitted. `close` releases the session and is safe
/// to call more than once.
pub trait Session {
    async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error>;
    async fn commit(&mut self) -> Result<(), sqlx::Error>;
    async fn close(&mut self) -> Result<(), sqlx::Error>;
}

/// Opens sessions. The pipeline owns a connector rather than a session so
/// that connection failures surface inside `run()` before any statement.
pub trait Connect {
    type Session: Session;

    async fn connect(&self) -> Result<Self::Session, sqlx::Error>;
}

/// A session over a single Postgres-protocol connection.
///
/// The driver runs in autocommit, so the per-statement transaction is made
/// explicit here: the first `execute` after a commit issues BEGIN, and
/// `commit` issues COMMIT. Statements run over the simple query protocol
/// because COPY and DDL cannot be prepared.
pub struct PgSession {
    conn: Option<PgConnection>,
    in_transaction: bool,
}

impl PgSession {
    fn new(conn: PgConnection) -> Self {
        Self { conn: Some(conn), in_transaction: false }
    }
}

impl Session for PgSession {
    async fn execute(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
        let conn = self.conn.as_mut().ok_or_else(|| sqlx::Error::Protocol("session already closed".into()))?;

        if !self.in_transaction {
            sqlx::raw_sql("BEGIN").execute(&mut *conn).await?;
            self.in_transaction = true;
        }

        match sqlx::raw_sql(sql).execute(&mut *conn).await {
            Ok(result) => Ok(result.rows_affected()),
            Err(e) => {
                // A failed statement leaves the open transaction aborted;
                // roll it back so the next statement can BEGIN fresh.
                if self.in_transaction {
                    let _ = sqlx::raw_sql("ROLLBACK").execute(&mut *conn).await;
                    self.in_transaction = false;
                }
                Err(e)
            }
        }
    }

    async fn commit(&mut self) -> Result<(), sqlx::Error> {
        let conn = self.conn.as_mut().ok_or_else(|| sqlx::Error::Protocol("session already closed".into()))?;

        if self.in_transaction {
            sqlx::raw_sql("COMMIT").execute(&mut *conn).await?;
            self.in_transaction = false;
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<(), sqlx::Error> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }

        Ok(())
    }
}

/// Connects to the warehouse from explicit connection parameters.
pub struct PgConnector {
    config: WarehouseConfig,
}

impl PgConnector {
    pub fn new(config: WarehouseConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
    }
}

impl Connect for PgConnector {
    type Session = PgSession;

    async fn connect(&self) -> Result<PgSession, sqlx::Error> {
        tracing::debug!("opening warehouse session to {}:{}", self.config.host, self.config.port);

        let conn = PgConnection::connect_with(&self.connect_options()).await?;
        Ok(PgSession::new(conn))
    }
}

/// Verify the session is usable without touching any pipeline table.
pub async fn ping<S: Session>(session: &mut S) -> Result<(), sqlx::Error> {
    session.execute("SELECT 1").await?;
    session.commit().await?;
    Ok(())
}

/// Create the staging and analytics tables if they are missing.
///
/// This supplies the precondition the pipeline assumes: the schemas exist
/// before `run` is invoked. Errors here are logged and skipped rather than
/// propagated; an already-present table is a benign outcome, and the
/// pipeline itself will fail loudly if the warehouse is actually unusable.
pub async fn ensure_schema<S: Session>(session: &mut S) -> usize {
    let mut created = 0;

    for (name, sql) in CREATE_TABLE_STATEMENTS {
        let result = async {
            session.execute(sql).await?;
            session.commit().await
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!("ensured table {}", name);
                created += 1;
            }
            Err(e) => {
                tracing::warn!("skipping table {}: {}", name, e);
            }
        }
    }

    created
}

/// DDL for the two staging tables and the five star-schema tables.
const CREATE_TABLE_STATEMENTS: &[(&str, &str)] = &[
    (
        "staging_events",
        r#"
        CREATE TABLE IF NOT EXISTS staging_events (
            artist          VARCHAR(256),
            auth            VARCHAR(32),
            first_name      VARCHAR(128),
            gender          VARCHAR(8),
            item_in_session INTEGER,
            last_name       VARCHAR(128),
            length          DOUBLE PRECISION,
            level           VARCHAR(16),
            location        VARCHAR(256),
            method          VARCHAR(8),
            page            VARCHAR(64),
            registration    BIGINT,
            session_id      INTEGER,
            song            VARCHAR(256),
            status          INTEGER,
            ts              TIMESTAMP,
            user_agent      VARCHAR(512),
            user_id         INTEGER
        )
        "#,
    ),
    (
        "staging_songs",
        r#"
        CREATE TABLE IF NOT EXISTS staging_songs (
            num_songs        INTEGER,
            artist_id        VARCHAR(32),
            artist_latitude  DOUBLE PRECISION,
            artist_longitude DOUBLE PRECISION,
            artist_location  VARCHAR(256),
            artist_name      VARCHAR(256),
            song_id          VARCHAR(32),
            title            VARCHAR(256),
            duration         DOUBLE PRECISION,
            year             INTEGER
        )
        "#,
    ),
    (
        "songplays",
        r#"
        CREATE TABLE IF NOT EXISTS songplays (
            songplay_id BIGINT IDENTITY(0,1) PRIMARY KEY,
            start_time  TIMESTAMP NOT NULL,
            user_id     INTEGER NOT NULL,
            level       VARCHAR(16),
            song_id     VARCHAR(32),
            artist_id   VARCHAR(32),
            session_id  INTEGER,
            location    VARCHAR(256),
            user_agent  VARCHAR(512)
        )
        "#,
    ),
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id    INTEGER PRIMARY KEY,
            first_name VARCHAR(128),
            last_name  VARCHAR(128),
            gender     VARCHAR(8),
            level      VARCHAR(16)
        )
        "#,
    ),
    (
        "songs",
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            song_id   VARCHAR(32) PRIMARY KEY,
            title     VARCHAR(256),
            artist_id VARCHAR(32),
            year      INTEGER,
            duration  DOUBLE PRECISION
        )
        "#,
    ),
    (
        "artists",
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            artist_id VARCHAR(32) PRIMARY KEY,
            name      VARCHAR(256),
            location  VARCHAR(256),
            latitude  DOUBLE PRECISION,
            longitude DOUBLE PRECISION
        )
        "#,
    ),
    (
        "time",
        r#"
        CREATE TABLE IF NOT EXISTS time (
            start_time TIMESTAMP PRIMARY KEY,
            hour       INTEGER,
            day        INTEGER,
            week       INTEGER,
            month      INTEGER,
            year       INTEGER,
            weekday    INTEGER
        )
        "#,
    ),
];

//! Memcached destination
//!
//! `MemcacheStore` implements `KeyValueStore` with the memcached text
//! protocol `set` command:
//!
//! ```text
//! set <key> 0 0 <bytes>\r\n
//! <data>\r\n
//! ```
//!
//! Connections are opened lazily and kept in a small idle pool. A connection
//! goes back to the pool only after a complete request/response exchange, so
//! a stream left in an unknown state after an error is always dropped.

use super::traits::KeyValueStore;
use crate::types::LoaderError;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Longest key memcached accepts
pub const MAX_KEY_LENGTH: usize = 250;

/// Default per-operation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Connection-pooled memcached client for one server
#[derive(Debug)]
pub struct MemcacheStore {
    addr: String,
    timeout: Duration,
    max_idle: usize,
    idle: Mutex<Vec<BufStream<TcpStream>>>,
}

impl MemcacheStore {
    /// Create a client for `addr` (`host:port`)
    ///
    /// No connection is made until the first write.
    pub fn new(addr: impl Into<String>, timeout: Duration, max_idle: usize) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            max_idle: max_idle.max(1),
            idle: Mutex::new(Vec::new()),
        }
    }

    fn checkout(&self) -> Option<BufStream<TcpStream>> {
        self.idle.lock().ok().and_then(|mut idle| idle.pop())
    }

    fn checkin(&self, conn: BufStream<TcpStream>) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(conn);
            }
        }
    }

    async fn connect(&self) -> Result<BufStream<TcpStream>, LoaderError> {
        let stream = timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| LoaderError::timeout(&self.addr))?
            .map_err(|e| LoaderError::Connect {
                addr: self.addr.clone(),
                message: e.to_string(),
            })?;
        stream.set_nodelay(true)?;
        debug!(addr = %self.addr, "Connected to memcached");
        Ok(BufStream::new(stream))
    }

    async fn exchange(
        &self,
        conn: &mut BufStream<TcpStream>,
        key: &str,
        value: &[u8],
    ) -> Result<bool, LoaderError> {
        let header = format!("set {} 0 0 {}\r\n", key, value.len());
        conn.write_all(header.as_bytes()).await?;
        conn.write_all(value).await?;
        conn.write_all(b"\r\n").await?;
        conn.flush().await?;

        let mut response = String::new();
        if conn.read_line(&mut response).await? == 0 {
            return Err(LoaderError::Io {
                message: format!("connection to {} closed", self.addr),
            });
        }

        match response.trim_end() {
            "STORED" => Ok(true),
            "NOT_STORED" => Ok(false),
            other => Err(LoaderError::Protocol {
                addr: self.addr.clone(),
                response: other.to_string(),
            }),
        }
    }
}

/// Check a key against memcached's key rules
///
/// Keys must be 1 to 250 bytes with no whitespace or control characters.
pub fn validate_key(key: &str) -> Result<(), LoaderError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && !key.chars().any(|c| c.is_whitespace() || c.is_control());

    if valid {
        Ok(())
    } else {
        Err(LoaderError::InvalidKey {
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl KeyValueStore for MemcacheStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<bool, LoaderError> {
        validate_key(key)?;

        let mut conn = match self.checkout() {
            Some(conn) => conn,
            None => self.connect().await?,
        };

        let stored = timeout(self.timeout, self.exchange(&mut conn, key, value))
            .await
            .map_err(|_| LoaderError::timeout(&self.addr))??;

        // NOT_STORED is a complete exchange too, the connection stays usable
        self.checkin(conn);
        Ok(stored)
    }
}

/// Connection pool / multiplexer
///
/// Keyed registry of connections, one per (channel-class, endpoint) key. The
/// pool owns creation, reuse and teardown; it is an explicit constructed
/// instance with process-wide lifetime managed by the application's
/// composition root, so tests can run several independent pools side by side.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::arguments::is_debug_pool_enabled;
use crate::config::{AuthConfig, Config, RealtimeConfig};
use crate::errors::{SyncError, SyncResult};
use crate::logger::{self, LogTag};

use super::connection::{ConnKey, Connection};
use super::message::ClientFrame;

pub struct ConnectionPool {
    realtime: RealtimeConfig,
    auth: AuthConfig,
    connections: Mutex<HashMap<ConnKey, Arc<Connection>>>,
}

impl ConnectionPool {
    pub fn new(realtime: RealtimeConfig, auth: AuthConfig) -> Self {
        Self {
            realtime,
            auth,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.realtime.clone(), config.auth.clone())
    }

    /// Get the live connection for `key`, creating and opening one if absent
    /// or closed. Resolves once the transport reports open, or rejects after
    /// the configured acquisition timeout.
    ///
    /// At most one live connection ever exists per key; concurrent acquires
    /// share the same handle.
    pub async fn acquire(&self, key: ConnKey) -> SyncResult<Arc<Connection>> {
        let url = self.build_url(&key)?;

        let (conn, created) = {
            let mut connections = self.connections.lock();
            match connections.get(&key) {
                Some(existing) if existing.is_live() => (existing.clone(), false),
                _ => {
                    let conn = Connection::spawn(key.clone(), url, self.realtime.clone());
                    connections.insert(key.clone(), conn.clone());
                    (conn, true)
                }
            }
        };

        if is_debug_pool_enabled() {
            logger::debug(
                LogTag::Pool,
                &format!(
                    "acquire {}: {} (pooled={})",
                    key,
                    if created { "created" } else { "reused" },
                    self.connections.lock().len()
                ),
            );
        }

        conn.wait_open(Duration::from_secs(self.realtime.acquire_timeout_secs))
            .await?;
        Ok(conn)
    }

    /// Look up the connection for `key` without creating one
    pub fn get(&self, key: &ConnKey) -> Option<Arc<Connection>> {
        self.connections.lock().get(key).cloned()
    }

    /// Send a frame over the connection for `key`: transmitted immediately if
    /// open, queued FIFO for replay otherwise
    pub fn send(&self, key: &ConnKey, frame: &ClientFrame) -> SyncResult<()> {
        match self.get(key) {
            Some(conn) => conn.send_frame(frame),
            None => Err(SyncError::ConnectionClosed),
        }
    }

    /// Close the connection for `key` with a clean close code and remove it
    /// from the pool. Never called implicitly - consumers going away only
    /// remove their listeners.
    pub fn disconnect(&self, key: &ConnKey) {
        let conn = self.connections.lock().remove(key);
        if let Some(conn) = conn {
            logger::info(LogTag::Pool, &format!("Disconnecting {}", key));
            conn.disconnect();
        }
    }

    /// Tear down every pooled connection (shutdown path)
    pub fn disconnect_all(&self) {
        let drained: Vec<(ConnKey, Arc<Connection>)> =
            self.connections.lock().drain().collect();
        for (key, conn) in drained {
            logger::info(LogTag::Pool, &format!("Disconnecting {}", key));
            conn.disconnect();
        }
    }

    /// Number of pooled connections (live or awaiting reconnect)
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// Build the connection URI with the bearer token attached as a query
    /// parameter. Some relay layers do not forward custom headers on
    /// WebSocket upgrades, so the query parameter is the only reliable slot.
    fn build_url(&self, key: &ConnKey) -> SyncResult<String> {
        let token = self
            .auth
            .token
            .as_deref()
            .ok_or_else(|| SyncError::AuthMissing {
                endpoint: key.endpoint.clone(),
            })?;

        let mut url = Url::parse(&key.endpoint).map_err(|e| SyncError::InvalidEndpoint {
            url: key.endpoint.clone(),
            reason: e.to_string(),
        })?;

        url.query_pairs_mut()
            .append_pair(&self.auth.token_param, token);
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::connection::ChannelClass;

    fn pool_with_token(token: Option<&str>) -> ConnectionPool {
        ConnectionPool::new(
            RealtimeConfig::default(),
            AuthConfig {
                token: token.map(|t| t.to_string()),
                ..AuthConfig::default()
            },
        )
    }

    #[test]
    fn test_build_url_embeds_token() {
        let pool = pool_with_token(Some("secret"));
        let key = ConnKey::new(ChannelClass::Research, "ws://localhost:9300/ws");
        let url = pool.build_url(&key).unwrap();
        assert_eq!(url, "ws://localhost:9300/ws?token=secret");
    }

    #[test]
    fn test_missing_token_rejects() {
        let pool = pool_with_token(None);
        let key = ConnKey::new(ChannelClass::Research, "ws://localhost:9300/ws");
        match pool.build_url(&key) {
            Err(SyncError::AuthMissing { endpoint }) => {
                assert_eq!(endpoint, "ws://localhost:9300/ws");
            }
            other => panic!("expected AuthMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_endpoint_rejects() {
        let pool = pool_with_token(Some("secret"));
        let key = ConnKey::new(ChannelClass::Research, "not a url");
        assert!(matches!(
            pool.build_url(&key),
            Err(SyncError::InvalidEndpoint { .. })
        ));
    }
}

use std::fmt;
use std::time::Duration;

use redis::{Commands, IntoConnectionInfo};

use crate::bridge::parse_score;
use crate::log;

const SCORE_KEY: &str = "score";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum StoreError {
    Unavailable(String),
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
            StoreError::Corrupt(value) => write!(f, "stored score is not a number: {:?}", value),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub host: String,
    pub port: String,
    pub status: String,
}

pub trait HighScoreStore: Send {
    fn get(&mut self) -> Result<u32, StoreError>;
    fn set(&mut self, score: u32) -> Result<(), StoreError>;
    fn info(&mut self) -> StoreInfo;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    score: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HighScoreStore for MemoryStore {
    fn get(&mut self) -> Result<u32, StoreError> {
        Ok(self.score)
    }

    fn set(&mut self, score: u32) -> Result<(), StoreError> {
        self.score = score;
        Ok(())
    }

    fn info(&mut self) -> StoreInfo {
        StoreInfo {
            host: String::new(),
            port: String::new(),
            status: "No connection".to_string(),
        }
    }
}

pub struct RedisStore {
    host: String,
    port: u16,
    password: Option<String>,
    conn: Option<redis::Connection>,
}

impl RedisStore {
    pub fn new(host: String, port: u16, password: Option<String>) -> Self {
        Self {
            host,
            port,
            password: password.filter(|p| !p.is_empty()),
            conn: None,
        }
    }

    fn ping(conn: &mut redis::Connection) -> redis::RedisResult<String> {
        redis::cmd("PING").query(conn)
    }

    fn connection(&mut self) -> Result<&mut redis::Connection, StoreError> {
        let healthy = match self.conn.as_mut() {
            Some(conn) => Self::ping(conn).is_ok(),
            None => false,
        };
        if !healthy {
            self.conn = None;
            let mut info = (self.host.as_str(), self.port).into_connection_info()?;
            info.redis.password = self.password.clone();
            let client = redis::Client::open(info)?;
            let mut conn = client.get_connection_with_timeout(CONNECT_TIMEOUT)?;
            Self::ping(&mut conn)?;
            self.conn = Some(conn);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("no connection".to_string()))
    }
}

impl HighScoreStore for RedisStore {
    fn get(&mut self) -> Result<u32, StoreError> {
        let value: Option<String> = self.connection()?.get(SCORE_KEY)?;
        match value {
            None => Ok(0),
            Some(v) => v.trim().parse().map_err(|_| StoreError::Corrupt(v)),
        }
    }

    fn set(&mut self, score: u32) -> Result<(), StoreError> {
        let _: () = self.connection()?.set(SCORE_KEY, score)?;
        Ok(())
    }

    fn info(&mut self) -> StoreInfo {
        let status = match self.connection() {
            Ok(conn) => match Self::ping(conn) {
                Ok(reply) => format!("ping: {}", reply),
                Err(e) => format!("ping: {}", e),
            },
            Err(e) => {
                log(&format!("redis: {}", e));
                "No connection".to_string()
            }
        };
        StoreInfo {
            host: self.host.clone(),
            port: self.port.to_string(),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

pub struct HighScoreService {
    store: Box<dyn HighScoreStore>,
}

impl HighScoreService {
    pub fn new(store: Box<dyn HighScoreStore>) -> Self {
        Self { store }
    }

    pub fn current(&mut self) -> u32 {
        match self.store.get() {
            Ok(score) => score,
            Err(e) => {
                log(&format!("high score read failed: {}", e));
                0
            }
        }
    }

    fn store(&mut self, score: u32) {
        if let Err(e) = self.store.set(score) {
            log(&format!("high score write failed: {}", e));
        }
    }

    pub fn handle(&mut self, method: &str, body: &str) -> Reply {
        match method {
            "GET" => Reply::ok(self.current().to_string()),
            "POST" => {
                let Ok(candidate) = parse_score(body) else {
                    return bad_score(body);
                };
                let old = self.current();
                if candidate > old {
                    self.store(candidate);
                    Reply::ok(candidate.to_string())
                } else {
                    Reply::ok(old.to_string())
                }
            }
            "PUT" => {
                let Ok(score) = parse_score(body) else {
                    return bad_score(body);
                };
                self.store(score);
                Reply::ok(score.to_string())
            }
            _ => Reply {
                status: 405,
                body: String::new(),
            },
        }
    }

    pub fn redis_report(&mut self) -> String {
        let info = self.store.info();
        format!(
            "redis_host={}\nredis_port={}\n\nConnection: {}",
            info.host, info.port, info.status
        )
    }
}

fn bad_score(body: &str) -> Reply {
    Reply {
        status: 400,
        body: format!("not a score: {:?}", body.trim()),
    }
}

pub fn env_report<I>(vars: I, app_name: &str) -> String
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut out = String::new();
    for (key, value) in vars {
        if key.starts_with("HCP_") {
            out.push_str(&format!("{}={}\n", key, value));
        }
    }
    out.push_str(&format!("APP_NAME={}\n", app_name));
    out.push_str(&format!(
        "\n\nServer Version = {} {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DownStore;

    impl HighScoreStore for DownStore {
        fn get(&mut self) -> Result<u32, StoreError> {
            Err(StoreError::Unavailable("refused".into()))
        }
        fn set(&mut self, _score: u32) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("refused".into()))
        }
        fn info(&mut self) -> StoreInfo {
            StoreInfo {
                host: "10.0.0.5".into(),
                port: "6379".into(),
                status: "No connection".into(),
            }
        }
    }

    fn memory() -> HighScoreService {
        HighScoreService::new(Box::new(MemoryStore::new()))
    }

    #[test]
    fn get_starts_at_zero() {
        assert_eq!(memory().handle("GET", ""), Reply::ok("0"));
    }

    #[test]
    fn post_keeps_the_higher_score() {
        let mut svc = memory();
        assert_eq!(svc.handle("POST", "250"), Reply::ok("250"));
        assert_eq!(svc.handle("POST", "100"), Reply::ok("250"));
        assert_eq!(svc.handle("GET", ""), Reply::ok("250"));
    }

    #[test]
    fn put_overwrites() {
        let mut svc = memory();
        svc.handle("POST", "900");
        assert_eq!(svc.handle("PUT", "5"), Reply::ok("5"));
        assert_eq!(svc.current(), 5);
    }

    #[test]
    fn garbage_body_is_rejected() {
        let mut svc = memory();
        assert_eq!(svc.handle("POST", "lots").status, 400);
        assert_eq!(svc.handle("PUT", "").status, 400);
        assert_eq!(svc.current(), 0);
    }

    #[test]
    fn other_methods_not_allowed() {
        assert_eq!(memory().handle("DELETE", "").status, 405);
    }

    #[test]
    fn unreachable_store_reads_zero() {
        let mut svc = HighScoreService::new(Box::new(DownStore));
        assert_eq!(svc.handle("GET", ""), Reply::ok("0"));
        assert_eq!(svc.handle("POST", "40"), Reply::ok("40"));
    }

    #[test]
    fn redis_report_layout() {
        let mut svc = HighScoreService::new(Box::new(DownStore));
        assert_eq!(
            svc.redis_report(),
            "redis_host=10.0.0.5\nredis_port=6379\n\nConnection: No connection"
        );
    }

    #[test]
    fn env_report_filters_hcp_vars() {
        let vars = vec![
            ("HCP_PROJECT_ID".to_string(), "p1".to_string()),
            ("HOME".to_string(), "/root".to_string()),
            ("HCP_ORGANIZATION_ID".to_string(), "o1".to_string()),
        ];
        let report = env_report(vars, "terramino");
        assert!(report.starts_with("HCP_PROJECT_ID=p1\nHCP_ORGANIZATION_ID=o1\nAPP_NAME=terramino\n"));
        assert!(!report.contains("HOME"));
        assert!(report.contains("Server Version = terramino"));
    }
}

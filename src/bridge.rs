use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::log;

pub const SCORE_PATH: &str = "/score";
pub const ENV_PATH: &str = "/env";
pub const REDIS_PATH: &str = "/redis";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    Network(String),
    Status { path: String, status: u16 },
    InvalidScore(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Network(msg) => write!(f, "network error: {}", msg),
            BridgeError::Status { path, status } => {
                write!(f, "{} answered with status {}", path, status)
            }
            BridgeError::InvalidScore(body) => write!(f, "not a score: {:?}", body),
        }
    }
}

impl std::error::Error for BridgeError {}

pub fn parse_score(body: &str) -> Result<u32, BridgeError> {
    body.trim()
        .parse::<u32>()
        .map_err(|_| BridgeError::InvalidScore(body.to_string()))
}

pub fn debug_report(env: &str, redis: &str) -> String {
    format!("Env Info:\n{}\nRedis Info:\n{}", env, redis)
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum NetworkPolicy {
    Ignore,
    #[default]
    Log,
    Retry { attempts: u32 },
}

impl NetworkPolicy {
    pub async fn run<T, F, Fut>(self, what: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
    {
        let attempts = match self {
            NetworkPolicy::Retry { attempts } => attempts.max(1),
            _ => 1,
        };
        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Some(value),
                Err(e) => match self {
                    NetworkPolicy::Ignore => {}
                    NetworkPolicy::Log => log(&format!("{} failed: {}", what, e)),
                    NetworkPolicy::Retry { .. } => {
                        log(&format!("{} failed ({}/{}): {}", what, attempt, attempts, e))
                    }
                },
            }
        }
        None
    }
}

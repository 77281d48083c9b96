use crate::Chain;
use std::time::Duration;
use thiserror::Error;

/// JSON-RPC codes providers use when they throttle a client.
pub const RATE_LIMIT_CODES: &[i64] = &[429, -32005, -32090];

const THROTTLE_HINTS: &[&str] = &[
    "rate limit",
    "too many requests",
    "limit exceeded",
    "timeout",
    "timed out",
    "over capacity",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("HTTP status {0}")]
    Http(u16),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Invalid address `{0}`")]
    InvalidAddress(String),
    #[error("Call reverted: {0}")]
    Reverted(String),
}

impl RpcError {
    /// Structured error code if the provider sent one, HTTP status otherwise.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { code, .. } => Some(*code),
            RpcError::Http(status) => Some(i64::from(*status)),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.code()
            .map(|code| RATE_LIMIT_CODES.contains(&code))
            .unwrap_or_default()
    }

    /// Whether retrying the same request later could succeed.
    ///
    /// Transient errors fail the whole batch so the executor can back off.
    /// Everything else is about one particular wallet and is reported for
    /// that wallet only.
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Timeout(_) | RpcError::Transport(_) => true,
            RpcError::Http(status) => *status == 429 || *status >= 500,
            RpcError::Rpc { code, message } => {
                RATE_LIMIT_CODES.contains(code) || mentions_throttling(message)
            }
            RpcError::Decode(_) | RpcError::InvalidAddress(_) | RpcError::Reverted(_) => false,
        }
    }
}

fn mentions_throttling(message: &str) -> bool {
    let message = message.to_ascii_lowercase();

    THROTTLE_HINTS.iter().any(|hint| message.contains(hint))
}

impl From<web3::Error> for RpcError {
    fn from(e: web3::Error) -> Self {
        match e {
            web3::Error::Rpc(err) if err.message.contains("revert") => RpcError::Reverted(err.message),
            web3::Error::Rpc(err) => RpcError::Rpc {
                code: err.code.code(),
                message: err.message,
            },
            web3::Error::Decoder(msg) | web3::Error::InvalidResponse(msg) => RpcError::Decode(msg),
            web3::Error::Transport(msg) => match http_status(&msg) {
                Some(status) => RpcError::Http(status),
                None => RpcError::Transport(msg),
            },
            other => RpcError::Transport(other.to_string()),
        }
    }
}

/// The web3 HTTP transport reports non-2xx answers only as text, e.g.
/// `response status code is not success: 429 Too Many Requests`.
fn http_status(message: &str) -> Option<u16> {
    message
        .strip_prefix("response status code is not success: ")?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => RpcError::Http(status.as_u16()),
            None if e.is_decode() => RpcError::Decode(e.to_string()),
            None => RpcError::Transport(e.to_string()),
        }
    }
}

/// Failure to establish a chain connection.
///
/// Returned to the caller, which decides whether the process should go on
/// without that chain.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid RPC url `{url}` for {chain}: {reason}")]
    InvalidUrl {
        chain: Chain,
        url: String,
        reason: String,
    },
    #[error("{chain} RPC at `{url}` is unreachable: {source}")]
    Unreachable {
        chain: Chain,
        url: String,
        #[source]
        source: RpcError,
    },
    #[error("{chain} RPC reports chain id {actual}, expected {expected}")]
    ChainIdMismatch {
        chain: Chain,
        expected: u64,
        actual: u64,
    },
    #[error("Chain `{0}` is not supported by this connection type")]
    UnsupportedChain(Chain),
}

#[cfg(test)]
mod test {
    use super::RpcError;
    use std::time::Duration;

    fn status_error(status: &str) -> RpcError {
        web3::Error::Transport(format!("response status code is not success: {status}")).into()
    }

    #[test]
    fn throttling_is_transient() {
        assert!(RpcError::Http(429).is_transient());
        assert!(RpcError::Http(503).is_transient());
        assert!(RpcError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(RpcError::Rpc {
            code: -32005,
            message: "limit exceeded".into()
        }
        .is_transient());
        assert!(RpcError::Rpc {
            code: -32000,
            message: "Request Timed Out".into()
        }
        .is_transient());
    }

    #[test]
    fn wallet_specific_errors_are_not_transient() {
        assert!(!RpcError::Http(400).is_transient());
        assert!(!RpcError::InvalidAddress("0x12".into()).is_transient());
        assert!(!RpcError::Reverted("execution reverted".into()).is_transient());
        assert!(!RpcError::Rpc {
            code: -32602,
            message: "invalid params".into()
        }
        .is_transient());
    }

    #[test]
    fn codes() {
        assert_eq!(RpcError::Http(429).code(), Some(429));
        assert!(RpcError::Http(429).is_rate_limited());
        assert_eq!(
            RpcError::Rpc {
                code: -32090,
                message: String::new()
            }
            .code(),
            Some(-32090)
        );
        assert_eq!(RpcError::Transport("reset".into()).code(), None);
    }

    #[test]
    fn web3_status_errors_keep_their_status() {
        let throttled = status_error("429 Too Many Requests");
        assert_eq!(throttled, RpcError::Http(429));
        assert!(throttled.is_rate_limited());
        assert!(throttled.is_transient());

        let unauthorized = status_error("401 Unauthorized");
        assert_eq!(unauthorized.code(), Some(401));
        assert!(!unauthorized.is_transient());

        assert!(status_error("502 Bad Gateway").is_transient());
    }

    #[test]
    fn other_web3_errors() {
        let send_failed: RpcError =
            web3::Error::Transport("failed to send request: connection reset".into()).into();
        assert_eq!(
            send_failed,
            RpcError::Transport("failed to send request: connection reset".into())
        );
        assert!(send_failed.is_transient());

        let garbled: RpcError = web3::Error::Decoder("invalid hex".into()).into();
        assert_eq!(garbled, RpcError::Decode("invalid hex".into()));
        assert!(!garbled.is_transient());

        let unreachable: RpcError = web3::Error::Unreachable.into();
        assert!(matches!(unreachable, RpcError::Transport(_)));
    }

    #[tokio::test]
    async fn refused_http_requests_are_transport_errors() {
        let err: RpcError = reqwest::Client::new()
            .get("http://127.0.0.1:1")
            .send()
            .await
            .unwrap_err()
            .into();

        assert!(matches!(err, RpcError::Transport(_)));
        assert_eq!(err.code(), None);
        assert!(err.is_transient());
    }
}

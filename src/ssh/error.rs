/// SessionError covers every way a device command channel can fail
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),
    #[error("TCP connection failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error("SSH handshake failed: {0}")]
    Handshake(#[source] ssh2::Error),
    #[error("SSH authentication failed: all methods exhausted")]
    AuthenticationRejected,
    #[error("SSH channel error: {0}")]
    Channel(#[source] ssh2::Error),
    #[error("I/O error on SSH channel: {0}")]
    Io(#[source] std::io::Error),
    #[error("Timed out after {secs}s waiting for prompt (last output: {tail:?})")]
    Timeout { secs: u64, tail: String },
    #[error("Channel closed by device")]
    Closed,
    #[error("Privileged mode refused: {0}")]
    EnableRefused(String),
    #[error("Configuration line '{line}' rejected: {output}")]
    ConfigRejected { line: String, output: String },
}

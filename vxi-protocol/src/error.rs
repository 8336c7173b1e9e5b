use thiserror::Error;

/// Errors that may occur when parsing or exchanging protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("packet truncated: needed {needed} more bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("not an RPC call message (msg_type {0})")]
    NotACall(u32),
    #[error("bad RPC reply: {0}")]
    BadReply(String),
    #[error("call rejected with RPC status {0}")]
    Status(u32),
    #[error("instrument reported device error {0}")]
    Device(u32),
}

use std::fmt;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl SessionState {
    /// Whether command controls should be enabled
    pub fn accepts_commands(self) -> bool {
        self == SessionState::Connected
    }
}

/// Which path started a disconnect
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    Operator,
    SendFailed(String),
    ReceiveFailed(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Operator => write!(f, "requested by operator"),
            DisconnectReason::SendFailed(e) => write!(f, "send failed ({})", e),
            DisconnectReason::ReceiveFailed(e) => write!(f, "receive failed ({})", e),
        }
    }
}

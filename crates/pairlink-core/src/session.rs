//! Per-connection protocol state machine.
//!
//! One session per connection, one exchange per session. The machine performs
//! no I/O: drivers report each request package (sent by the initiator,
//! received by the responder) and each reply, and the session says whether it
//! is legal.
//!
//! # State Machine
//!
//! ```text
//!          Handshake           Resume             Exchange        complete
//! ┌───────┐────────>┌───────────┐───────>┌────────┐───────>┌──────────┐────>┌──────┐
//! │ Start │         │ Handshake │        │ Resume │        │ Exchange │     │ Done │
//! └───────┘         └───────────┘        └────────┘        └──────────┘     └──────┘
//!     │  Resume                               ^                  ^
//!     └───────────────────────────────────────┘                  │
//!     │  Exchange (cached key, no resume)                         │
//!     └───────────────────────────────────────────────────────────┘
//!
//!              any illegal package or fail() ──> Error
//! ```
//!
//! Handshake may also go straight to Exchange. Exactly one Exchange ends a
//! session; nothing but Handshake and Resume may precede it.

use pairlink_crypto::CipherKey;
use pairlink_proto::PackageType;

use crate::error::SessionError;

/// Which side of the exchange this session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Client: sends requests, reads replies
    Initiator,
    /// Server: reads requests, sends replies
    Responder,
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing exchanged yet
    Start,
    /// Handshake request in flight or answered
    Handshake,
    /// Resume challenge in flight or answered
    Resume,
    /// Exchange request in flight
    Exchange,
    /// Exchange answered
    Done,
    /// Terminated by a protocol violation or failure
    Error,
}

impl SessionState {
    /// State reached by a request package of type `kind`, if legal.
    fn after_request(self, kind: PackageType) -> Option<Self> {
        match (self, kind) {
            (Self::Start, PackageType::Handshake) => Some(Self::Handshake),
            (Self::Start | Self::Handshake, PackageType::Resume) => Some(Self::Resume),
            (Self::Start | Self::Handshake | Self::Resume, PackageType::Exchange) => {
                Some(Self::Exchange)
            },
            _ => None,
        }
    }

    /// Package type of the request that put the session in this state.
    fn pending_request(self) -> Option<PackageType> {
        match self {
            Self::Handshake => Some(PackageType::Handshake),
            Self::Resume => Some(PackageType::Resume),
            Self::Exchange => Some(PackageType::Exchange),
            _ => None,
        }
    }
}

/// Protocol state machine for one connection.
#[derive(Debug)]
pub struct HandshakeSession {
    role: Role,
    state: SessionState,
    key: Option<CipherKey>,
}

impl HandshakeSession {
    /// Client-side session with no key yet.
    pub fn initiator() -> Self {
        Self { role: Role::Initiator, state: SessionState::Start, key: None }
    }

    /// Client-side session seeded with a cached key.
    pub fn resuming(key: CipherKey) -> Self {
        Self { role: Role::Initiator, state: SessionState::Start, key: Some(key) }
    }

    /// Server-side session.
    pub fn responder() -> Self {
        Self { role: Role::Responder, state: SessionState::Start, key: None }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session key, once established or seeded.
    pub fn key(&self) -> Option<&CipherKey> {
        self.key.as_ref()
    }

    /// Whether the initiator still needs a handshake before anything else.
    pub fn needs_handshake(&self) -> bool {
        self.key.is_none()
    }

    /// Record a request package: sent by the initiator or received by the
    /// responder.
    ///
    /// # Errors
    ///
    /// `UnexpectedPackage` if `kind` may not follow the current state. The
    /// session moves to `Error` and stays there.
    pub fn on_request(&mut self, kind: PackageType) -> Result<SessionState, SessionError> {
        let Some(next) = self.state.after_request(kind) else {
            return Err(self.violation(kind));
        };

        if self.role == Role::Initiator
            && matches!(kind, PackageType::Resume | PackageType::Exchange)
            && self.key.is_none()
        {
            self.state = SessionState::Error;
            return Err(SessionError::MissingKey(next));
        }

        self.state = next;
        Ok(next)
    }

    /// Check a reply read by the initiator.
    ///
    /// Legal replies echo the pending request's type, or are an Error package.
    pub fn on_reply(&mut self, kind: PackageType) -> Result<(), SessionError> {
        match self.state.pending_request() {
            Some(expected) if kind == expected || kind == PackageType::Error => Ok(()),
            _ => Err(self.violation(kind)),
        }
    }

    /// Install the session key after a handshake or successful resume.
    pub fn establish(&mut self, key: CipherKey) -> Result<(), SessionError> {
        match self.state {
            SessionState::Handshake | SessionState::Resume => {
                self.key = Some(key);
                Ok(())
            },
            state => {
                self.state = SessionState::Error;
                Err(SessionError::MissingKey(state))
            },
        }
    }

    /// Finish the exchange.
    pub fn complete(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Exchange {
            return Err(self.violation(PackageType::Exchange));
        }
        self.state = SessionState::Done;
        Ok(())
    }

    /// Terminate the session.
    pub fn fail(&mut self) {
        self.state = SessionState::Error;
    }

    /// Whether no further packages are accepted.
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, SessionState::Done | SessionState::Error)
    }

    fn violation(&mut self, kind: PackageType) -> SessionError {
        let state = self.state;
        self.state = SessionState::Error;
        SessionError::UnexpectedPackage { state, kind }
    }
}

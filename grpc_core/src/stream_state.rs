//! The per-RPC stream state machine.
//!
//! States: `Idle -> Open -> HalfClosedLocal | HalfClosedRemote -> Closed`,
//! plus a terminal `Reset`. The table is shared by client and server; only
//! the direction of certain transitions (who sends trailers, who sends
//! messages first) differs, captured here via [`Side`].

use std::fmt;

use crate::error::Error;

/// Which endpoint this state machine instance is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
}

/// The state observed by the local endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
    Reset,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Open => "open",
            Self::HalfClosedLocal => "half_closed_local",
            Self::HalfClosedRemote => "half_closed_remote",
            Self::Closed => "closed",
            Self::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// An externally observed event: either something the user asked to send,
/// or something that arrived from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SendInitialMetadata,
    RecvInitialMetadata,
    SendMessage,
    RecvMessage,
    SendEndOfStream,
    RecvEndOfStream,
    SendTrailers,
    RecvTrailers,
    Cancel,
    Reset,
}

/// The per-RPC state machine. Enforces: at most one initial-metadata event
/// per direction, messages cannot precede initial metadata in their
/// direction, trailers imply end-of-stream, and once `closed`/`reset` no
/// further event is legal.
pub struct StreamStateMachine {
    side: Side,
    state: State,
    sent_initial_metadata: bool,
    received_initial_metadata: bool,
}

impl StreamStateMachine {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            state: State::Idle,
            sent_initial_metadata: false,
            received_initial_metadata: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, State::Closed | State::Reset)
    }

    /// Applies an event, transitioning the state machine or returning an
    /// error if the event is illegal in the current state.
    pub fn apply(&mut self, event: Event) -> Result<(), Error> {
        // No sequence of external events can transition a stream back out
        // of `closed` or `reset`.
        if self.is_terminal() {
            return Ok(()); // late frames are ignored
        }

        if event == Event::Cancel || event == Event::Reset {
            tracing::debug!(side = ?self.side, from = %self.state, "stream reset");
            self.state = State::Reset;
            return Ok(());
        }

        match event {
            Event::SendInitialMetadata => self.send_initial_metadata(),
            Event::RecvInitialMetadata => self.recv_initial_metadata(),
            Event::SendMessage => self.send_message(),
            Event::RecvMessage => self.recv_message(),
            Event::SendEndOfStream => self.send_end_of_stream(),
            Event::RecvEndOfStream => self.recv_end_of_stream(),
            Event::SendTrailers => self.send_trailers(),
            Event::RecvTrailers => self.recv_trailers(),
            Event::Cancel | Event::Reset => unreachable!("handled above"),
        }
    }

    fn send_initial_metadata(&mut self) -> Result<(), Error> {
        if self.sent_initial_metadata {
            return Err(Error::Protocol(
                "initial metadata already sent for this direction".to_string(),
            ));
        }
        if !matches!(self.state, State::Idle | State::HalfClosedRemote) {
            return Err(Error::Protocol(format!(
                "cannot send initial metadata from state {}",
                self.state
            )));
        }
        self.sent_initial_metadata = true;
        if self.state == State::Idle {
            self.state = State::Open;
        }
        Ok(())
    }

    fn recv_initial_metadata(&mut self) -> Result<(), Error> {
        if self.received_initial_metadata {
            return Err(Error::Protocol(
                "initial metadata already received for this direction".to_string(),
            ));
        }
        if !matches!(self.state, State::Idle | State::HalfClosedLocal) {
            return Err(Error::Protocol(format!(
                "cannot receive initial metadata in state {}",
                self.state
            )));
        }
        self.received_initial_metadata = true;
        if self.state == State::Idle {
            self.state = State::Open;
        }
        Ok(())
    }

    fn send_message(&mut self) -> Result<(), Error> {
        if !self.sent_initial_metadata {
            return Err(Error::Protocol(
                "message sent before initial metadata".to_string(),
            ));
        }
        match self.state {
            State::Open | State::HalfClosedRemote => Ok(()),
            other => Err(Error::Protocol(format!("cannot send message from state {other}"))),
        }
    }

    fn recv_message(&mut self) -> Result<(), Error> {
        if !self.received_initial_metadata {
            return Err(Error::Protocol(
                "message received before initial metadata".to_string(),
            ));
        }
        match self.state {
            State::Open | State::HalfClosedLocal => Ok(()),
            other => Err(Error::Protocol(format!("cannot receive message in state {other}"))),
        }
    }

    fn send_end_of_stream(&mut self) -> Result<(), Error> {
        match self.state {
            State::Open => {
                self.state = State::HalfClosedLocal;
                Ok(())
            }
            State::HalfClosedRemote => {
                self.state = State::Closed;
                Ok(())
            }
            other => Err(Error::Protocol(format!(
                "cannot send end-of-stream from state {other}"
            ))),
        }
    }

    fn recv_end_of_stream(&mut self) -> Result<(), Error> {
        match self.state {
            State::Open => {
                self.state = State::HalfClosedRemote;
                Ok(())
            }
            State::HalfClosedLocal => {
                self.state = State::Closed;
                Ok(())
            }
            other => Err(Error::Protocol(format!(
                "cannot receive end-of-stream in state {other}"
            ))),
        }
    }

    /// Trailers imply end-of-stream: sending or receiving trailers always
    /// closes that side's direction and, for the server, the whole stream.
    fn send_trailers(&mut self) -> Result<(), Error> {
        if self.side != Side::Server {
            return Err(Error::Protocol("only the server sends trailers".to_string()));
        }
        match self.state {
            State::Open | State::HalfClosedRemote => {
                self.state = State::Closed;
                Ok(())
            }
            other => Err(Error::Protocol(format!("cannot send trailers from state {other}"))),
        }
    }

    fn recv_trailers(&mut self) -> Result<(), Error> {
        if self.side != Side::Client {
            return Err(Error::Protocol("only the client receives trailers".to_string()));
        }
        match self.state {
            State::Open | State::HalfClosedLocal => {
                self.state = State::Closed;
                Ok(())
            }
            other => Err(Error::Protocol(format!("cannot receive trailers in state {other}"))),
        }
    }
}

//! The single response slot of a connection.
//!
//! Frames carry no request id, so a response belongs to whichever exchange
//! is waiting when it arrives. The slot holds at most one waiting exchange;
//! each exchange is settled exactly once through a oneshot channel, whichever
//! of frame, error or close comes first.

use crate::error::NcaLayerError;

use std::sync::Mutex;

use log::debug;
use tokio::sync::oneshot;

/// What the reader task hands to a waiting exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Inbound {
    Frame(String),
    Closed,
    Failed(String),
}

impl Inbound {
    /// Terminal transport events become errors; frames are left to the caller to decode.
    pub(crate) fn into_frame(self) -> Result<String, NcaLayerError> {
        match self {
            Inbound::Frame(text) => Ok(text),
            Inbound::Closed => Err(NcaLayerError::connection_closed()),
            Inbound::Failed(cause) => Err(NcaLayerError::transport(cause)),
        }
    }
}

enum SlotState {
    Idle,
    Waiting(oneshot::Sender<Inbound>),
    /// The waiter gave up before its answer came; the next frame is still its answer.
    Abandoned,
    /// The socket is gone; holds the event that ended it.
    Terminated(Inbound),
}

pub(crate) struct ExchangeSlot {
    state: Mutex<SlotState>,
}

/// A registered exchange awaiting its terminal outcome.
pub(crate) struct PendingExchange {
    rx: oneshot::Receiver<Inbound>,
}

impl ExchangeSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Idle),
        }
    }

    /// Register a new exchange.
    ///
    /// # Errors
    ///
    /// - [`NcaLayerError::RequestInFlight`] if another exchange is still waiting,
    ///   or an abandoned exchange's answer has not arrived yet
    /// - the terminal error if the connection has already ended
    pub(crate) fn open(&self) -> Result<PendingExchange, NcaLayerError> {
        let mut state = self.state.lock().map_err(|_| NcaLayerError::not_connected())?;

        match &*state {
            SlotState::Waiting(tx) if tx.is_closed() => {
                debug!("Exchange abandoned before its answer; holding the slot until it arrives");
                *state = SlotState::Abandoned;
                return Err(NcaLayerError::request_in_flight());
            }
            SlotState::Waiting(_) | SlotState::Abandoned => {
                return Err(NcaLayerError::request_in_flight());
            }
            SlotState::Terminated(event) => {
                return Err(match event.clone().into_frame() {
                    Ok(_) => NcaLayerError::connection_closed(),
                    Err(e) => e,
                });
            }
            SlotState::Idle => {}
        }

        let (tx, rx) = oneshot::channel();
        *state = SlotState::Waiting(tx);
        Ok(PendingExchange { rx })
    }

    /// Hand a frame to the waiting exchange.
    ///
    /// Returns false when nobody was waiting and the frame was discarded.
    pub(crate) fn deliver(&self, text: String) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };

        match std::mem::replace(&mut *state, SlotState::Idle) {
            SlotState::Waiting(tx) => tx.send(Inbound::Frame(text)).is_ok(),
            SlotState::Abandoned => {
                debug!("Discarding late answer of an abandoned exchange");
                false
            }
            terminated @ SlotState::Terminated(_) => {
                *state = terminated;
                false
            }
            SlotState::Idle => {
                debug!("Discarding frame that arrived with no exchange waiting");
                false
            }
        }
    }

    /// Settle any waiter with `event` and refuse every later exchange.
    pub(crate) fn terminate(&self, event: Inbound) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        if let SlotState::Waiting(tx) =
            std::mem::replace(&mut *state, SlotState::Terminated(event.clone()))
        {
            let _ = tx.send(event);
        }
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(*state, SlotState::Terminated(_)))
            .unwrap_or(true)
    }
}

impl PendingExchange {
    /// Wait for the exchange's single outcome.
    pub(crate) async fn wait(self) -> Inbound {
        // The sender only disappears without sending when the slot itself is dropped.
        self.rx.await.unwrap_or(Inbound::Closed)
    }
}

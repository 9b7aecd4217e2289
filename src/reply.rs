use crate::{net::Reply, types::MarshalError};
use serde::Serialize;
use serde_json::Value;
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::debug;

enum State {
    Pending,
    Replied(Reply),
    Taken,
}

/// The single reply slot of one inbound exchange.
///
/// Moves from `Pending` to `Replied` exactly once. Every later [`send`] is a
/// no-op, so any number of callback firings, errors and the implicit success
/// can race for the slot and only the first one is ever answered.
///
/// [`send`]: ReplyChannel::send
#[derive(Clone)]
pub struct ReplyChannel {
    state: Arc<Mutex<State>>,
}

impl ReplyChannel {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Pending)),
        }
    }

    /// Stores `reply` if nothing has been replied yet. Returns whether it was stored.
    pub(crate) fn send(&self, reply: Reply) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            State::Pending => {
                *state = State::Replied(reply);
                true
            }
            State::Replied(_) | State::Taken => false,
        }
    }

    pub(crate) fn is_consumed(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        !matches!(*state, State::Pending)
    }

    /// Hands the stored reply to the transport. The channel stays consumed.
    pub(crate) fn take(&self) -> Option<Reply> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *state, State::Taken) {
            State::Replied(reply) => Some(reply),
            State::Pending | State::Taken => None,
        }
    }

    pub(crate) fn stand_in(&self, index: usize) -> CallbackStandIn {
        CallbackStandIn {
            index,
            channel: self.clone(),
        }
    }
}

/// Server-side stand-in for a function the caller passed at `index`.
///
/// Firing it answers the exchange with a `callback` reply. Only the first
/// firing of any stand-in bound to the same exchange is delivered.
#[derive(Clone)]
pub struct CallbackStandIn {
    index: usize,
    channel: ReplyChannel,
}

impl CallbackStandIn {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Sends `values` to the caller's function. Returns `false` if the
    /// exchange was already answered and the firing was dropped.
    pub fn fire(&self, values: Vec<Value>) -> bool {
        let sent = self.channel.send(Reply::Callback {
            idx: self.index,
            args: values,
        });
        if !sent {
            debug!(idx = self.index, "reply already sent, dropping callback firing");
        }
        sent
    }

    /// Fires the callback with a single serialized value.
    pub fn fire_with<T: Serialize + ?Sized>(&self, value: &T) -> Result<bool, MarshalError> {
        Ok(self.fire(vec![serde_json::to_value(value)?]))
    }

    pub fn is_spent(&self) -> bool {
        self.channel.is_consumed()
    }
}

impl fmt::Debug for CallbackStandIn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CallbackStandIn")
            .field("index", &self.index)
            .field("spent", &self.is_spent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_firing_wins() {
        let channel = ReplyChannel::new();
        let first = channel.stand_in(0);
        let third = channel.stand_in(2);

        assert!(!first.is_spent());
        assert!(third.fire(vec![json!("a")]));
        assert!(!first.fire(vec![json!("b")]));
        assert!(!third.fire_with("c").unwrap());
        assert!(!channel.send(Reply::Success));
        assert!(first.is_spent());

        assert_eq!(
            channel.take(),
            Some(Reply::Callback {
                idx: 2,
                args: vec![json!("a")]
            })
        );
        assert_eq!(channel.take(), None);
    }

    #[test]
    fn firing_after_take_is_dropped() {
        let channel = ReplyChannel::new();
        let cb = channel.stand_in(1);
        assert!(channel.send(Reply::Success));
        assert_eq!(channel.take(), Some(Reply::Success));
        assert!(!cb.fire(Vec::new()));
        assert_eq!(channel.take(), None);
    }
}

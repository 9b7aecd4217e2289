use std::{
    sync::{Mutex, PoisonError},
    thread,
};
use tokio::{runtime::Handle, sync::oneshot};

type Listener<T> = Box<dyn FnOnce(T) + Send + 'static>;

enum State<T> {
    Pending(Vec<Listener<T>>),
    Fired(T),
}

/// An event that fires at most once and replays its result to late subscribers.
///
/// Listeners never run inside the call to [`subscribe`](Self::subscribe) or
/// [`emit`](Self::emit). They are spawned onto the runtime the event was
/// created in, else onto the caller's runtime, else onto a fresh thread, so
/// both calls are safe from any thread.
pub struct SingleFireEvent<T> {
    state: Mutex<State<T>>,
    runtime: Option<Handle>,
}

impl<T> Default for SingleFireEvent<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::Pending(Vec::new())),
            runtime: Handle::try_current().ok(),
        }
    }
}

impl<T> SingleFireEvent<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// An event whose listeners run on `runtime`.
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            state: Mutex::new(State::Pending(Vec::new())),
            runtime: Some(runtime),
        }
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            State::Pending(listeners) => listeners.push(Box::new(listener)),
            State::Fired(result) => self.dispatch(Box::new(listener), result.clone()),
        }
    }

    /// Fires the event. Returns `false` if it had already fired, in which case
    /// `result` is discarded.
    pub fn emit(&self, result: T) -> bool {
        let listeners = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let State::Pending(listeners) = &mut *state else {
                return false;
            };
            let listeners = std::mem::take(listeners);
            *state = State::Fired(result.clone());
            listeners
        };

        for listener in listeners {
            self.dispatch(listener, result.clone());
        }
        true
    }

    pub fn has_fired(&self) -> bool {
        self.result().is_some()
    }

    /// The result, if the event has fired.
    pub fn result(&self) -> Option<T> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            State::Fired(result) => Some(result.clone()),
            State::Pending(_) => None,
        }
    }

    /// Waits for the event. Resolves to `None` only if the event is dropped
    /// without ever firing.
    ///
    /// Once fired, this returns the result without subscribing.
    pub async fn wait(&self) -> Option<T> {
        if let Some(result) = self.result() {
            return Some(result);
        }
        let (tx, rx) = oneshot::channel();
        self.subscribe(move |result| {
            _ = tx.send(result);
        });
        rx.await.ok()
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            State::Pending(listeners) => listeners.len(),
            State::Fired(_) => 0,
        }
    }

    fn dispatch(&self, listener: Listener<T>, result: T) {
        let runtime = self.runtime.clone().or_else(|| Handle::try_current().ok());
        match runtime {
            Some(runtime) => {
                runtime.spawn(async move { listener(result) });
            }
            None => {
                thread::spawn(move || listener(result));
            }
        }
    }
}

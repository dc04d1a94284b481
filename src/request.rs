use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Mutex, PoisonError},
};

use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RequestState {
    InFlight,
    Settled,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    #[error("a request is already in flight")]
    InFlight,
    #[error("this request has already been made")]
    Settled,
}

/// Per key request state: `Idle -> InFlight -> Settled`, each key good for
/// one request only.
///
/// Shared between concurrent callers, e.g. every hit of the oauth callback
/// goes through the same gate keyed by the authorization code.
pub struct RequestGate<K> {
    states: Mutex<HashMap<K, RequestState>>,
}

impl<K: Eq + Hash + Clone> RequestGate<K> {
    pub fn one_shot() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn begin(&self, key: K) -> Result<Permit<'_, K>, GateError> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        match states.get(&key) {
            Some(RequestState::InFlight) => return Err(GateError::InFlight),
            Some(RequestState::Settled) => return Err(GateError::Settled),
            None => {}
        }
        states.insert(key.clone(), RequestState::InFlight);
        Ok(Permit { gate: self, key })
    }

    fn settle(&self, key: &K) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = states.get_mut(key) {
            *state = RequestState::Settled;
        }
    }
}

/// Held for as long as the request runs, settles the key when dropped.
pub struct Permit<'g, K: Eq + Hash + Clone> {
    gate: &'g RequestGate<K>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for Permit<'_, K> {
    fn drop(&mut self) {
        self.gate.settle(&self.key);
    }
}

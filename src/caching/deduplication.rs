//! # Request Deduplication Module
//!
//! Concurrent cache misses on the same resource key would otherwise each call the
//! statistics API and each write the cache. The [`DeduplicationManager`] keeps a
//! registry of in-flight refreshes: the first request for a key becomes the
//! [`FlightLeader`] and performs the refresh, every later request becomes a
//! [`FlightFollower`] and waits for the leader's outcome.
//!
//! A leader that is dropped without completing (for example because its client
//! disconnected) removes its registry entry; its followers then observe `None`
//! and are expected to refresh on their own.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::core::error::ProxyError;

/// Serialized payload or the error the leader ran into
pub type FlightOutcome = Result<Arc<str>, ProxyError>;

type OutcomeReceiver = watch::Receiver<Option<FlightOutcome>>;

/// Registry of in-flight refreshes keyed by resource key
#[derive(Debug, Default)]
pub struct DeduplicationManager {
    in_flight: DashMap<String, OutcomeReceiver>,
}

/// Role assigned to a request by [`DeduplicationManager::join`]
pub enum Flight {
    Leader(FlightLeader),
    Follower(FlightFollower),
}

/// Performs the refresh and publishes the outcome
pub struct FlightLeader {
    manager: Arc<DeduplicationManager>,
    key: String,
    sender: Option<watch::Sender<Option<FlightOutcome>>>,
}

/// Waits for a leader's outcome
pub struct FlightFollower {
    key: String,
    receiver: OutcomeReceiver,
}

impl DeduplicationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the flight for `key`, becoming its leader if none is in progress
    pub fn join(self: &Arc<Self>, key: &str) -> Flight {
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                debug!("Joining in-flight refresh for key: {}", key);
                Flight::Follower(FlightFollower {
                    key: key.to_string(),
                    receiver: entry.get().clone(),
                })
            }
            Entry::Vacant(entry) => {
                let (sender, receiver) = watch::channel(None);
                entry.insert(receiver);
                Flight::Leader(FlightLeader {
                    manager: Arc::clone(self),
                    key: key.to_string(),
                    sender: Some(sender),
                })
            }
        }
    }

    /// Number of keys with a refresh in progress
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl FlightLeader {
    /// Publish the outcome to every follower and close the flight
    pub fn complete(mut self, outcome: FlightOutcome) {
        // Requests arriving from here on start a new flight
        self.manager.in_flight.remove(&self.key);

        if let Some(sender) = self.sender.take() {
            // No receivers left just means nobody was waiting
            let _ = sender.send(Some(outcome));
        }
    }
}

impl Drop for FlightLeader {
    fn drop(&mut self) {
        if self.sender.is_some() {
            debug!("In-flight refresh abandoned for key: {}", self.key);
            self.manager.in_flight.remove(&self.key);
        }
    }
}

impl FlightFollower {
    /// Wait for the leader; `None` if it was dropped without completing
    pub async fn wait(mut self) -> Option<FlightOutcome> {
        let outcome = match self.receiver.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => {
                debug!("Leader for key {} went away without an outcome", self.key);
                None
            }
        };
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader(flight: Flight) -> FlightLeader {
        match flight {
            Flight::Leader(leader) => leader,
            Flight::Follower(_) => panic!("expected leader"),
        }
    }

    fn follower(flight: Flight) -> FlightFollower {
        match flight {
            Flight::Follower(follower) => follower,
            Flight::Leader(_) => panic!("expected follower"),
        }
    }

    #[tokio::test]
    async fn test_followers_receive_leader_payload() {
        let manager = Arc::new(DeduplicationManager::new());

        let first = leader(manager.join("shl:games"));
        let second = follower(manager.join("shl:games"));
        let third = follower(manager.join("shl:games"));
        assert_eq!(manager.in_flight(), 1);

        let waiting = tokio::spawn(async move { (second.wait().await, third.wait().await) });

        first.complete(Ok(Arc::from("[]")));
        let (a, b) = waiting.await.unwrap();

        assert_eq!(a.unwrap().unwrap().as_ref(), "[]");
        assert_eq!(b.unwrap().unwrap().as_ref(), "[]");
        assert_eq!(manager.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_followers_receive_leader_error() {
        let manager = Arc::new(DeduplicationManager::new());

        let first = leader(manager.join("shl:standings"));
        let second = follower(manager.join("shl:standings"));

        first.complete(Err(ProxyError::upstream("503")));

        assert_eq!(second.wait().await, Some(Err(ProxyError::upstream("503"))));
    }

    #[tokio::test]
    async fn test_abandoned_leader_releases_followers() {
        let manager = Arc::new(DeduplicationManager::new());

        let first = leader(manager.join("shl:players"));
        let second = follower(manager.join("shl:players"));

        drop(first);

        assert_eq!(second.wait().await, None);
        assert_eq!(manager.in_flight(), 0);
        assert!(matches!(manager.join("shl:players"), Flight::Leader(_)));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let manager = Arc::new(DeduplicationManager::new());

        let _games = leader(manager.join("shl:games"));
        let _players = leader(manager.join("shl:players"));

        assert_eq!(manager.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_new_flight_after_completion() {
        let manager = Arc::new(DeduplicationManager::new());

        leader(manager.join("shl:goalies")).complete(Ok(Arc::from("[]")));

        assert!(matches!(manager.join("shl:goalies"), Flight::Leader(_)));
    }
}

use crate::dtos::ChatEventDTO;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

/// Signals delivered to the writer task of a connection
#[derive(Debug)]
pub enum InternalSignal {
    Shutdown,
    Event(ChatEventDTO),
}

/// One channel per online user. A reconnect replaces the previous channel.
#[derive(Default)]
pub struct UserMap {
    users_online: DashMap<i64, UnboundedSender<InternalSignal>>,
}

impl UserMap {
    pub fn new() -> Self {
        UserMap {
            users_online: DashMap::new(),
        }
    }

    /// Register the channel of a new connection. An older connection of the
    /// same user is told to shut down.
    #[instrument(skip(self, tx))]
    pub fn register_online(&self, user_id: i64, tx: UnboundedSender<InternalSignal>) {
        if let Some(previous) = self.users_online.insert(user_id, tx) {
            info!("Replacing previous connection of user {}", user_id);
            let _ = previous.send(InternalSignal::Shutdown);
        }
        info!("Total online users: {}", self.users_online.len());
    }

    /// Remove the user only if `tx` is still the registered channel,
    /// so a closing old connection never evicts a newer one
    #[instrument(skip(self, tx))]
    pub fn remove_if_same(&self, user_id: &i64, tx: &UnboundedSender<InternalSignal>) -> bool {
        let removed = self
            .users_online
            .remove_if(user_id, |_, current| current.same_channel(tx))
            .is_some();
        if removed {
            info!("User removed from online");
        } else {
            debug!("Newer connection registered, keeping it");
        }
        removed
    }

    /// Returns true when the signal was handed to an online connection
    #[instrument(skip(self, signal))]
    pub fn send_if_online(&self, user_id: &i64, signal: InternalSignal) -> bool {
        match self.users_online.get(user_id) {
            Some(entry) => match entry.value().send(signal) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to deliver signal: {:?}", e);
                    false
                }
            },
            None => {
                debug!("User {} not online", user_id);
                false
            }
        }
    }

    pub fn online_count(&self) -> usize {
        self.users_online.len()
    }

    pub fn is_user_online(&self, user_id: &i64) -> bool {
        self.users_online.contains_key(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_reconnect_shuts_down_old_connection() {
        let map = UserMap::new();
        let (old_tx, mut old_rx) = unbounded_channel();
        let (new_tx, _new_rx) = unbounded_channel();

        map.register_online(2, old_tx.clone());
        map.register_online(2, new_tx.clone());
        assert!(matches!(old_rx.try_recv(), Ok(InternalSignal::Shutdown)));
        assert_eq!(map.online_count(), 1);

        assert!(!map.remove_if_same(&2, &old_tx));
        assert!(map.is_user_online(&2));
        assert!(map.remove_if_same(&2, &new_tx));
        assert!(!map.is_user_online(&2));
    }

    #[test]
    fn test_send_if_online() {
        let map = UserMap::new();
        let (tx, mut rx) = unbounded_channel();
        assert!(!map.send_if_online(&3, InternalSignal::Shutdown));

        map.register_online(3, tx);
        let event = ChatEventDTO::Error {
            code: 400,
            message: "bad".to_string(),
        };
        assert!(map.send_if_online(&3, InternalSignal::Event(event.clone())));
        match rx.try_recv() {
            Ok(InternalSignal::Event(received)) => assert_eq!(received, event),
            other => panic!("unexpected signal: {other:?}"),
        }
    }
}

//! In-memory, per-session conversation storage.
//!
//! Each session identifier owns one [`Conversation`] behind its own
//! async mutex, so concurrent requests against the same session
//! serialize their appends instead of interleaving. Conversations are
//! created empty on first access and live for the process lifetime;
//! there is no persistence.

use crate::types::Conversation;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Session identifier used when a client does not send one.
pub const DEFAULT_SESSION: &str = "default";

/// Shared handle to one session's conversation.
pub type SharedConversation = Arc<Mutex<Conversation>>;

/// Process-lifetime map from session identifier to conversation.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SharedConversation>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the conversation for a session, creating it empty on first access.
    pub fn conversation(&self, session_id: &str) -> SharedConversation {
        {
            let sessions = self.sessions.read().expect("session map poisoned");
            if let Some(convo) = sessions.get(session_id) {
                return Arc::clone(convo);
            }
        }
        let mut sessions = self.sessions.write().expect("session map poisoned");
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Conversation::new()))),
        )
    }

    /// Reset a session's conversation to empty.
    ///
    /// The reset happens in place so handles already held by in-flight
    /// requests observe it.
    pub async fn clear(&self, session_id: &str) {
        let convo = {
            let sessions = self.sessions.read().expect("session map poisoned");
            sessions.get(session_id).map(Arc::clone)
        };
        if let Some(convo) = convo {
            convo.lock().await.clear();
        }
    }

    /// Number of sessions seen so far.
    pub fn session_count(&self) -> usize {
        self.sessions.read().expect("session map poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_created_empty_on_first_access() {
        let store = SessionStore::new();
        let convo = store.conversation("s1");
        assert!(convo.lock().await.is_empty());
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_same_handle_across_accesses() {
        let store = SessionStore::new();
        let a = store.conversation("s1");
        a.lock().await.push(Message::user("hello"));

        let b = store.conversation("s1");
        assert_eq!(b.lock().await.len(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store
            .conversation("alice")
            .lock()
            .await
            .push(Message::user("hi from alice"));

        assert!(store.conversation("bob").lock().await.is_empty());
        assert_eq!(store.conversation("alice").lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_regardless_of_contents() {
        let store = SessionStore::new();
        let convo = store.conversation("s1");
        {
            let mut convo = convo.lock().await;
            convo.push(Message::user("one"));
            convo.push(Message::assistant("two"));
        }

        store.clear("s1").await;
        // The pre-existing handle observes the reset too.
        assert!(convo.lock().await.is_empty());

        // Clearing an unknown session is a no-op.
        store.clear("never-seen").await;
    }
}

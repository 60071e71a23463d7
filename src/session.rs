use std::collections::HashMap;
use std::fmt;

use crate::types::{Message, Role};

/// Opaque identifier handed out by whatever hosts the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Message history of one conversation.
///
/// The history always starts with the system prompt it was created with.
/// Only the conversation loop appends to it, so a turn in flight holds the
/// only `&mut` to the session.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    history: Vec<Message>,
}

impl Session {
    pub fn new(id: SessionId, system_prompt: &str) -> Self {
        Self {
            id,
            history: vec![Message::system(system_prompt)],
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn system_prompt(&self) -> &str {
        &self.history[0].content
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Content of the last assistant reply, if any turn has completed.
    pub fn last_reply(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(|message| message.content.as_str())
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Drop everything after the first `len` messages. The system prompt stays.
    pub(crate) fn rollback(&mut self, len: usize) {
        self.history.truncate(len.max(1));
    }
}

/// Per-host storage of live sessions, keyed by [`SessionId`].
#[derive(Debug)]
pub struct SessionStore {
    system_prompt: String,
    sessions: HashMap<SessionId, Session>,
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            sessions: HashMap::new(),
        }
    }

    /// Returns the session for `id`, creating it on first contact.
    pub fn open(&mut self, id: &SessionId) -> &mut Session {
        let system_prompt = &self.system_prompt;
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| Session::new(id.clone(), system_prompt))
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Ends a session; its history is discarded with the returned value.
    pub fn close(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_seeded_with_system_prompt() {
        let session = Session::new("abc".into(), "be helpful");

        assert_eq!(session.history(), &[Message::system("be helpful")]);
        assert_eq!(session.system_prompt(), "be helpful");
        assert_eq!(session.last_reply(), None);
    }

    #[test]
    fn test_rollback_never_drops_system_prompt() {
        let mut session = Session::new("abc".into(), "be helpful");
        session.push(Message::user("hi"));
        session.push(Message::assistant("hello"));
        assert_eq!(session.last_reply(), Some("hello"));

        session.rollback(0);
        assert_eq!(session.len(), 1);
        assert_eq!(session.history()[0], Message::system("be helpful"));
    }

    #[test]
    fn test_session_id_displays_verbatim() {
        let id = SessionId::from(String::from("chat-42"));
        assert_eq!(id, SessionId::new("chat-42"));
        assert_eq!(id.to_string(), "chat-42");
    }

    #[test]
    fn test_store_creates_once_and_closes() {
        let mut store = SessionStore::new("be helpful");
        let id = SessionId::from("user-1");

        store.open(&id).push(Message::user("hi"));
        assert_eq!(store.open(&id).len(), 2);
        assert_eq!(store.len(), 1);

        let other = SessionId::from("user-2");
        assert_eq!(store.open(&other).len(), 1);
        assert_eq!(store.len(), 2);

        let closed = store.close(&id).map(|session| session.len());
        assert_eq!(closed, Some(2));
        assert!(store.get(&id).is_none());
        assert_eq!(store.open(&id).len(), 1);
    }
}

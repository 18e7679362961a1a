//! Domain values decoded from REST responses.

use std::collections::BTreeMap;
use std::ops::{Index, Range};

use serde::{Deserialize, Deserializer, Serialize};

fn default_role() -> String {
    "user".to_string()
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Message(role={}, content={})", self.role, self.content)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Message>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Message>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A stored conversation. Mutations are local only and never synced back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub name: String,
    #[serde(default, alias = "message", deserialize_with = "null_as_empty")]
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: i64, name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id,
            name: name.into(),
            messages,
        }
    }

    /// Number of messages.
    pub fn length(&self) -> usize {
        self.messages.len()
    }

    /// Truncate to at most `length` messages, dropping from the tail.
    pub fn set_length(&mut self, length: usize) {
        self.messages.truncate(length);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The first `limit` messages, or all of them.
    pub fn get_messages(&self, limit: Option<usize>) -> &[Message] {
        match limit {
            Some(limit) => &self.messages[..limit.min(self.messages.len())],
            None => &self.messages,
        }
    }

    /// Insert at the front.
    pub fn insert_message(&mut self, message: Message) {
        self.messages.insert(0, message);
    }

    /// Insert each message at the front in turn; the last one ends up first.
    pub fn insert_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.insert_message(message);
        }
    }

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn append_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Remove the message at `index`, if present.
    pub fn delete_message(&mut self, index: usize) -> Option<Message> {
        if index < self.messages.len() {
            Some(self.messages.remove(index))
        } else {
            None
        }
    }

    /// Remove messages in `range`, clamped to the current length.
    pub fn delete_messages(&mut self, range: Range<usize>) -> Vec<Message> {
        let end = range.end.min(self.messages.len());
        let start = range.start.min(end);
        self.messages.drain(start..end).collect()
    }

    pub fn contains(&self, message: &Message) -> bool {
        self.messages.contains(message)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl Index<usize> for Conversation {
    type Output = Message;

    fn index(&self, index: usize) -> &Message {
        &self.messages[index]
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl std::fmt::Display for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Conversation(id={}, name={}, length={})",
            self.id,
            self.name,
            self.length()
        )
    }
}

/// Subscription status; `expired_in_days` is the remaining term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub is_subscribed: bool,
    #[serde(rename = "expired")]
    pub expired_in_days: i64,
}

impl std::fmt::Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Subscription(is_subscribed={}, expired={})",
            self.is_subscribed, self.expired_in_days
        )
    }
}

/// Package flags reported by `/package`, e.g. `cert` and `teenager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Package(pub BTreeMap<String, bool>);

impl Default for Package {
    fn default() -> Self {
        let mut flags = BTreeMap::new();
        flags.insert("cert".to_string(), false);
        flags.insert("teenager".to_string(), false);
        Package(flags)
    }
}

impl Package {
    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    pub fn cert(&self) -> bool {
        self.get("cert").unwrap_or(false)
    }

    pub fn teenager(&self) -> bool {
        self.get("teenager").unwrap_or(false)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

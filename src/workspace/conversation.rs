//! Conversation (thread) entity and manager.

use std::collections::{HashMap, HashSet};

use crate::oracle::Oracle;
use crate::workspace::directory::DirectoryId;

pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentType {
    Codex,
    Claude,
    Cursor,
    Terminal,
    Critique,
}

/// Per-agent-type adapter state payload: generalizes a per-session
/// `resume_id` bookkeeping field
/// resume bookkeeping to every agent type).
#[derive(Debug, Clone, Default)]
pub struct AdapterState {
    /// Native resumable id for the remote agent, if this session was (or
    /// can be) resumed (e.g. a Claude conversation id).
    pub resume_id: Option<String>,
    /// Free-form adapter-specific key/value bag merged in from session
    /// events received while the conversation is live.
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Standard,
    Yolo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationLifecycleState {
    Init,
    Starting,
    Active,
    Detached,
    Exited,
    Archived,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub session_id: SessionId,
    pub directory_id: Option<DirectoryId>,
    pub agent_type: AgentType,
    pub title: Option<String>,
    pub live: bool,
    pub last_output_cursor: Option<u64>,
    pub adapter_state: AdapterState,
    pub controller_id: Option<String>,
    pub process_id: Option<u32>,
    pub oracle: Oracle,
    pub start_in_flight: bool,
    pub state: ConversationLifecycleState,
    pub launch_mode: LaunchMode,
    /// Monotonically increasing insertion cursor used to keep the sidebar
    /// ordering stable.
    pub order_cursor: u64,
}

impl Conversation {
    pub fn new(session_id: SessionId, agent_type: AgentType, order_cursor: u64) -> Self {
        Self {
            session_id,
            directory_id: None,
            agent_type,
            title: None,
            live: false,
            last_output_cursor: None,
            adapter_state: AdapterState::default(),
            controller_id: None,
            process_id: None,
            oracle: Oracle::new(80, 24),
            start_in_flight: false,
            state: ConversationLifecycleState::Init,
            launch_mode: LaunchMode::Standard,
            order_cursor,
        }
    }
}

#[derive(Default)]
pub struct ConversationManager {
    conversations: HashMap<SessionId, Conversation>,
    /// Ordered by `order_cursor` ascending, kept denormalized for O(1) reads
    /// so reads stay O(1).
    order: Vec<SessionId>,
    /// Sessions with a live envelope subscription.
    subscribed: HashSet<SessionId>,
}

impl ConversationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, conversation: Conversation) {
        let id = conversation.session_id.clone();
        if !self.conversations.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.conversations.insert(id, conversation);
        self.resort();
    }

    fn resort(&mut self) {
        self.order.sort_by_key(|sid| {
            self.conversations
                .get(sid)
                .map(|c| c.order_cursor)
                .unwrap_or(u64::MAX)
        });
    }

    /// Tear down subscription before removing.
    pub fn delete(&mut self, id: &str) {
        self.subscribed.remove(id);
        self.conversations.remove(id);
        self.order.retain(|existing| existing != id);
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.conversations.contains_key(id)
    }

    /// Ordered session ids: the set of non-removed
    /// conversations ordered by the stable observed-event cursor.
    pub fn ordered_ids(&self) -> &[SessionId] {
        &self.order
    }

    pub fn mark_subscribed(&mut self, id: &str) {
        self.subscribed.insert(id.to_string());
    }

    pub fn mark_unsubscribed(&mut self, id: &str) {
        self.subscribed.remove(id);
    }

    pub fn is_subscribed(&self, id: &str) -> bool {
        self.subscribed.contains(id)
    }

    /// True if every live conversation has a subscription.
    pub fn all_live_conversations_are_subscribed(&self) -> bool {
        self.conversations
            .values()
            .filter(|c| c.live)
            .all(|c| self.subscribed.contains(&c.session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_ids_reflects_order_cursor() {
        let mut manager = ConversationManager::new();
        manager.upsert(Conversation::new("b".to_string(), AgentType::Codex, 2));
        manager.upsert(Conversation::new("a".to_string(), AgentType::Codex, 1));
        assert_eq!(manager.ordered_ids(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn delete_tears_down_subscription_first() {
        let mut manager = ConversationManager::new();
        manager.upsert(Conversation::new("a".to_string(), AgentType::Codex, 1));
        manager.mark_subscribed("a");
        manager.delete("a");
        assert!(!manager.is_subscribed("a"));
        assert!(manager.get("a").is_none());
    }

    #[test]
    fn invariant_i3_detects_missing_subscription() {
        let mut manager = ConversationManager::new();
        let mut convo = Conversation::new("a".to_string(), AgentType::Codex, 1);
        convo.live = true;
        manager.upsert(convo);
        assert!(!manager.all_live_conversations_are_subscribed());
        manager.mark_subscribed("a");
        assert!(manager.all_live_conversations_are_subscribed());
    }
}

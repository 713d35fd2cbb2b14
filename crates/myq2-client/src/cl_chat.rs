// cl_chat.rs -- chat enhancements (R1Q2/Q2Pro feature)
//
// Word filter, ignore list and logging are a UI/chat collaborator out
// of scope here; kept as no-op stubs behind the interface cl_main.rs
// calls. The outgoing message queue (packet-loss resilience) is real
// logic and is kept.

use std::sync::{LazyLock, Mutex};

use myq2_common::common::com_printf;

/// Maximum length of a player name
const MAX_NAME_LEN: usize = 16;

/// Chat filter and ignore state. Word filter, ignore list and logging
/// are not implemented; every player passes through unfiltered.
#[derive(Default)]
pub struct ChatState {
    pub filter_enabled: bool,
    pub log_enabled: bool,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Global chat state
pub static CHAT_STATE: LazyLock<Mutex<ChatState>> =
    LazyLock::new(|| Mutex::new(ChatState::new()));

// ============================================================
// Chat Message Queue (for packet loss resilience)
// ============================================================

/// A queued outgoing chat message
#[derive(Debug, Clone)]
pub struct QueuedChatMessage {
    pub message: String,
    /// Time the message was queued (client realtime)
    pub queue_time: i32,
    pub attempts: i32,
    pub team: bool,
}

/// Queue for outgoing chat messages during packet loss. Messages are
/// queued when network issues are detected and sent automatically when
/// the connection is restored.
#[derive(Debug, Clone)]
pub struct ChatMessageQueue {
    pub queue: Vec<QueuedChatMessage>,
    pub enabled: bool,
    pub max_queue_size: usize,
    pub max_message_age_ms: i32,
    pub max_attempts: i32,
}

impl Default for ChatMessageQueue {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            enabled: true,
            max_queue_size: 8,
            max_message_age_ms: 10000,
            max_attempts: 3,
        }
    }
}

impl ChatMessageQueue {
    pub fn queue_message(&mut self, message: &str, team: bool, current_time: i32) -> bool {
        if !self.enabled || self.queue.len() >= self.max_queue_size {
            return false;
        }
        if message.trim().is_empty() {
            return false;
        }
        self.queue.push(QueuedChatMessage {
            message: message.to_string(),
            queue_time: current_time,
            attempts: 0,
            team,
        });
        true
    }

    pub fn get_next(&mut self, current_time: i32) -> Option<QueuedChatMessage> {
        self.queue.retain(|msg| current_time - msg.queue_time < self.max_message_age_ms);
        if self.queue.is_empty() {
            return None;
        }
        Some(self.queue.remove(0))
    }

    pub fn retry_message(&mut self, mut msg: QueuedChatMessage) {
        msg.attempts += 1;
        if msg.attempts < self.max_attempts {
            self.queue.insert(0, msg);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Global chat message queue
pub static CHAT_QUEUE: LazyLock<Mutex<ChatMessageQueue>> =
    LazyLock::new(ChatMessageQueue::default);

pub fn chat_queue_outgoing(message: &str, team: bool, current_time: i32) -> bool {
    let mut queue = CHAT_QUEUE.lock().unwrap();
    queue.queue_message(message, team, current_time)
}

pub fn chat_get_queued(current_time: i32) -> Option<QueuedChatMessage> {
    let mut queue = CHAT_QUEUE.lock().unwrap();
    queue.get_next(current_time)
}

pub fn chat_retry_message(msg: QueuedChatMessage) {
    let mut queue = CHAT_QUEUE.lock().unwrap();
    queue.retry_message(msg);
}

pub fn chat_has_queued() -> bool {
    let queue = CHAT_QUEUE.lock().unwrap();
    queue.has_pending()
}

pub fn chat_clear_queue() {
    let mut queue = CHAT_QUEUE.lock().unwrap();
    queue.clear();
}

// ============================================================
// Public API
// ============================================================

/// Initialize the chat system. Call on client init.
pub fn chat_init() {}

/// Process an incoming chat message. Filtering/ignore/logging are not
/// implemented; the message always passes through unchanged.
pub fn chat_process_message(_sender: &str, message: &str) -> Option<String> {
    Some(message.to_string())
}

/// Extract sender name from a chat message, formatted as "name: message".
pub fn chat_extract_sender(message: &str) -> Option<&str> {
    if let Some(colon_pos) = message.find(": ") {
        let name = &message[..colon_pos];
        if name.len() <= MAX_NAME_LEN && !name.starts_with('[') {
            return Some(name);
        }
    }
    None
}

pub fn chat_set_filter_enabled(enabled: bool) {
    let mut state = CHAT_STATE.lock().unwrap();
    state.filter_enabled = enabled;
}

pub fn chat_set_log_enabled(enabled: bool) {
    let mut state = CHAT_STATE.lock().unwrap();
    state.log_enabled = enabled;
}

// ============================================================
// Console Commands
// ============================================================

pub fn cmd_ignore(_args: &str) {
    com_printf("Ignore list is not supported.\n");
}

pub fn cmd_unignore(_args: &str) {
    com_printf("Ignore list is not supported.\n");
}

pub fn cmd_ignorelist() {
    com_printf("No players ignored.\n");
}

pub fn cmd_filter_reload() {
    com_printf("Word filter is not supported.\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sender() {
        assert_eq!(chat_extract_sender("Player: hello"), Some("Player"));
        assert_eq!(chat_extract_sender("[Server]: message"), None);
        assert_eq!(chat_extract_sender("no colon here"), None);
    }

    #[test]
    fn test_queue_roundtrip() {
        let mut queue = ChatMessageQueue::default();
        assert!(queue.queue_message("hi", false, 0));
        let msg = queue.get_next(10).unwrap();
        assert_eq!(msg.message, "hi");
        assert!(queue.get_next(20).is_none());
    }
}

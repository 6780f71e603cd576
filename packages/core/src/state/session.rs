// Состояние одной открытой чат-сессии

use crate::protocol::channel::ChatScope;
use crate::protocol::events::{ChatClientEvent, ChatMessage, ChatServerEvent, EntityId};
use crate::state::conversations::ConversationActivity;
use crate::utils::time;

/// Жизненный цикл сессии: Idle -> Connecting -> Live -> Closed.
/// Из Closed выхода нет; повторное открытие — новая сессия.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Live,
    Closed,
}

/// Результат обработки серверного события
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    /// Нужно ли проиграть звуковой сигнал
    pub chime: bool,
    /// Активность для синхронизации списка бесед
    pub activity: Option<(EntityId, ConversationActivity)>,
}

/// Одна открытая беседа: лог сообщений и машина состояний соединения
#[derive(Debug)]
pub struct ChatSession {
    scope: ChatScope,
    conversation_id: Option<EntityId>,
    self_id: EntityId,
    state: SessionState,
    messages: Vec<ChatMessage>,
    /// Окно беседы в фокусе: входящие не озвучиваются
    focused: bool,
}

impl ChatSession {
    pub fn new(scope: ChatScope, self_id: EntityId, conversation_id: Option<EntityId>) -> Self {
        Self {
            scope,
            conversation_id,
            self_id,
            state: SessionState::Idle,
            messages: Vec::new(),
            focused: true,
        }
    }

    pub fn scope(&self) -> &ChatScope {
        &self.scope
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn conversation_id(&self) -> Option<&EntityId> {
        self.conversation_id.as_ref()
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn mark_connecting(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Connecting;
        }
    }

    pub fn mark_open(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Live;
        }
    }

    pub fn mark_failed(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Закрыть сессию; идемпотентно. После закрытия все события
    /// транспорта игнорируются: канал мог пережить окно беседы.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Обработать событие сервера. None — событие проигнорировано
    /// (сессия не Live, либо тип кадра неизвестен).
    pub fn handle_event(&mut self, event: ChatServerEvent) -> Option<SessionUpdate> {
        if self.state != SessionState::Live {
            return None;
        }

        match event {
            ChatServerEvent::History { messages } => {
                // История приходит одним кадром и замещает лог целиком
                self.messages = messages;
                Some(SessionUpdate::default())
            }
            ChatServerEvent::Message { message } => {
                let from_self = message.sender_id == self.self_id;
                let update = SessionUpdate {
                    chime: !from_self && !self.focused,
                    activity: self.conversation_id.clone().map(|id| {
                        (
                            id,
                            ConversationActivity {
                                last_message: Some(message.content.clone()),
                                updated_at: Some(
                                    message.created_at_utc().unwrap_or_else(time::now_utc),
                                ),
                                unread_count: None,
                            },
                        )
                    }),
                };
                self.messages.push(message);
                Some(update)
            }
            ChatServerEvent::Unknown => None,
        }
    }

    /// Подготовить исходящее сообщение. Текст обрезается по краям;
    /// пустой ввод и не-Live сессия дают None. Локально сообщение не
    /// добавляется: лог пополняется только серверным эхом.
    pub fn compose_outbound(&self, text: &str) -> Option<ChatClientEvent> {
        if self.state != SessionState::Live {
            return None;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(ChatClientEvent::Message {
            content: trimmed.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ChatScope {
        ChatScope {
            shop_id: EntityId::Number(101),
            buyer_id: Some(EntityId::Number(501)),
            product_id: None,
        }
    }

    fn live_session() -> ChatSession {
        let mut session = ChatSession::new(scope(), EntityId::Number(501), Some(EntityId::from("c1")));
        session.mark_connecting();
        session.mark_open();
        session
    }

    fn message(id: i64, sender: i64, content: &str) -> ChatMessage {
        ChatMessage {
            id: Some(EntityId::Number(id)),
            sender_id: EntityId::Number(sender),
            content: content.to_string(),
            created_at: Some("2024-05-01T10:00:00Z".to_string()),
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut session = ChatSession::new(scope(), EntityId::Number(501), None);
        assert_eq!(session.state(), SessionState::Idle);
        session.mark_connecting();
        assert_eq!(session.state(), SessionState::Connecting);
        session.mark_open();
        assert_eq!(session.state(), SessionState::Live);
        session.close();
        assert_eq!(session.state(), SessionState::Closed);

        // Закрытие идемпотентно, mark_open из Closed невозможен
        session.close();
        session.mark_open();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_history_then_live_messages() {
        // История замещает лог, новые сообщения добавляются в конец
        let mut session = live_session();

        let history = ChatServerEvent::History {
            messages: vec![message(1, 101, "welcome"), message(2, 501, "hi")],
        };
        session.handle_event(history).unwrap();
        assert_eq!(session.messages().len(), 2);

        session
            .handle_event(ChatServerEvent::Message {
                message: message(3, 101, "how can I help?"),
            })
            .unwrap();
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[2].content, "how can I help?");
    }

    #[test]
    fn test_chime_only_for_unfocused_incoming() {
        let mut session = live_session();

        // Своё эхо — без сигнала
        let update = session
            .handle_event(ChatServerEvent::Message {
                message: message(1, 501, "mine"),
            })
            .unwrap();
        assert!(!update.chime);

        // Чужое при фокусе — без сигнала
        let update = session
            .handle_event(ChatServerEvent::Message {
                message: message(2, 101, "theirs"),
            })
            .unwrap();
        assert!(!update.chime);

        // Чужое без фокуса — сигнал
        session.set_focused(false);
        let update = session
            .handle_event(ChatServerEvent::Message {
                message: message(3, 101, "theirs again"),
            })
            .unwrap();
        assert!(update.chime);
    }

    #[test]
    fn test_message_produces_activity() {
        let mut session = live_session();
        let update = session
            .handle_event(ChatServerEvent::Message {
                message: message(1, 101, "hello"),
            })
            .unwrap();

        let (id, activity) = update.activity.unwrap();
        assert_eq!(id, EntityId::from("c1"));
        assert_eq!(activity.last_message.as_deref(), Some("hello"));
        assert!(activity.updated_at.is_some());
        assert!(activity.unread_count.is_none());
    }

    #[test]
    fn test_events_ignored_after_close() {
        let mut session = live_session();
        session.close();

        let update = session.handle_event(ChatServerEvent::Message {
            message: message(1, 101, "late"),
        });
        assert!(update.is_none());
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_compose_outbound_trims_and_rejects_empty() {
        // Пробельный ввод не отправляется
        let session = live_session();
        assert!(session.compose_outbound("   ").is_none());
        assert!(session.compose_outbound("").is_none());

        let event = session.compose_outbound("  hello  ").unwrap();
        assert_eq!(
            event,
            ChatClientEvent::Message {
                content: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_compose_outbound_requires_live() {
        let mut session = ChatSession::new(scope(), EntityId::Number(501), None);
        assert!(session.compose_outbound("hello").is_none());
        session.mark_connecting();
        assert!(session.compose_outbound("hello").is_none());
        session.mark_open();
        assert!(session.compose_outbound("hello").is_some());
        session.close();
        assert!(session.compose_outbound("hello").is_none());
    }

    #[test]
    fn test_no_local_append_on_send() {
        // Лог пополняется только серверным эхом
        let session = live_session();
        let _ = session.compose_outbound("hello");
        assert!(session.messages().is_empty());
    }
}

// Типы событий реального времени
// Соответствуют JSON-кадрам каналов уведомлений и чата

use crate::utils::error::{Result, StorechatError};
use crate::utils::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор сущности: сервер присылает как число или строку
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId::Number(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId::Text(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        EntityId::Text(value)
    }
}

/// Обновление статуса заказа (канал уведомлений)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusData {
    pub order_id: EntityId,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status_label: Option<String>,
}

/// Сводка по беседе (канал уведомлений)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummaryData {
    pub conversation_id: EntityId,
    #[serde(default)]
    pub buyer_id: Option<EntityId>,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub shop_id: Option<EntityId>,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub product_id: Option<EntityId>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<String>,
    #[serde(default)]
    pub unread_count: Option<u32>,
    #[serde(default)]
    pub sender_id: Option<EntityId>,
}

/// Входящие события канала уведомлений.
/// Неизвестные типы парсятся в Unknown и игнорируются получателем.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    OrderStatus(OrderStatusData),
    ChatSummary(ChatSummaryData),
    #[serde(other)]
    Unknown,
}

/// Сообщение чата
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Отсутствует у локально неподтверждённых сообщений
    #[serde(default)]
    pub id: Option<EntityId>,
    pub sender_id: EntityId,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ChatMessage {
    /// Распарсенный timestamp создания, если сервер его прислал
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(time::parse_timestamp)
    }
}

/// Входящие события чат-канала (сервер -> клиент)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatServerEvent {
    History {
        #[serde(default)]
        messages: Vec<ChatMessage>,
    },
    Message {
        message: ChatMessage,
    },
    #[serde(other)]
    Unknown,
}

/// Исходящие события чат-канала (клиент -> сервер)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatClientEvent {
    Message { content: String },
}

/// Распарсить событие канала уведомлений из JSON-кадра
pub fn parse_notification_event(raw: &str) -> Result<NotificationEvent> {
    serde_json::from_str(raw)
        .map_err(|e| StorechatError::SerializationError(format!("Notification frame: {}", e)))
}

/// Распарсить событие чат-канала из JSON-кадра
pub fn parse_chat_event(raw: &str) -> Result<ChatServerEvent> {
    serde_json::from_str(raw)
        .map_err(|e| StorechatError::SerializationError(format!("Chat frame: {}", e)))
}

/// Сериализовать исходящее событие в JSON-кадр
pub fn encode_client_event(event: &ChatClientEvent) -> Result<String> {
    serde_json::to_string(event)
        .map_err(|e| StorechatError::SerializationError(format!("Client frame: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_number_or_string() {
        let n: EntityId = serde_json::from_str("42").unwrap();
        let s: EntityId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(n, EntityId::Number(42));
        assert_eq!(s, EntityId::Text("42".to_string()));
        assert_eq!(n.to_string(), s.to_string());
    }

    #[test]
    fn test_parse_order_status() {
        let raw = r#"{"type":"order_status","order_id":17,"status_label":"shipped"}"#;
        let event = parse_notification_event(raw).unwrap();
        match event {
            NotificationEvent::OrderStatus(data) => {
                assert_eq!(data.order_id, EntityId::Number(17));
                assert_eq!(data.status_label.as_deref(), Some("shipped"));
                assert!(data.message.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_chat_summary() {
        let raw = r#"{
            "type": "chat_summary",
            "conversation_id": "c1",
            "shop_id": 101,
            "last_message": "hi",
            "last_message_at": "2024-05-01T10:30:00Z",
            "unread_count": 3,
            "sender_id": 501
        }"#;
        let event = parse_notification_event(raw).unwrap();
        match event {
            NotificationEvent::ChatSummary(data) => {
                assert_eq!(data.conversation_id, EntityId::Text("c1".to_string()));
                assert_eq!(data.unread_count, Some(3));
                assert_eq!(data.sender_id, Some(EntityId::Number(501)));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_ignored_not_error() {
        let event = parse_notification_event(r#"{"type":"presence","user_id":1}"#).unwrap();
        assert_eq!(event, NotificationEvent::Unknown);

        let event = parse_chat_event(r#"{"type":"typing"}"#).unwrap();
        assert_eq!(event, ChatServerEvent::Unknown);
    }

    #[test]
    fn test_malformed_frame_is_error() {
        assert!(parse_notification_event("not json").is_err());
        assert!(parse_chat_event("{\"no_type\":1}").is_err());
    }

    #[test]
    fn test_parse_history_and_message() {
        let raw = r#"{"type":"history","messages":[
            {"id":1,"sender_id":501,"content":"hello","created_at":"2024-05-01T10:00:00Z"},
            {"id":2,"sender_id":101,"content":"hi","created_at":"2024-05-01T10:01:00Z"}
        ]}"#;
        match parse_chat_event(raw).unwrap() {
            ChatServerEvent::History { messages } => {
                assert_eq!(messages.len(), 2);
                assert!(messages[0].created_at_utc().is_some());
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let raw = r#"{"type":"message","message":{"sender_id":501,"content":"ok"}}"#;
        match parse_chat_event(raw).unwrap() {
            ChatServerEvent::Message { message } => {
                assert!(message.id.is_none());
                assert!(message.created_at_utc().is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_encode_client_event() {
        let frame = encode_client_event(&ChatClientEvent::Message {
            content: "hello".to_string(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["content"], "hello");
    }
}

// Состояние списка бесед

use crate::protocol::events::{ChatSummaryData, EntityId};
use crate::utils::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Сырая сводка беседы из REST backfill.
/// Поля опциональны: бэкенд исторически отдаёт несколько вариантов имён.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(default, alias = "conversation_id")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub shop_id: Option<EntityId>,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub buyer_id: Option<EntityId>,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub product_id: Option<EntityId>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, alias = "last_message_at")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub unread_count: Option<u32>,
}

impl From<&ChatSummaryData> for ConversationSummary {
    fn from(event: &ChatSummaryData) -> Self {
        Self {
            id: Some(event.conversation_id.clone()),
            shop_id: event.shop_id.clone(),
            shop_name: event.shop_name.clone(),
            buyer_id: event.buyer_id.clone(),
            buyer_name: event.buyer_name.clone(),
            product_id: event.product_id.clone(),
            product_name: event.product_name.clone(),
            last_message: event.last_message.clone(),
            updated_at: event.last_message_at.clone(),
            unread_count: event.unread_count,
        }
    }
}

/// Нормализованная беседа покупатель <-> магазин
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: EntityId,
    pub shop_id: Option<EntityId>,
    pub shop_name: String,
    pub buyer_id: Option<EntityId>,
    pub buyer_name: String,
    pub product_id: Option<EntityId>,
    pub product_name: Option<String>,
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
    pub unread_count: u32,
}

fn id_or_placeholder(id: &Option<EntityId>) -> String {
    id.as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "?".to_string())
}

impl Conversation {
    /// Нормализация сырой сводки: отсутствующие поля заменяются
    /// синтетическими заглушками, id без сервера выводится из пары
    /// магазин-покупатель.
    pub fn from_summary(summary: &ConversationSummary, now: DateTime<Utc>) -> Self {
        let id = summary.id.clone().unwrap_or_else(|| {
            let shop = summary
                .shop_id
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "shop".to_string());
            let buyer = summary
                .buyer_id
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "buyer".to_string());
            EntityId::Text(format!("{}-{}", shop, buyer))
        });

        let shop_name = summary
            .shop_name
            .clone()
            .unwrap_or_else(|| format!("Shop #{}", id_or_placeholder(&summary.shop_id)));
        let buyer_name = summary
            .buyer_name
            .clone()
            .unwrap_or_else(|| format!("Customer #{}", id_or_placeholder(&summary.buyer_id)));

        let updated_at = summary
            .updated_at
            .as_deref()
            .and_then(time::parse_timestamp)
            .unwrap_or(now);

        Self {
            id,
            shop_id: summary.shop_id.clone(),
            shop_name,
            buyer_id: summary.buyer_id.clone(),
            buyer_name,
            product_id: summary.product_id.clone(),
            product_name: summary.product_name.clone(),
            last_message: summary
                .last_message
                .clone()
                .unwrap_or_else(|| "No messages yet".to_string()),
            updated_at,
            unread_count: summary.unread_count.unwrap_or(0),
        }
    }

    /// updatedAt монотонен: более поздние события с более ранним
    /// timestamp не откатывают порядок
    fn bump_updated_at(&mut self, candidate: DateTime<Utc>) {
        self.updated_at = self.updated_at.max(candidate);
    }
}

/// Активность открытой беседы (сообщение в живой сессии)
#[derive(Debug, Clone, Default)]
pub struct ConversationActivity {
    pub last_message: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// None = беседа открыта, существующее значение сохраняется
    pub unread_count: Option<u32>,
}

/// Упорядоченный дедуплицированный список бесед.
/// Единственный разделяемый мутабельный ресурс; меняется только
/// операциями ниже, каждая — атомарный синхронный переход.
#[derive(Debug, Default)]
pub struct ConversationStore {
    items: Vec<Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Стабильная сортировка по убыванию updatedAt: равные значения
    /// сохраняют относительный порядок, список не "дрожит"
    fn sort_by_recency(&mut self) {
        self.items
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    /// Массовая загрузка из REST backfill
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        self.items = conversations;
        self.sort_by_recency();
    }

    /// Применить сводку из канала уведомлений: обновить существующую
    /// беседу (только присланные поля) либо синтезировать новую
    pub fn upsert_from_summary(&mut self, event: &ChatSummaryData) {
        let incoming_at = event
            .last_message_at
            .as_deref()
            .and_then(time::parse_timestamp);

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|conversation| conversation.id == event.conversation_id)
        {
            if let Some(last_message) = &event.last_message {
                existing.last_message = last_message.clone();
            }
            if let Some(at) = incoming_at {
                existing.bump_updated_at(at);
            }
            if let Some(unread) = event.unread_count {
                existing.unread_count = unread;
            }
        } else {
            let summary = ConversationSummary::from(event);
            let newcomer = Conversation::from_summary(&summary, time::now_utc());
            self.items.insert(0, newcomer);
        }

        self.sort_by_recency();
    }

    /// Сбросить счётчик непрочитанных. Единственная операция,
    /// пишущая ноль: вызывается ровно при открытии беседы.
    pub fn mark_read(&mut self, conversation_id: &EntityId) {
        if let Some(conversation) = self
            .items
            .iter_mut()
            .find(|conversation| &conversation.id == conversation_id)
        {
            conversation.unread_count = 0;
        }
    }

    /// Синхронизация сводки с активностью открытой чат-сессии.
    /// Для неизвестного id — no-op: открытая сессия всегда соответствует
    /// записи, созданной при открытии.
    pub fn apply_activity(&mut self, conversation_id: &EntityId, activity: &ConversationActivity) {
        let Some(conversation) = self
            .items
            .iter_mut()
            .find(|conversation| &conversation.id == conversation_id)
        else {
            return;
        };

        if let Some(last_message) = &activity.last_message {
            conversation.last_message = last_message.clone();
        }
        conversation.bump_updated_at(activity.updated_at.unwrap_or_else(time::now_utc));
        if let Some(unread) = activity.unread_count {
            conversation.unread_count = unread;
        }

        self.sort_by_recency();
    }

    /// Суммарное количество непрочитанных (бейдж на кнопке виджета)
    pub fn total_unread(&self) -> u32 {
        self.items
            .iter()
            .map(|conversation| conversation.unread_count)
            .sum()
    }

    pub fn get(&self, conversation_id: &EntityId) -> Option<&Conversation> {
        self.items
            .iter()
            .find(|conversation| &conversation.id == conversation_id)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

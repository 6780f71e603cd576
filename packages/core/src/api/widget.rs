// Контроллер виджета уведомлений
// Одна кнопка с бейджем, выдвижной список бесед, тосты

use crate::alert::toast::{ToastAccent, ToastQueue, ToastRequest};
use crate::protocol::channel::ChatScope;
use crate::protocol::events::{ChatSummaryData, EntityId, NotificationEvent, OrderStatusData};
use crate::state::conversations::{
    Conversation, ConversationActivity, ConversationStore, ConversationSummary,
};
use crate::utils::time;

/// Роль наблюдателя определяет, чью сторону беседы он видит
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerRole {
    Buyer,
    Seller,
}

/// Текущий пользователь виджета
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user_id: EntityId,
    pub role: ViewerRole,
}

/// Что хост-слой должен сделать по итогам уведомления
#[derive(Debug, Clone, Default)]
pub struct NotificationOutcome {
    pub chime: bool,
    /// id созданной карточки, если уведомление породило тост
    pub toast: Option<String>,
}

/// Виджет уведомлений: агрегат над списком бесед и очередью тостов.
/// Все переходы синхронны; транспорт и таймеры живут уровнем выше.
pub struct ChatWidget {
    viewer: Viewer,
    store: ConversationStore,
    toasts: ToastQueue,
    drawer_open: bool,
    active_conversation: Option<EntityId>,
    /// Backfill уже загружен; открытие ящика не перезапрашивает список
    has_loaded: bool,
    last_error: Option<String>,
}

impl ChatWidget {
    pub fn new(viewer: Viewer) -> Self {
        Self {
            viewer,
            store: ConversationStore::new(),
            toasts: ToastQueue::new(),
            drawer_open: false,
            active_conversation: None,
            has_loaded: false,
            last_error: None,
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn is_drawer_open(&self) -> bool {
        self.drawer_open
    }

    pub fn active_conversation(&self) -> Option<&EntityId> {
        self.active_conversation.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.store.conversations()
    }

    pub fn unread_total(&self) -> u32 {
        self.store.total_unread()
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    /// Обработать событие канала уведомлений
    pub fn handle_notification(&mut self, event: &NotificationEvent, now_ms: i64) -> NotificationOutcome {
        match event {
            NotificationEvent::OrderStatus(data) => self.handle_order_status(data, now_ms),
            NotificationEvent::ChatSummary(data) => self.handle_chat_summary(data, now_ms),
            NotificationEvent::Unknown => NotificationOutcome::default(),
        }
    }

    fn handle_order_status(&mut self, data: &OrderStatusData, now_ms: i64) -> NotificationOutcome {
        let message = data
            .message
            .clone()
            .unwrap_or_else(|| format!("Order #{} has been updated.", data.order_id));

        let toast_id = self.toasts.push(
            ToastRequest {
                title: Some("Order update".to_string()),
                message: Some(message),
                meta: data.status_label.clone(),
                accent: ToastAccent::Order,
                duration_ms: None,
            },
            now_ms,
        );

        NotificationOutcome {
            chime: false,
            toast: Some(toast_id),
        }
    }

    fn handle_chat_summary(&mut self, data: &ChatSummaryData, now_ms: i64) -> NotificationOutcome {
        // Беседа открыта прямо сейчас: её события озвучивает сессия,
        // дублирующий сигнал и тост не нужны
        let viewing = self.drawer_open
            && self.active_conversation.as_ref() == Some(&data.conversation_id);
        let from_self = data.sender_id.as_ref() == Some(&self.viewer.user_id);

        let outcome = if viewing || from_self {
            NotificationOutcome::default()
        } else {
            let sender = match self.viewer.role {
                ViewerRole::Seller => data.buyer_name.clone(),
                ViewerRole::Buyer => data.shop_name.clone(),
            };
            let toast_id = self.toasts.push(
                ToastRequest {
                    title: Some(sender.unwrap_or_else(|| "New message".to_string())),
                    message: data.last_message.clone(),
                    meta: None,
                    accent: ToastAccent::Chat,
                    duration_ms: None,
                },
                now_ms,
            );
            NotificationOutcome {
                chime: true,
                toast: Some(toast_id),
            }
        };

        self.store.upsert_from_summary(data);
        outcome
    }

    /// Открыть ящик. true означает "нужен backfill по REST".
    pub fn open_drawer(&mut self) -> bool {
        self.drawer_open = true;
        !self.has_loaded
    }

    pub fn close_drawer(&mut self) {
        self.drawer_open = false;
        self.active_conversation = None;
    }

    /// Применить результат REST backfill
    pub fn apply_backfill(&mut self, summaries: Vec<ConversationSummary>) {
        let now = time::now_utc();
        let conversations = summaries
            .iter()
            .map(|summary| Conversation::from_summary(summary, now))
            .collect();
        self.store.replace_all(conversations);
        self.has_loaded = true;
        self.last_error = None;
    }

    /// Backfill не удался: список (возможно, накопленный из событий)
    /// сохраняется, ошибка запоминается для индикации
    pub fn backfill_failed(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
    }

    /// Выбрать беседу: сбрасывает непрочитанные и строит область
    /// чат-канала. None — у беседы не хватает идентификаторов.
    pub fn select_conversation(&mut self, conversation_id: &EntityId) -> Option<ChatScope> {
        let conversation = self.store.get(conversation_id)?.clone();

        let scope = match self.viewer.role {
            ViewerRole::Seller => ChatScope {
                shop_id: conversation
                    .shop_id
                    .clone()
                    .unwrap_or_else(|| self.viewer.user_id.clone()),
                buyer_id: Some(conversation.buyer_id.clone()?),
                product_id: conversation.product_id.clone(),
            },
            ViewerRole::Buyer => ChatScope {
                shop_id: conversation.shop_id.clone()?,
                buyer_id: Some(self.viewer.user_id.clone()),
                product_id: conversation.product_id.clone(),
            },
        };

        self.store.mark_read(conversation_id);
        self.active_conversation = Some(conversation_id.clone());
        Some(scope)
    }

    pub fn close_conversation(&mut self) {
        self.active_conversation = None;
    }

    /// Активность открытой сессии прокидывается в список бесед
    pub fn session_activity(&mut self, conversation_id: &EntityId, activity: &ConversationActivity) {
        self.store.apply_activity(conversation_id, activity);
    }

    /// Подпись собеседника в строке списка
    pub fn counterpart_label<'a>(&self, conversation: &'a Conversation) -> &'a str {
        match self.viewer.role {
            ViewerRole::Seller => &conversation.buyer_name,
            ViewerRole::Buyer => &conversation.shop_name,
        }
    }

    pub fn dismiss_toast(&mut self, toast_id: &str) -> bool {
        self.toasts.dismiss(toast_id)
    }

    pub fn expire_toasts(&mut self, now_ms: i64) -> Vec<String> {
        self.toasts.expire_due(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seller_widget() -> ChatWidget {
        ChatWidget::new(Viewer {
            user_id: EntityId::Number(101),
            role: ViewerRole::Seller,
        })
    }

    fn buyer_widget() -> ChatWidget {
        ChatWidget::new(Viewer {
            user_id: EntityId::Number(501),
            role: ViewerRole::Buyer,
        })
    }

    fn summary(id: &str, sender: Option<i64>) -> ChatSummaryData {
        ChatSummaryData {
            conversation_id: EntityId::from(id),
            buyer_id: Some(EntityId::Number(501)),
            buyer_name: Some("Alice".to_string()),
            shop_id: Some(EntityId::Number(101)),
            shop_name: Some("Gadget Shop".to_string()),
            product_id: None,
            product_name: None,
            last_message: Some("hi there".to_string()),
            last_message_at: Some("2024-05-01T10:00:00Z".to_string()),
            unread_count: Some(1),
            sender_id: sender.map(EntityId::Number),
        }
    }

    fn rest_summary(id: &str) -> ConversationSummary {
        ConversationSummary {
            id: Some(EntityId::from(id)),
            shop_id: Some(EntityId::Number(101)),
            buyer_id: Some(EntityId::Number(501)),
            ..Default::default()
        }
    }

    #[test]
    fn test_order_status_builds_toast_without_chime() {
        let mut widget = seller_widget();
        let event = NotificationEvent::OrderStatus(OrderStatusData {
            order_id: EntityId::Number(17),
            message: None,
            status_label: Some("shipped".to_string()),
        });

        let outcome = widget.handle_notification(&event, 0);
        assert!(!outcome.chime);
        assert!(outcome.toast.is_some());

        let toast = &widget.toasts().active()[0];
        assert_eq!(toast.title, "Order update");
        assert_eq!(toast.message, "Order #17 has been updated.");
        assert_eq!(toast.meta.as_deref(), Some("shipped"));
        assert_eq!(toast.accent, ToastAccent::Order);
    }

    #[test]
    fn test_chat_summary_alerts_and_upserts() {
        let mut widget = seller_widget();
        let event = NotificationEvent::ChatSummary(summary("c1", Some(501)));

        let outcome = widget.handle_notification(&event, 0);
        assert!(outcome.chime);
        assert!(outcome.toast.is_some());
        assert_eq!(widget.conversations().len(), 1);
        assert_eq!(widget.unread_total(), 1);

        // Тост подписан именем собеседника продавца
        assert_eq!(widget.toasts().active()[0].title, "Alice");
        assert_eq!(widget.toasts().active()[0].accent, ToastAccent::Chat);
    }

    #[test]
    fn test_chat_summary_buyer_sees_shop_name() {
        let mut widget = buyer_widget();
        let event = NotificationEvent::ChatSummary(summary("c1", Some(101)));
        widget.handle_notification(&event, 0);
        assert_eq!(widget.toasts().active()[0].title, "Gadget Shop");
    }

    #[test]
    fn test_own_echo_is_silent_but_still_upserts() {
        let mut widget = seller_widget();
        let event = NotificationEvent::ChatSummary(summary("c1", Some(101)));

        let outcome = widget.handle_notification(&event, 0);
        assert!(!outcome.chime);
        assert!(outcome.toast.is_none());
        assert_eq!(widget.conversations().len(), 1);
    }

    #[test]
    fn test_active_conversation_suppresses_alert() {
        let mut widget = seller_widget();
        widget.apply_backfill(vec![rest_summary("c1")]);
        widget.open_drawer();
        widget.select_conversation(&EntityId::from("c1")).unwrap();

        let outcome = widget.handle_notification(
            &NotificationEvent::ChatSummary(summary("c1", Some(501))),
            0,
        );
        assert!(!outcome.chime);
        assert!(outcome.toast.is_none());

        // Та же беседа при закрытом ящике снова озвучивается
        widget.close_drawer();
        let outcome = widget.handle_notification(
            &NotificationEvent::ChatSummary(summary("c1", Some(501))),
            0,
        );
        assert!(outcome.chime);
    }

    #[test]
    fn test_unknown_event_is_noop() {
        let mut widget = seller_widget();
        let outcome = widget.handle_notification(&NotificationEvent::Unknown, 0);
        assert!(!outcome.chime);
        assert!(outcome.toast.is_none());
        assert!(widget.conversations().is_empty());
    }

    #[test]
    fn test_open_drawer_requests_backfill_once() {
        let mut widget = seller_widget();
        assert!(widget.open_drawer());
        widget.apply_backfill(vec![rest_summary("c1")]);
        widget.close_drawer();
        assert!(!widget.open_drawer());
    }

    #[test]
    fn test_backfill_failure_keeps_accumulated_state() {
        let mut widget = seller_widget();
        widget.handle_notification(&NotificationEvent::ChatSummary(summary("c1", Some(501))), 0);

        widget.backfill_failed("HTTP 502");
        assert_eq!(widget.conversations().len(), 1);
        assert_eq!(widget.last_error(), Some("HTTP 502"));

        // Успешный повтор сбрасывает ошибку
        widget.apply_backfill(vec![rest_summary("c1")]);
        assert!(widget.last_error().is_none());
    }

    #[test]
    fn test_select_conversation_marks_read_and_builds_scope() {
        let mut widget = seller_widget();
        widget.handle_notification(&NotificationEvent::ChatSummary(summary("c1", Some(501))), 0);
        assert_eq!(widget.unread_total(), 1);

        let scope = widget.select_conversation(&EntityId::from("c1")).unwrap();
        assert_eq!(scope.shop_id, EntityId::Number(101));
        assert_eq!(scope.buyer_id, Some(EntityId::Number(501)));
        assert_eq!(widget.unread_total(), 0);
        assert_eq!(widget.active_conversation(), Some(&EntityId::from("c1")));
    }

    #[test]
    fn test_select_conversation_buyer_scope_uses_own_id() {
        let mut widget = buyer_widget();
        widget.handle_notification(&NotificationEvent::ChatSummary(summary("c1", Some(101))), 0);

        let scope = widget.select_conversation(&EntityId::from("c1")).unwrap();
        assert_eq!(scope.shop_id, EntityId::Number(101));
        assert_eq!(scope.buyer_id, Some(EntityId::Number(501)));
    }

    #[test]
    fn test_select_unknown_conversation_is_none() {
        let mut widget = seller_widget();
        assert!(widget.select_conversation(&EntityId::from("ghost")).is_none());
    }

    #[test]
    fn test_select_conversation_without_required_ids() {
        let mut widget = seller_widget();
        let mut event = summary("c1", Some(501));
        event.buyer_id = None;
        widget.handle_notification(&NotificationEvent::ChatSummary(event), 0);

        // Продавцу нужен buyer_id собеседника
        assert!(widget.select_conversation(&EntityId::from("c1")).is_none());
    }

    #[test]
    fn test_counterpart_label_depends_on_role() {
        let mut widget = seller_widget();
        widget.handle_notification(&NotificationEvent::ChatSummary(summary("c1", Some(501))), 0);
        let conversation = widget.conversations()[0].clone();
        assert_eq!(widget.counterpart_label(&conversation), "Alice");

        let buyer = buyer_widget();
        assert_eq!(buyer.counterpart_label(&conversation), "Gadget Shop");
    }

    #[test]
    fn test_session_activity_flows_into_store() {
        let mut widget = seller_widget();
        widget.handle_notification(&NotificationEvent::ChatSummary(summary("c1", Some(501))), 0);

        widget.session_activity(
            &EntityId::from("c1"),
            &ConversationActivity {
                last_message: Some("latest".to_string()),
                updated_at: None,
                unread_count: None,
            },
        );
        assert_eq!(widget.conversations()[0].last_message, "latest");
    }

    #[test]
    fn test_toast_dismiss_and_expiry() {
        let mut widget = seller_widget();
        let outcome = widget.handle_notification(
            &NotificationEvent::ChatSummary(summary("c1", Some(501))),
            0,
        );
        let toast_id = outcome.toast.unwrap();

        assert!(widget.dismiss_toast(&toast_id));
        assert!(!widget.dismiss_toast(&toast_id));
        assert!(widget.expire_toasts(i64::MAX).is_empty());
    }
}

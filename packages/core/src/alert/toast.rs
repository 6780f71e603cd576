// Очередь всплывающих уведомлений

use crate::config::Config;
use crate::utils::uuid;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use std::collections::HashMap;

/// Акцент карточки: подсказывает UI цвет и иконку
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastAccent {
    Info,
    Order,
    Chat,
}

impl Default for ToastAccent {
    fn default() -> Self {
        ToastAccent::Info
    }
}

/// Активная карточка уведомления
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub meta: Option<String>,
    pub accent: ToastAccent,
    /// Момент автоскрытия, unix миллисекунды
    pub expires_at: i64,
}

/// Запрос на показ уведомления
#[derive(Debug, Clone, Default)]
pub struct ToastRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    pub meta: Option<String>,
    pub accent: ToastAccent,
    pub duration_ms: Option<i64>,
}

/// Очередь активных карточек. Чистая структура без таймеров:
/// истечение вычисляется от переданного времени, планирование
/// автоскрытия — забота хост-слоя.
#[derive(Debug, Default)]
pub struct ToastQueue {
    items: Vec<Toast>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Показать карточку; возвращает её id для последующего dismiss
    pub fn push(&mut self, request: ToastRequest, now_ms: i64) -> String {
        let id = uuid::collision_resistant_id();
        let duration = request
            .duration_ms
            .unwrap_or_else(|| Config::global().toast_duration_ms as i64);

        self.items.push(Toast {
            id: id.clone(),
            title: request.title.unwrap_or_else(|| "Notification".to_string()),
            message: request.message.unwrap_or_default(),
            meta: request.meta,
            accent: request.accent,
            expires_at: now_ms + duration,
        });

        id
    }

    /// Скрыть карточку. Идемпотентно: таймер автоскрытия может
    /// сработать после ручного закрытия.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|toast| toast.id != id);
        self.items.len() != before
    }

    /// Удалить просроченные карточки; возвращает их id
    pub fn expire_due(&mut self, now_ms: i64) -> Vec<String> {
        let expired: Vec<String> = self
            .items
            .iter()
            .filter(|toast| toast.expires_at <= now_ms)
            .map(|toast| toast.id.clone())
            .collect();
        self.items.retain(|toast| toast.expires_at > now_ms);
        expired
    }

    pub fn active(&self) -> &[Toast] {
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

/// Браузерные таймеры автоскрытия. Timeout отменяется при Drop,
/// поэтому удаление записи из map гасит и таймер.
#[cfg(target_arch = "wasm32")]
#[derive(Default)]
pub struct ToastTimers {
    timers: HashMap<String, gloo_timers::callback::Timeout>,
}

#[cfg(target_arch = "wasm32")]
impl ToastTimers {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
        }
    }

    pub fn schedule<F>(&mut self, toast_id: &str, delay_ms: u32, on_expire: F)
    where
        F: FnOnce() + 'static,
    {
        let timeout = gloo_timers::callback::Timeout::new(delay_ms, on_expire);
        self.timers.insert(toast_id.to_string(), timeout);
    }

    pub fn cancel(&mut self, toast_id: &str) {
        self.timers.remove(toast_id);
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

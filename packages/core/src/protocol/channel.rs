// WebSocket канал
// Обертка над браузерным WebSocket API для WASM

use crate::config::Config;
use crate::protocol::events::EntityId;
use crate::utils::error::{Result, StorechatError};

#[cfg(target_arch = "wasm32")]
use crate::utils::logging;
#[cfg(target_arch = "wasm32")]
use serde::de::DeserializeOwned;
#[cfg(target_arch = "wasm32")]
use std::cell::{Cell, RefCell};
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;
#[cfg(target_arch = "wasm32")]
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

/// Жизненный цикл канала
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
    Failed,
}

/// Вид канала
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Долгоживущий канал уведомлений (один на сессию пользователя)
    Notification,
    /// Канал одной открытой беседы
    Chat,
}

/// Область чат-канала: магазин + покупатель + опциональный товар
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatScope {
    pub shop_id: EntityId,
    pub buyer_id: Option<EntityId>,
    pub product_id: Option<EntityId>,
}

impl ChatScope {
    /// Путь чат-канала: /ws/chat/{shop_id}/
    pub fn ws_path(&self) -> String {
        format!(
            "{}{}/",
            Config::global().ws_chat_path_prefix,
            self.shop_id
        )
    }

    /// Query-параметры открытия канала: токен сессии, покупатель, товар
    pub fn query(&self, token: &str) -> Vec<(String, String)> {
        let mut query = vec![("token".to_string(), token.to_string())];
        if let Some(buyer) = &self.buyer_id {
            query.push(("buyer".to_string(), buyer.to_string()));
        }
        if let Some(product) = &self.product_id {
            query.push(("product".to_string(), product.to_string()));
        }
        query
    }
}

#[cfg(target_arch = "wasm32")]
type OpenHandler = Box<dyn Fn()>;
#[cfg(target_arch = "wasm32")]
type TextHandler = Box<dyn Fn(String)>;
#[cfg(target_arch = "wasm32")]
type ErrorHandler = Box<dyn Fn(String)>;
#[cfg(target_arch = "wasm32")]
type CloseHandler = Box<dyn Fn(u16, String)>;

/// Зарегистрированные обработчики владельца канала.
/// Хранятся отдельно от браузерных closures, чтобы состояние канала
/// обновлялось независимо от того, подписался владелец или нет.
#[cfg(target_arch = "wasm32")]
#[derive(Default)]
struct Handlers {
    on_open: Option<OpenHandler>,
    on_text: Option<TextHandler>,
    on_error: Option<ErrorHandler>,
    on_close: Option<CloseHandler>,
}

/// WebSocket канал для WASM
#[cfg(target_arch = "wasm32")]
pub struct WebSocketChannel {
    ws: WebSocket,
    kind: ChannelKind,
    state: Rc<Cell<ChannelState>>,
    handlers: Rc<RefCell<Handlers>>,
}

#[cfg(target_arch = "wasm32")]
impl WebSocketChannel {
    /// Открыть канал; возвращается в состоянии Connecting
    pub fn open(url: &str, kind: ChannelKind) -> Result<Self> {
        let ws = WebSocket::new(url).map_err(|e| {
            StorechatError::NetworkError(format!("Failed to create WebSocket: {:?}", e))
        })?;

        let state = Rc::new(Cell::new(ChannelState::Connecting));
        let handlers: Rc<RefCell<Handlers>> = Rc::new(RefCell::new(Handlers::default()));

        // onopen: handshake успешен
        {
            let state = state.clone();
            let handlers = handlers.clone();
            let closure = Closure::wrap(Box::new(move |_event: JsValue| {
                state.set(ChannelState::Open);
                if let Some(handler) = handlers.borrow().on_open.as_ref() {
                    handler();
                }
            }) as Box<dyn Fn(JsValue)>);
            ws.set_onopen(Some(closure.as_ref().unchecked_ref()));
            closure.forget();
        }

        // onmessage: текстовые JSON-кадры; всё остальное игнорируем
        {
            let handlers = handlers.clone();
            let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
                let Some(text) = event.data().as_string() else {
                    logging::warn("Dropping non-text WebSocket frame");
                    return;
                };
                if let Some(handler) = handlers.borrow().on_text.as_ref() {
                    handler(text);
                }
            }) as Box<dyn Fn(MessageEvent)>);
            ws.set_onmessage(Some(closure.as_ref().unchecked_ref()));
            closure.forget();
        }

        // onerror: канал считается неисправным
        {
            let state = state.clone();
            let handlers = handlers.clone();
            let closure = Closure::wrap(Box::new(move |_event: ErrorEvent| {
                state.set(ChannelState::Failed);
                if let Some(handler) = handlers.borrow().on_error.as_ref() {
                    handler("WebSocket error occurred".to_string());
                }
            }) as Box<dyn Fn(ErrorEvent)>);
            ws.set_onerror(Some(closure.as_ref().unchecked_ref()));
            closure.forget();
        }

        // onclose: Failed не перезатираем, чтобы различать ошибку и закрытие
        {
            let state = state.clone();
            let handlers = handlers.clone();
            let closure = Closure::wrap(Box::new(move |event: CloseEvent| {
                if state.get() != ChannelState::Failed {
                    state.set(ChannelState::Closed);
                }
                if let Some(handler) = handlers.borrow().on_close.as_ref() {
                    handler(event.code(), event.reason());
                }
            }) as Box<dyn Fn(CloseEvent)>);
            ws.set_onclose(Some(closure.as_ref().unchecked_ref()));
            closure.forget();
        }

        Ok(Self {
            ws,
            kind,
            state,
            handlers,
        })
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.ws.ready_state() == Config::global().websocket_ready_state_open
    }

    /// Отправить событие. Вне состояния Open — no-op, не ошибка:
    /// UI может нажать "отправить" до завершения handshake.
    pub fn send_json<T: serde::Serialize>(&self, event: &T) {
        if !self.is_open() {
            logging::warn("Dropping outbound event: channel is not open");
            return;
        }

        match serde_json::to_string(event) {
            Ok(frame) => {
                if let Err(e) = self.ws.send_with_str(&frame) {
                    logging::error(&format!("Failed to send frame: {:?}", e));
                }
            }
            Err(e) => logging::error(&format!("Failed to encode frame: {}", e)),
        }
    }

    /// Подписка на успешное открытие
    pub fn set_on_open<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        self.handlers.borrow_mut().on_open = Some(Box::new(callback));
    }

    /// Подписка на типизированные входящие события.
    /// Неизвестные типы приходят как Unknown-вариант перечисления;
    /// битые кадры логируются и отбрасываются, цепочка не падает.
    pub fn set_on_event<E, F>(&self, callback: F)
    where
        E: DeserializeOwned + 'static,
        F: Fn(E) + 'static,
    {
        self.handlers.borrow_mut().on_text = Some(Box::new(move |text: String| {
            match serde_json::from_str::<E>(&text) {
                Ok(event) => callback(event),
                Err(e) => logging::warn(&format!("Dropping malformed frame: {}", e)),
            }
        }));
    }

    /// Подписка на ошибку соединения
    pub fn set_on_error<F>(&self, callback: F)
    where
        F: Fn(String) + 'static,
    {
        self.handlers.borrow_mut().on_error = Some(Box::new(callback));
    }

    /// Подписка на закрытие
    pub fn set_on_close<F>(&self, callback: F)
    where
        F: Fn(u16, String) + 'static,
    {
        self.handlers.borrow_mut().on_close = Some(Box::new(callback));
    }

    /// Закрыть канал; идемпотентно
    pub fn close(&self) {
        if self.state.get() == ChannelState::Closed {
            return;
        }
        if let Err(e) = self.ws.close() {
            logging::warn(&format!("WebSocket close: {:?}", e));
        }
        self.state.set(ChannelState::Closed);
    }
}

/// Заглушка для не-WASM платформ
#[cfg(not(target_arch = "wasm32"))]
pub struct WebSocketChannel;

#[cfg(not(target_arch = "wasm32"))]
impl WebSocketChannel {
    pub fn open(_url: &str, _kind: ChannelKind) -> Result<Self> {
        Err(StorechatError::NetworkError(
            "WebSocket channel only available in WASM target".to_string(),
        ))
    }

    pub fn is_open(&self) -> bool {
        false
    }

    pub fn send_json<T: serde::Serialize>(&self, _event: &T) {}

    pub fn close(&self) {}
}

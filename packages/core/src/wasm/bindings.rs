use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

use crate::alert::chime::Chime;
use crate::alert::toast::ToastTimers;
use crate::api::page::ChatPageController;
use crate::api::widget::{ChatWidget, Viewer, ViewerRole};
use crate::config::Config;
use crate::protocol::channel::{ChannelKind, WebSocketChannel};
use crate::protocol::endpoint;
use crate::protocol::events::{ChatServerEvent, EntityId, NotificationEvent};
use crate::state::conversations::ConversationSummary;
use crate::state::session::{ChatSession, SessionState};
use crate::utils::error::StorechatError;
use crate::utils::time;

// Use thread_local for single-threaded WASM context.
// Rc<RefCell<T>> is the standard pattern for shared mutable data on a single thread.
thread_local! {
    static WIDGETS: RefCell<HashMap<String, Rc<WidgetRuntime>>> = RefCell::new(HashMap::new());
    static SESSIONS: RefCell<HashMap<String, Rc<SessionRuntime>>> = RefCell::new(HashMap::new());
}

/// Everything one widget instance owns on the browser side:
/// the pure controller plus the channel, sound and toast timers.
struct WidgetRuntime {
    widget: RefCell<ChatWidget>,
    chime: RefCell<Chime>,
    timers: RefCell<ToastTimers>,
    notifications: RefCell<Option<WebSocketChannel>>,
}

/// One open chat session with its transport channel.
struct SessionRuntime {
    session: Rc<RefCell<ChatSession>>,
    channel: WebSocketChannel,
    /// Owning widget, if the session came from the drawer
    widget_id: Option<String>,
}

type JsResult<T> = Result<T, JsValue>;

fn with_widget<F, T>(widget_id: &str, f: F) -> Result<T, StorechatError>
where
    F: FnOnce(&Rc<WidgetRuntime>) -> Result<T, StorechatError>,
{
    WIDGETS.with(|cell| {
        let widgets = cell.borrow();
        match widgets.get(widget_id) {
            Some(runtime) => f(runtime),
            None => Err(StorechatError::NotFound(format!(
                "Widget {} not found",
                widget_id
            ))),
        }
    })
}

fn with_session<F, T>(session_id: &str, f: F) -> Result<T, StorechatError>
where
    F: FnOnce(&Rc<SessionRuntime>) -> Result<T, StorechatError>,
{
    SESSIONS.with(|cell| {
        let sessions = cell.borrow();
        match sessions.get(session_id) {
            Some(runtime) => f(runtime),
            None => Err(StorechatError::NotFound(format!(
                "Session {} not found",
                session_id
            ))),
        }
    })
}

fn parse_entity_id(value: JsValue, what: &str) -> Result<EntityId, StorechatError> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| StorechatError::InvalidInput(format!("{}: {}", what, e)))
}

fn parse_optional_entity_id(
    value: JsValue,
    what: &str,
) -> Result<Option<EntityId>, StorechatError> {
    if value.is_null() || value.is_undefined() {
        return Ok(None);
    }
    parse_entity_id(value, what).map(Some)
}

/// Toast auto-dismiss: remove from the queue when the timer fires.
/// Weak reference breaks the runtime -> channel -> closure cycle.
fn schedule_toast(runtime: &Rc<WidgetRuntime>, toast_id: &str) {
    let weak: Weak<WidgetRuntime> = Rc::downgrade(runtime);
    let id = toast_id.to_string();
    let expire_id = id.clone();
    runtime.timers.borrow_mut().schedule(
        &id,
        Config::global().toast_duration_ms as u32,
        move || {
            if let Some(runtime) = weak.upgrade() {
                runtime.widget.borrow_mut().dismiss_toast(&expire_id);
                runtime.timers.borrow_mut().cancel(&expire_id);
            }
        },
    );
}

#[wasm_bindgen]
pub fn init() {
    crate::wasm::console::init_logging();
}

/// Create a widget instance for the given viewer. `user_id` may be a
/// number or a string, `role` is "buyer" or "seller".
#[wasm_bindgen]
pub fn create_widget(user_id: JsValue, role: String) -> JsResult<String> {
    let user_id = parse_entity_id(user_id, "user id")?;
    let role = match role.as_str() {
        "buyer" => ViewerRole::Buyer,
        "seller" => ViewerRole::Seller,
        other => {
            return Err(StorechatError::InvalidInput(format!("viewer role: {}", other)).into())
        }
    };

    let widget_id = Uuid::new_v4().to_string();
    let runtime = Rc::new(WidgetRuntime {
        widget: RefCell::new(ChatWidget::new(Viewer { user_id, role })),
        chime: RefCell::new(Chime::new()),
        timers: RefCell::new(ToastTimers::new()),
        notifications: RefCell::new(None),
    });

    WIDGETS.with(|cell| {
        cell.borrow_mut().insert(widget_id.clone(), runtime);
    });
    Ok(widget_id)
}

/// Open the long-lived notification channel. Returns false when no
/// WebSocket endpoint can be resolved; the widget stays usable.
#[wasm_bindgen]
pub fn connect_notifications(widget_id: String, token: String) -> JsResult<bool> {
    let url = endpoint::build_ws_url(
        &Config::global().ws_notifications_path,
        &[("token".to_string(), token)],
    );
    let Some(url) = url else {
        return Ok(false);
    };

    with_widget(&widget_id, |runtime| {
        let channel = WebSocketChannel::open(&url, ChannelKind::Notification)?;

        let weak: Weak<WidgetRuntime> = Rc::downgrade(runtime);
        channel.set_on_event::<NotificationEvent, _>(move |event| {
            let Some(runtime) = weak.upgrade() else {
                return;
            };
            let outcome = runtime
                .widget
                .borrow_mut()
                .handle_notification(&event, time::now_millis());
            if outcome.chime {
                runtime.chime.borrow_mut().play();
            }
            if let Some(toast_id) = outcome.toast {
                schedule_toast(&runtime, &toast_id);
            }
        });

        *runtime.notifications.borrow_mut() = Some(channel);
        Ok(true)
    })
    .map_err(Into::into)
}

#[wasm_bindgen]
pub fn disconnect_notifications(widget_id: String) -> JsResult<()> {
    with_widget(&widget_id, |runtime| {
        if let Some(channel) = runtime.notifications.borrow_mut().take() {
            channel.close();
        }
        Ok(())
    })
    .map_err(Into::into)
}

/// Open the drawer. Returns true when the host should fetch the
/// conversation list over REST and call widget_apply_backfill.
#[wasm_bindgen]
pub fn widget_open_drawer(widget_id: String) -> JsResult<bool> {
    with_widget(&widget_id, |runtime| Ok(runtime.widget.borrow_mut().open_drawer()))
        .map_err(Into::into)
}

#[wasm_bindgen]
pub fn widget_close_drawer(widget_id: String) -> JsResult<()> {
    with_widget(&widget_id, |runtime| {
        runtime.widget.borrow_mut().close_drawer();
        Ok(())
    })
    .map_err(Into::into)
}

/// Feed the REST conversation list into the widget. `summaries` is the
/// JSON array exactly as the backend returned it.
#[wasm_bindgen]
pub fn widget_apply_backfill(widget_id: String, summaries: JsValue) -> JsResult<()> {
    let summaries: Vec<ConversationSummary> =
        serde_wasm_bindgen::from_value(summaries).map_err(StorechatError::from)?;
    with_widget(&widget_id, |runtime| {
        runtime.widget.borrow_mut().apply_backfill(summaries);
        Ok(())
    })
    .map_err(Into::into)
}

#[wasm_bindgen]
pub fn widget_backfill_failed(widget_id: String, message: String) -> JsResult<()> {
    with_widget(&widget_id, |runtime| {
        runtime.widget.borrow_mut().backfill_failed(&message);
        Ok(())
    })
    .map_err(Into::into)
}

#[wasm_bindgen]
pub fn widget_conversations(widget_id: String) -> JsResult<JsValue> {
    let value = with_widget(&widget_id, |runtime| {
        serde_json::to_value(runtime.widget.borrow().conversations())
            .map_err(|e| StorechatError::SerializationError(e.to_string()))
    })?;
    Ok(serde_wasm_bindgen::to_value(&value)?)
}

#[wasm_bindgen]
pub fn widget_unread_total(widget_id: String) -> u32 {
    with_widget(&widget_id, |runtime| Ok(runtime.widget.borrow().unread_total())).unwrap_or(0)
}

#[wasm_bindgen]
pub fn widget_last_error(widget_id: String) -> Option<String> {
    with_widget(&widget_id, |runtime| {
        Ok(runtime.widget.borrow().last_error().map(|s| s.to_string()))
    })
    .unwrap_or(None)
}

#[wasm_bindgen]
pub fn widget_toasts(widget_id: String) -> JsResult<JsValue> {
    let value = with_widget(&widget_id, |runtime| {
        serde_json::to_value(runtime.widget.borrow().toasts().active())
            .map_err(|e| StorechatError::SerializationError(e.to_string()))
    })?;
    Ok(serde_wasm_bindgen::to_value(&value)?)
}

#[wasm_bindgen]
pub fn widget_dismiss_toast(widget_id: String, toast_id: String) -> bool {
    with_widget(&widget_id, |runtime| {
        runtime.timers.borrow_mut().cancel(&toast_id);
        Ok(runtime.widget.borrow_mut().dismiss_toast(&toast_id))
    })
    .unwrap_or(false)
}

/// Wire channel callbacks into a session and register it.
fn register_session(
    session: ChatSession,
    url: &str,
    widget_id: Option<String>,
) -> Result<String, StorechatError> {
    let session = Rc::new(RefCell::new(session));
    let channel = WebSocketChannel::open(url, ChannelKind::Chat)?;

    {
        let session = session.clone();
        channel.set_on_open(move || {
            session.borrow_mut().mark_open();
        });
    }

    {
        let session = session.clone();
        let widget_id = widget_id.clone();
        channel.set_on_event::<ChatServerEvent, _>(move |event| {
            let update = session.borrow_mut().handle_event(event);
            let Some(update) = update else {
                return;
            };

            let Some(widget_id) = widget_id.as_deref() else {
                return;
            };
            let _ = with_widget(widget_id, |runtime| {
                if update.chime {
                    runtime.chime.borrow_mut().play();
                }
                if let Some((conversation_id, activity)) = &update.activity {
                    runtime
                        .widget
                        .borrow_mut()
                        .session_activity(conversation_id, activity);
                }
                Ok(())
            });
        });
    }

    {
        let session = session.clone();
        channel.set_on_error(move |_reason| {
            session.borrow_mut().mark_failed();
        });
    }

    {
        let session = session.clone();
        channel.set_on_close(move |_code, _reason| {
            session.borrow_mut().close();
        });
    }

    session.borrow_mut().mark_connecting();

    let session_id = Uuid::new_v4().to_string();
    let runtime = Rc::new(SessionRuntime {
        session,
        channel,
        widget_id,
    });
    SESSIONS.with(|cell| {
        cell.borrow_mut().insert(session_id.clone(), runtime);
    });
    Ok(session_id)
}

/// Open a conversation from the drawer: marks it read, connects the
/// chat channel and returns a session handle.
#[wasm_bindgen]
pub fn widget_open_conversation(
    widget_id: String,
    conversation_id: JsValue,
    token: String,
) -> JsResult<String> {
    let conversation_id = parse_entity_id(conversation_id, "conversation id")?;

    let (scope, self_id) = with_widget(&widget_id, |runtime| {
        let mut widget = runtime.widget.borrow_mut();
        let scope = widget.select_conversation(&conversation_id).ok_or_else(|| {
            StorechatError::NotFound(format!("Conversation {} not found", conversation_id))
        })?;
        Ok((scope, widget.viewer().user_id.clone()))
    })?;

    let url = endpoint::build_ws_url(&scope.ws_path(), &scope.query(&token))
        .ok_or_else(|| JsValue::from_str("Chat unavailable: no WebSocket endpoint"))?;

    let session = ChatSession::new(scope, self_id, Some(conversation_id));
    register_session(session, &url, Some(widget_id)).map_err(Into::into)
}

/// Standalone buyer chat on a product page, no widget involved.
#[wasm_bindgen]
pub fn open_buyer_page_chat(
    shop_id: JsValue,
    viewer_id: JsValue,
    product_id: JsValue,
    token: String,
) -> JsResult<String> {
    let shop_id = parse_entity_id(shop_id, "shop id")?;
    let viewer_id = parse_entity_id(viewer_id, "viewer id")?;
    let product_id = parse_optional_entity_id(product_id, "product id")?;

    let mut controller = ChatPageController::buyer_page(shop_id, viewer_id, product_id);
    let url = controller
        .connect_url(&token)
        .ok_or_else(|| JsValue::from_str("Chat unavailable: no WebSocket endpoint"))?;
    register_session(controller.into_session(), &url, None).map_err(Into::into)
}

/// Standalone seller chat in the shop dashboard.
#[wasm_bindgen]
pub fn open_shop_page_chat(
    shop_id: JsValue,
    self_id: JsValue,
    buyer_id: JsValue,
    token: String,
) -> JsResult<String> {
    let shop_id = parse_entity_id(shop_id, "shop id")?;
    let self_id = parse_entity_id(self_id, "self id")?;
    let buyer_id = parse_optional_entity_id(buyer_id, "buyer id")?;

    let mut controller = ChatPageController::shop_page(shop_id, self_id, buyer_id);
    let url = controller
        .connect_url(&token)
        .ok_or_else(|| JsValue::from_str("Chat unavailable: no WebSocket endpoint"))?;
    register_session(controller.into_session(), &url, None).map_err(Into::into)
}

/// Send a message. Returns false when the input was empty or the
/// session is not live; the text stays in the composer.
#[wasm_bindgen]
pub fn session_send(session_id: String, text: String) -> JsResult<bool> {
    with_session(&session_id, |runtime| {
        let Some(event) = runtime.session.borrow().compose_outbound(&text) else {
            return Ok(false);
        };
        runtime.channel.send_json(&event);
        Ok(true)
    })
    .map_err(Into::into)
}

#[wasm_bindgen]
pub fn session_messages(session_id: String) -> JsResult<JsValue> {
    let value = with_session(&session_id, |runtime| {
        serde_json::to_value(runtime.session.borrow().messages())
            .map_err(|e| StorechatError::SerializationError(e.to_string()))
    })?;
    Ok(serde_wasm_bindgen::to_value(&value)?)
}

#[wasm_bindgen]
pub fn session_set_focused(session_id: String, focused: bool) -> JsResult<()> {
    with_session(&session_id, |runtime| {
        runtime.session.borrow_mut().set_focused(focused);
        Ok(())
    })
    .map_err(Into::into)
}

#[wasm_bindgen]
pub fn session_state(session_id: String) -> String {
    with_session(&session_id, |runtime| {
        let label = match runtime.session.borrow().state() {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Live => "live",
            SessionState::Closed => "closed",
        };
        Ok(label.to_string())
    })
    .unwrap_or_else(|_| "closed".to_string())
}

/// Close a session and drop its channel. The owning widget, if any,
/// clears its active conversation.
#[wasm_bindgen]
pub fn close_session(session_id: String) {
    let runtime = SESSIONS.with(|cell| cell.borrow_mut().remove(&session_id));
    let Some(runtime) = runtime else {
        return;
    };

    runtime.channel.close();
    runtime.session.borrow_mut().close();
    if let Some(widget_id) = &runtime.widget_id {
        let _ = with_widget(widget_id, |widget_runtime| {
            widget_runtime.widget.borrow_mut().close_conversation();
            Ok(())
        });
    }
}

/// Tear down a widget: notification channel, toast timers and all
/// sessions it spawned.
#[wasm_bindgen]
pub fn destroy_widget(widget_id: String) {
    let orphaned: Vec<String> = SESSIONS.with(|cell| {
        cell.borrow()
            .iter()
            .filter(|(_, runtime)| runtime.widget_id.as_deref() == Some(widget_id.as_str()))
            .map(|(id, _)| id.clone())
            .collect()
    });
    for session_id in orphaned {
        close_session(session_id);
    }

    let runtime = WIDGETS.with(|cell| cell.borrow_mut().remove(&widget_id));
    if let Some(runtime) = runtime {
        if let Some(channel) = runtime.notifications.borrow_mut().take() {
            channel.close();
        }
        runtime.timers.borrow_mut().clear();
    }
}

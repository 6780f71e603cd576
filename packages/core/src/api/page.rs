// Контроллер полностраничного чата
// Страница товара (покупатель) и кабинет магазина (продавец)

use crate::protocol::channel::ChatScope;
use crate::protocol::endpoint;
use crate::protocol::events::EntityId;
use crate::state::session::{ChatSession, SessionState};
use crate::utils::logging;

/// Страница с единственной чат-сессией без виджета и списка бесед
pub struct ChatPageController {
    session: ChatSession,
}

impl ChatPageController {
    /// Страница товара: покупатель пишет магазину
    pub fn buyer_page(shop_id: EntityId, viewer_id: EntityId, product_id: Option<EntityId>) -> Self {
        let scope = ChatScope {
            shop_id,
            buyer_id: Some(viewer_id.clone()),
            product_id,
        };
        Self {
            session: ChatSession::new(scope, viewer_id, None),
        }
    }

    /// Кабинет магазина: продавец отвечает покупателю
    pub fn shop_page(shop_id: EntityId, self_id: EntityId, buyer_id: Option<EntityId>) -> Self {
        let scope = ChatScope {
            shop_id,
            buyer_id,
            product_id: None,
        };
        Self {
            session: ChatSession::new(scope, self_id, None),
        }
    }

    /// Построить URL подключения и перевести сессию в Connecting.
    /// None — транспорт недоступен, сессия закрывается сразу.
    pub fn connect_url(&mut self, token: &str) -> Option<String> {
        let scope = self.session.scope();
        let url = endpoint::build_ws_url(&scope.ws_path(), &scope.query(token));
        match url {
            Some(url) => {
                self.session.mark_connecting();
                Some(url)
            }
            None => {
                logging::error("Chat unavailable: no WebSocket endpoint could be resolved");
                self.session.close();
                None
            }
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    pub fn into_session(self) -> ChatSession {
        self.session
    }

    pub fn is_closed(&self) -> bool {
        self.session.state() == SessionState::Closed
    }
}

// Публичные контроллеры UI-поверхностей

pub mod page;
pub mod widget;

pub use page::ChatPageController;
pub use widget::{ChatWidget, NotificationOutcome, Viewer, ViewerRole};

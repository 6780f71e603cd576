// Ре-экспорт типов ошибок на корне крейта

pub use crate::utils::error::{Result, StorechatError};

// Состояние клиента: список бесед и открытые сессии

pub mod conversations;
pub mod session;

// Протокол реального времени: эндпоинты, события, канал

pub mod channel;
pub mod endpoint;
pub mod events;

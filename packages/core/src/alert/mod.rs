// Пайплайн уведомлений: карточки и звуковой сигнал

pub mod chime;
pub mod toast;

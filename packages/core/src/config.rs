//! Централизованная конфигурация для Storechat Core
//!
//! Все константы и настройки приложения должны быть определены здесь,
//! чтобы избежать хардкода по всему проекту.

use std::sync::OnceLock;

/// Глобальная конфигурация приложения (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // СЕТЕВЫЕ ПАРАМЕТРЫ
    // ============================================

    /// Явно заданный базовый адрес WebSocket (ws://... или https://...).
    /// Имеет высший приоритет при резолве эндпоинта.
    pub ws_base_url: Option<String>,

    /// Базовый адрес REST API; используется как кандидат для WebSocket
    pub api_base_url: Option<String>,

    /// Путь канала уведомлений
    pub ws_notifications_path: String,

    /// Префикс пути чат-канала; завершается id магазина
    pub ws_chat_path_prefix: String,

    /// Порт бэкенда, на который переписываются loopback-адреса
    pub loopback_fallback_port: u16,

    /// Известные порты dev-серверов (CRA, Vite), с которых идёт переписывание
    pub dev_server_ports: Vec<u16>,

    /// WebSocket OPEN state код
    pub websocket_ready_state_open: u16,

    // ============================================
    // УВЕДОМЛЕНИЯ
    // ============================================

    /// Время жизни тоста по умолчанию (в миллисекундах)
    pub toast_duration_ms: u64,

    // ============================================
    // ЗВУКОВОЙ СИГНАЛ
    // ============================================

    /// Частота осциллятора (Гц)
    pub chime_frequency_hz: f32,

    /// Громкость сигнала (gain)
    pub chime_gain: f32,

    /// Длительность сигнала (в секундах)
    pub chime_length_secs: f64,
}

impl Config {
    /// Создать конфигурацию с дефолтными значениями
    pub fn default() -> Self {
        Self {
            // Сетевые параметры
            ws_base_url: None,
            api_base_url: None,
            ws_notifications_path: "/ws/notifications/".to_string(),
            ws_chat_path_prefix: "/ws/chat/".to_string(),
            loopback_fallback_port: 8000,
            dev_server_ports: vec![3000, 5173, 4173, 5174, 5175],
            websocket_ready_state_open: 1,

            // Уведомления
            toast_duration_ms: 6000,

            // Звуковой сигнал
            chime_frequency_hz: 920.0,
            chime_gain: 0.08,
            chime_length_secs: 0.2,
        }
    }

    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Переопределяем значения из env, если они заданы
        if let Ok(val) = std::env::var("STORECHAT_WS_BASE_URL") {
            if !val.is_empty() {
                config.ws_base_url = Some(val);
            }
        }

        if let Ok(val) = std::env::var("STORECHAT_API_BASE_URL") {
            if !val.is_empty() {
                config.api_base_url = Some(val);
            }
        }

        if let Ok(val) = std::env::var("STORECHAT_TOAST_DURATION_MS") {
            if let Ok(parsed) = val.parse() {
                config.toast_duration_ms = parsed;
            }
        }

        if let Ok(val) = std::env::var("STORECHAT_LOOPBACK_PORT") {
            if let Ok(parsed) = val.parse() {
                config.loopback_fallback_port = parsed;
            }
        }

        config
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию со значениями по умолчанию
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::default())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }

    /// Проверить, инициализирована ли глобальная конфигурация
    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.loopback_fallback_port, 8000);
        assert_eq!(config.toast_duration_ms, 6000);
        assert_eq!(config.ws_notifications_path, "/ws/notifications/");
    }

    #[test]
    fn test_config_values() {
        let config = Config::default();

        // Сеть
        assert!(config.ws_base_url.is_none());
        assert_eq!(config.ws_chat_path_prefix, "/ws/chat/");
        assert!(config.dev_server_ports.contains(&3000));
        assert!(config.dev_server_ports.contains(&5173));
        assert_eq!(config.websocket_ready_state_open, 1);

        // Сигнал
        assert_eq!(config.chime_frequency_hz, 920.0);
        assert_eq!(config.chime_gain, 0.08);
        assert_eq!(config.chime_length_secs, 0.2);
    }
}

// Резолв WebSocket эндпоинта
// Чистые функции без побочных эффектов; resolve() никогда не падает

use crate::config::Config;
use std::fmt;

/// Схема WebSocket соединения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsScheme {
    Ws,
    Wss,
}

impl fmt::Display for WsScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WsScheme::Ws => write!(f, "ws"),
            WsScheme::Wss => write!(f, "wss"),
        }
    }
}

/// Разрешённый эндпоинт. Пустой host означает "транспорт недоступен".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsEndpoint {
    pub scheme: WsScheme,
    pub host: String,
}

impl WsEndpoint {
    fn unavailable() -> Self {
        Self {
            scheme: WsScheme::Ws,
            host: String::new(),
        }
    }
}

fn is_plausible_host(host: &str) -> bool {
    !host.is_empty()
        && host.chars().any(|c| c.is_ascii_alphanumeric())
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_' | '[' | ']'))
}

fn parse_url(raw: &str) -> Option<WsEndpoint> {
    let (scheme, rest) = raw.split_once("://")?;
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..host_end];
    if !is_plausible_host(host) {
        return None;
    }

    let scheme = if scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("wss") {
        WsScheme::Wss
    } else {
        WsScheme::Ws
    };

    Some(WsEndpoint {
        scheme,
        host: host.to_string(),
    })
}

/// Распарсить кандидата базового адреса (http(s)://, ws(s):// или просто host:port)
pub fn parse_ws_base(candidate: &str) -> Option<WsEndpoint> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_url(trimmed).or_else(|| parse_url(&format!("http://{}", trimmed)))
}

fn is_loopback_hostname(hostname: &str) -> bool {
    matches!(hostname, "localhost" | "127.0.0.1")
}

/// Loopback-адреса dev-серверов переписываются на порт бэкенда:
/// страница на localhost:3000 (CRA) или localhost:5173 (Vite) не несёт
/// WebSocket, он живёт на localhost:8000.
pub fn adjust_local_loopback(config: &Config, endpoint: WsEndpoint) -> WsEndpoint {
    let (hostname, port) = match endpoint.host.split_once(':') {
        Some((h, p)) => (h, Some(p)),
        None => (endpoint.host.as_str(), None),
    };

    if !is_loopback_hostname(hostname) {
        return endpoint;
    }

    let fallback = config.loopback_fallback_port;
    let needs_rewrite = match port {
        None => true,
        Some(p) => match p.parse::<u16>() {
            Ok(parsed) => config.dev_server_ports.contains(&parsed) || parsed != fallback,
            Err(_) => true,
        },
    };

    if needs_rewrite {
        WsEndpoint {
            scheme: endpoint.scheme,
            host: format!("{}:{}", hostname, fallback),
        }
    } else {
        endpoint
    }
}

/// Происхождение страницы (только в браузере)
#[cfg(target_arch = "wasm32")]
fn page_origin_endpoint(config: &Config) -> Option<WsEndpoint> {
    let window = web_sys::window()?;
    let location = window.location();

    let protocol = location.protocol().ok()?;
    let hostname = location.hostname().ok()?;
    let port = location.port().ok()?;
    if hostname.is_empty() {
        return None;
    }

    let scheme = if protocol == "https:" {
        WsScheme::Wss
    } else {
        WsScheme::Ws
    };

    let host = if port.is_empty() {
        hostname
    } else {
        format!("{}:{}", hostname, port)
    };

    Some(adjust_local_loopback(config, WsEndpoint { scheme, host }))
}

#[cfg(not(target_arch = "wasm32"))]
fn page_origin_endpoint(_config: &Config) -> Option<WsEndpoint> {
    None
}

/// Разрешить эндпоинт для конкретной конфигурации
pub fn resolve_with(config: &Config) -> WsEndpoint {
    // 1. Явно заданный WebSocket адрес
    if let Some(endpoint) = config.ws_base_url.as_deref().and_then(parse_ws_base) {
        return endpoint;
    }

    // 2. Базовый адрес API
    if let Some(endpoint) = config
        .api_base_url
        .as_deref()
        .and_then(parse_ws_base)
        .map(|endpoint| adjust_local_loopback(config, endpoint))
    {
        return endpoint;
    }

    // 3. Происхождение страницы (браузер)
    if let Some(endpoint) = page_origin_endpoint(config) {
        return endpoint;
    }

    WsEndpoint::unavailable()
}

/// Разрешить эндпоинт по глобальной конфигурации. Никогда не падает:
/// при отсутствии информации возвращает эндпоинт с пустым host.
pub fn resolve() -> WsEndpoint {
    resolve_with(Config::global())
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Построить полный WebSocket URL для конкретной конфигурации
pub fn build_ws_url_with(config: &Config, path: &str, query: &[(String, String)]) -> Option<String> {
    let endpoint = resolve_with(config);
    // Пустой host — жёсткий отказ для канала, не собираем невалидный URL
    if endpoint.host.is_empty() {
        return None;
    }

    let normalized_path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    let query_string = if query.is_empty() {
        String::new()
    } else {
        let joined = query
            .iter()
            .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{}", joined)
    };

    Some(format!(
        "{}://{}{}{}",
        endpoint.scheme, endpoint.host, normalized_path, query_string
    ))
}

/// Построить полный WebSocket URL; None означает "транспорт недоступен"
pub fn build_ws_url(path: &str, query: &[(String, String)]) -> Option<String> {
    build_ws_url_with(Config::global(), path, query)
}

// Инициализация браузерной среды

use wasm_bindgen::prelude::*;

/// Подключить panic hook и отметить запуск ядра в консоли
#[wasm_bindgen]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"Storechat core initialized".into());
}

// Браузерная обвязка: JS API поверх контроллеров ядра

pub mod bindings;
pub mod console;

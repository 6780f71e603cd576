// Звуковой сигнал входящего сообщения

#[cfg(target_arch = "wasm32")]
use crate::config::Config;
#[cfg(target_arch = "wasm32")]
use crate::utils::logging;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;
#[cfg(target_arch = "wasm32")]
use web_sys::{AudioContext, AudioContextState, OscillatorType};

/// Короткий синтезированный сигнал через Web Audio.
/// AudioContext создаётся лениво: браузеры запрещают создание
/// до первого пользовательского жеста.
#[cfg(target_arch = "wasm32")]
pub struct Chime {
    ctx: Option<AudioContext>,
}

#[cfg(target_arch = "wasm32")]
impl Chime {
    pub fn new() -> Self {
        Self { ctx: None }
    }

    fn ensure_context(&mut self) -> Result<&AudioContext, JsValue> {
        if self.ctx.is_none() {
            self.ctx = Some(AudioContext::new()?);
        }
        let ctx = self.ctx.as_ref().ok_or_else(|| JsValue::from_str("no audio context"))?;

        // Вкладка в фоне: контекст приостановлен, будим
        if ctx.state() == AudioContextState::Suspended {
            let _ = ctx.resume()?;
        }
        Ok(ctx)
    }

    fn try_play(&mut self) -> Result<(), JsValue> {
        let config = Config::global();
        let ctx = self.ensure_context()?;

        let oscillator = ctx.create_oscillator()?;
        let gain = ctx.create_gain()?;

        oscillator.set_type(OscillatorType::Triangle);
        oscillator.frequency().set_value(config.chime_frequency_hz);
        gain.gain().set_value(config.chime_gain);

        oscillator.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&ctx.destination())?;

        let now = ctx.current_time();
        oscillator.start()?;
        oscillator.stop_with_when(now + config.chime_length_secs)?;
        Ok(())
    }

    /// Проиграть сигнал. Ошибки аудио (autoplay policy, отсутствие
    /// устройства) никогда не роняют пайплайн уведомлений.
    pub fn play(&mut self) {
        if let Err(e) = self.try_play() {
            logging::warn(&format!("Chime skipped: {:?}", e));
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for Chime {
    fn default() -> Self {
        Self::new()
    }
}

/// Заглушка для не-WASM платформ
#[cfg(not(target_arch = "wasm32"))]
#[derive(Default)]
pub struct Chime;

#[cfg(not(target_arch = "wasm32"))]
impl Chime {
    pub fn new() -> Self {
        Self
    }

    pub fn play(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_arch = "wasm32"))]
    fn test_stub_play_is_silent_noop() {
        let mut chime = Chime::new();
        chime.play();
        chime.play();
    }
}

// UUID утилиты

pub fn generate_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn is_valid(uuid_str: &str) -> bool {
    uuid::Uuid::parse_str(uuid_str).is_ok()
}

/// Устойчивый к коллизиям идентификатор для тостов и хэндлов.
/// getrandom (с feature `js` для браузера) доступен на всех целевых
/// платформах, поэтому отдельный fallback через timestamp не нужен.
pub fn collision_resistant_id() -> String {
    generate_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_v4_is_valid() {
        let id = generate_v4();
        assert!(is_valid(&id));
    }

    #[test]
    fn test_collision_resistant_id_unique() {
        let a = collision_resistant_id();
        let b = collision_resistant_id();
        assert_ne!(a, b);
    }
}

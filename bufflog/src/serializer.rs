use serde::Serialize;
use serde_json::Value;

// ===== Сериализация полезной нагрузки =====

/// Превращает значение записи в каноническую строку.
///
/// Логгер не разбирает полезную нагрузку сам: он переводит её в
/// [`serde_json::Value`] и отдаёт сериализатору.
pub trait Serializer: Send + Sync {
    fn serialize(&self, payload: &Value) -> Result<String, String>;
}

/// Компактный JSON. Ключи объектов идут в отсортированном порядке.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, payload: &Value) -> Result<String, String> {
        serde_json::to_string(payload).map_err(|e| e.to_string())
    }
}

impl<F> Serializer for F
where
    F: Fn(&Value) -> Result<String, String> + Send + Sync,
{
    fn serialize(&self, payload: &Value) -> Result<String, String> {
        self(payload)
    }
}

/// Ошибка на любом шаге даёт пустое сообщение, а не панику.
pub(crate) fn render_payload<T: Serialize + ?Sized>(
    serializer: &dyn Serializer,
    payload: &T,
) -> String {
    serde_json::to_value(payload)
        .map_err(|e| e.to_string())
        .and_then(|value| serializer.serialize(&value))
        .unwrap_or_default()
}

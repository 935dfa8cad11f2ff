use std::{any::Any, error::Error};

use crate::StatusCode;

/// Общий интерфейс ошибок маршрутизатора для транспортного слоя.
///
/// Транспорт получает ошибку как `Box<dyn ErrorExt>` и по ней решает, какой
/// код отдать клиенту, что записать в лог и с какими тегами посчитать
/// метрику. Трейт object-safe.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Код, который уходит клиенту. Без переопределения: [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Доступ к конкретному типу через downcast.
    fn as_any(&self) -> &dyn Any;

    /// Текст для клиента; внутренние ошибки не раскрываются.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Unknown | StatusCode::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn log_message(&self) -> String {
        format!("{self:?}")
    }

    /// Теги метрики: тип ошибки и код статуса.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().to_string()),
        ]
    }

    /// Короткое имя типа без пути модуля.
    fn type_name(&self) -> String {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("Unknown")
            .to_string()
    }
}

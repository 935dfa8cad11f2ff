use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок маршрутизатора.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки адресации (подписчики, каналы, сообщения)
/// - 4xxx: Backpressure и вытеснение подписчиков
/// - 6xxx: Транспорт / жизненный цикл соединений
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`,
/// что удобно транспортному слою при передаче кода по сети.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Internal = 1003,
    InvalidArgs = 1004,
    Unavailable = 1006,
    InvalidConfig = 1007,

    // === 2xxx: Адресация ===
    NotFound = 2000,
    AlreadyExists = 2001,
    InvalidMessage = 2010,

    // === 4xxx: Backpressure ===
    MailboxFull = 4004,
    SubscriberEvicted = 4005,
    SinkSaturated = 4006,

    // === 6xxx: Транспорт ===
    ConnectionClosed = 6001,
    Timeout = 6002,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    ///
    /// Возвращает `None`, если значение не соответствует ни одному варианту.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Имеет ли смысл повторить операцию (переподключиться,
    /// переподписаться).
    ///
    /// Сам маршрутизатор повторов не делает, решение принимает вызывающая
    /// сторона.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MailboxFull
                | Self::SubscriberEvicted
                | Self::SinkSaturated
                | Self::Timeout
                | Self::ConnectionClosed
        )
    }

    /// Ошибка со стороны клиента: неверный адрес, дубликат или некорректное
    /// сообщение.
    pub fn is_client_error(&self) -> bool {
        let c = self.code();
        if (2000..=4999).contains(&c) {
            return true;
        }
        matches!(self, Self::InvalidArgs)
    }

    /// Внутренняя или инфраструктурная ошибка.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Unknown | Self::Internal | Self::Unavailable | Self::InvalidConfig
        )
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::AlreadyExists => LogLevel::Debug,
            Self::InvalidArgs | Self::InvalidMessage => LogLevel::Info,
            Self::MailboxFull
            | Self::SubscriberEvicted
            | Self::SinkSaturated
            | Self::Timeout
            | Self::ConnectionClosed
            | Self::Unavailable => LogLevel::Warn,
            Self::Unknown | Self::Internal | Self::InvalidConfig => LogLevel::Error,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

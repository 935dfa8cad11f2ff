use std::{fmt, sync::Arc};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{RouterError, RouterResult};

/// Идентификатор подписчика (непрозрачная строка, обычно UUID соединения).
pub type SubscriberId = Arc<str>;
/// Имя канала.
pub type ChannelName = Arc<str>;

/// Подсказка приоритета.
///
/// Зарезервировано: доставка всегда идёт в порядке FIFO, приоритет только
/// переносится вместе с сообщением.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub u8);

/// Куда адресовано сообщение: в канал или конкретному получателю.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Рассылка всем участникам канала.
    Channel(ChannelName),
    /// Личное сообщение одному подписчику.
    Direct(SubscriberId),
}

/// Сообщение, которое маршрутизатор раскладывает по почтовым ящикам.
///
/// Получатель и канал взаимоисключающие: это гарантирует
/// [`MessageBuilder::build`], других путей задать оба поля нет.
#[derive(Debug, Clone)]
pub struct Message {
    id: Uuid,
    sender: Option<SubscriberId>,
    destination: Destination,
    payload: Bytes,
    created_at: DateTime<Utc>,
    priority: Priority,
}

/// Построитель сообщений с проверкой адресации.
#[derive(Debug, Default, Clone)]
pub struct MessageBuilder {
    sender: Option<SubscriberId>,
    receiver: Option<SubscriberId>,
    channel: Option<ChannelName>,
    payload: Bytes,
    priority: Priority,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Message {
    /// Возвращает построитель сообщения.
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Сообщение для рассылки в канал.
    pub fn to_channel(
        channel: &str,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self::with_destination(Destination::Channel(Arc::from(channel)), payload.into())
    }

    /// Личное сообщение получателю `receiver`.
    pub fn direct(
        receiver: &str,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self::with_destination(Destination::Direct(Arc::from(receiver)), payload.into())
    }

    fn with_destination(
        destination: Destination,
        payload: Bytes,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: None,
            destination,
            payload,
            created_at: Utc::now(),
            priority: Priority::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Имя канала, если сообщение адресовано каналу.
    pub fn channel(&self) -> Option<&str> {
        match &self.destination {
            Destination::Channel(channel) => Some(&**channel),
            Destination::Direct(_) => None,
        }
    }

    /// Получатель, если сообщение личное.
    pub fn receiver(&self) -> Option<&str> {
        match &self.destination {
            Destination::Direct(receiver) => Some(&**receiver),
            Destination::Channel(_) => None,
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

impl MessageBuilder {
    pub fn sender(
        mut self,
        sender: &str,
    ) -> Self {
        self.sender = Some(Arc::from(sender));
        self
    }

    pub fn receiver(
        mut self,
        receiver: &str,
    ) -> Self {
        self.receiver = Some(Arc::from(receiver));
        self
    }

    pub fn channel(
        mut self,
        channel: &str,
    ) -> Self {
        self.channel = Some(Arc::from(channel));
        self
    }

    pub fn payload(
        mut self,
        payload: impl Into<Bytes>,
    ) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn priority(
        mut self,
        priority: Priority,
    ) -> Self {
        self.priority = priority;
        self
    }

    /// Собирает сообщение.
    ///
    /// # Ошибки
    /// - `RouterError::InvalidMessage`, если заданы и получатель, и канал,
    ///   либо не задано ни то, ни другое.
    pub fn build(self) -> RouterResult<Message> {
        let destination = match (self.receiver, self.channel) {
            (Some(receiver), None) => Destination::Direct(receiver),
            (None, Some(channel)) => Destination::Channel(channel),
            (Some(_), Some(_)) => {
                return Err(RouterError::InvalidMessage(
                    "message has both a receiver and a channel".to_string(),
                ))
            }
            (None, None) => {
                return Err(RouterError::InvalidMessage(
                    "message has neither a receiver nor a channel".to_string(),
                ))
            }
        };

        Ok(Message {
            id: Uuid::new_v4(),
            sender: self.sender,
            destination,
            payload: self.payload,
            created_at: Utc::now(),
            priority: self.priority,
        })
    }
}

impl fmt::Display for Destination {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Channel(channel) => write!(f, "channel:{channel}"),
            Self::Direct(receiver) => write!(f, "direct:{receiver}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

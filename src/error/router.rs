use std::any::Any;

use switchyard_error::{ErrorExt, StatusCode};
use thiserror::Error;

pub type RouterResult<T> = Result<T, RouterError>;

/// Ошибки операций маршрутизатора.
///
/// Все ошибки возвращаются вызывающей стороне синхронно; ни одна из них не
/// оставляет индексы в промежуточном состоянии. Повторов внутри
/// маршрутизатора нет.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("subscriber not found: {0}")]
    SubscriberNotFound(String),

    #[error("receiver not found: {0}")]
    ReceiverNotFound(String),

    #[error("subscriber already exists: {0}")]
    SubscriberExists(String),

    #[error("channel already exists: {0}")]
    ChannelExists(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("mailbox of {subscriber} is full (capacity {capacity}), subscriber evicted")]
    MailboxFull { subscriber: String, capacity: usize },

    #[error("forward queue is saturated (capacity {capacity}), message dropped")]
    SinkSaturated { capacity: usize },

    #[error("forward queue receiver is gone")]
    SinkClosed,

    #[error("router is shut down")]
    ShutDown,
}

impl RouterError {
    /// `true` для ошибок семейства «не найдено».
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ChannelNotFound(_) | Self::SubscriberNotFound(_) | Self::ReceiverNotFound(_)
        )
    }
}

impl ErrorExt for RouterError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ChannelNotFound(_) | Self::SubscriberNotFound(_) | Self::ReceiverNotFound(_) => {
                StatusCode::NotFound
            }
            Self::SubscriberExists(_) | Self::ChannelExists(_) => StatusCode::AlreadyExists,
            Self::InvalidMessage(_) => StatusCode::InvalidMessage,
            Self::MailboxFull { .. } => StatusCode::MailboxFull,
            Self::SinkSaturated { .. } => StatusCode::SinkSaturated,
            Self::SinkClosed => StatusCode::ConnectionClosed,
            Self::ShutDown => StatusCode::Unavailable,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::MailboxFull { .. } => "Consumer too slow, subscription dropped".to_string(),
            Self::ShutDown | Self::SinkClosed => "Service unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "router".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::ChannelNotFound(channel) | Self::ChannelExists(channel) => {
                tags.push(("channel", channel.clone()));
            }
            Self::SubscriberNotFound(id)
            | Self::ReceiverNotFound(id)
            | Self::SubscriberExists(id) => {
                tags.push(("subscriber", id.clone()));
            }
            Self::MailboxFull {
                subscriber,
                capacity,
            } => {
                tags.push(("subscriber", subscriber.clone()));
                tags.push(("capacity", capacity.to_string()));
            }
            Self::SinkSaturated { capacity } => {
                tags.push(("capacity", capacity.to_string()));
            }
            _ => {}
        }

        tags
    }
}

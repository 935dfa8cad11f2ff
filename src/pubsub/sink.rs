//! Точка передачи сообщения в ящик конкретного подписчика.
//!
//! Маршрутизатор не кладёт сообщения в ящики напрямую: он зовёт
//! [`DeliverySink::deliver`] и получает `Accepted`/`Rejected`. Реализаций
//! ровно две, и выбираются они при сборке маршрутизатора:
//!
//! - [`Sink::Mailbox`] — доставка внутри процесса в [`Mailbox`](super::Mailbox)
//!   подписчика;
//! - [`Sink::Forward`] — передача конверта внешнему потребителю (мост к
//!   брокеру между инстансами, транспорт) через ограниченный `mpsc`.
//!
//! Очередь `Forward` общая для всех подписчиков, поэтому её заполнение
//! сообщается как [`Rejection::Saturated`], а не как переполнение ящика:
//! подписчики за это не вытесняются.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::{Message, Rejection, Subscriber, SubscriberId};

/// Результат передачи одного сообщения одному подписчику.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted,
    Rejected(Rejection),
}

/// Приём сообщения для доставки подписчику.
///
/// Реализация обязана быть неблокирующей: её вызывают под блокировкой
/// чтения индекса тем.
pub trait DeliverySink: Send + Sync {
    fn deliver(
        &self,
        subscriber: &Subscriber,
        message: &Arc<Message>,
    ) -> DeliveryOutcome;
}

/// Сообщение вместе с адресатом для внешнего потребителя.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub recipient: SubscriberId,
    pub message: Arc<Message>,
}

/// Доступные способы доставки.
#[derive(Debug, Clone, Default)]
pub enum Sink {
    /// Доставка в ящик подписчика.
    #[default]
    Mailbox,
    /// Передача конверта во внешний ограниченный канал.
    Forward(mpsc::Sender<Envelope>),
}

impl Sink {
    /// Создаёт [`Sink::Forward`] и приёмную сторону канала ёмкостью
    /// `capacity`.
    pub fn forward(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::Forward(tx), rx)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mailbox => "mailbox",
            Self::Forward(_) => "forward",
        }
    }
}

impl DeliverySink for Sink {
    fn deliver(
        &self,
        subscriber: &Subscriber,
        message: &Arc<Message>,
    ) -> DeliveryOutcome {
        match self {
            Self::Mailbox => match subscriber.mailbox().enqueue(message.clone()) {
                Ok(()) => DeliveryOutcome::Accepted,
                Err(rejection) => DeliveryOutcome::Rejected(rejection),
            },
            Self::Forward(tx) => {
                // Удалённый подписчик не должен получать ничего и через внешний канал.
                if subscriber.mailbox().is_closed() {
                    return DeliveryOutcome::Rejected(Rejection::Closed);
                }
                let envelope = Envelope {
                    recipient: subscriber.id().clone(),
                    message: message.clone(),
                };
                match tx.try_send(envelope) {
                    Ok(()) => DeliveryOutcome::Accepted,
                    Err(TrySendError::Full(_)) => DeliveryOutcome::Rejected(Rejection::Saturated {
                        capacity: tx.max_capacity(),
                    }),
                    Err(TrySendError::Closed(_)) => {
                        DeliveryOutcome::Rejected(Rejection::SinkClosed)
                    }
                }
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

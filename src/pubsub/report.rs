use uuid::Uuid;

use super::{Destination, SubscriberId};

/// Итог доставки одного сообщения.
///
/// Переполнение ящика не делает всю публикацию неуспешной: такой получатель
/// попадает в `evicted` и удаляется, остальные получают сообщение как обычно.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Идентификатор доставленного сообщения.
    pub message_id: Uuid,
    /// Адресат сообщения.
    pub destination: Destination,
    /// Получатели, чьи ящики приняли сообщение.
    pub delivered: Vec<SubscriberId>,
    /// Получатели с переполненным ящиком; они вытеснены.
    pub evicted: Vec<SubscriberId>,
    /// Получатели, удалённые параллельно с публикацией.
    pub missed: Vec<SubscriberId>,
    /// Получатели, которым сообщение не передано из-за заполненной общей
    /// очереди `Forward`. Они остаются подписанными.
    pub dropped: Vec<SubscriberId>,
}

impl DeliveryReport {
    pub(crate) fn new(
        message_id: Uuid,
        destination: Destination,
    ) -> Self {
        Self {
            message_id,
            destination,
            delivered: Vec::new(),
            evicted: Vec::new(),
            missed: Vec::new(),
            dropped: Vec::new(),
        }
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    /// Сколько получателей было найдено в момент публикации.
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.evicted.len() + self.missed.len() + self.dropped.len()
    }

    /// `true`, если ни один получатель не был потерян.
    pub fn is_complete(&self) -> bool {
        self.evicted.is_empty() && self.missed.is_empty() && self.dropped.is_empty()
    }

    pub fn was_delivered_to(
        &self,
        id: &str,
    ) -> bool {
        self.delivered.iter().any(|d| &**d == id)
    }

    pub fn was_evicted(
        &self,
        id: &str,
    ) -> bool {
        self.evicted.iter().any(|d| &**d == id)
    }
}

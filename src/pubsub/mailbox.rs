use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::Message;

/// Причина, по которой сообщение не было принято к доставке.
///
/// `Full` и `Closed` относятся к конкретному подписчику, `Saturated` и
/// `SinkClosed` к общему внешнему каналу и ничего не говорят о самом
/// подписчике.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("mailbox is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("mailbox is closed")]
    Closed,

    #[error("forward queue is saturated (capacity {capacity})")]
    Saturated { capacity: usize },

    #[error("forward queue receiver is gone")]
    SinkClosed,
}


/// Ограниченная FIFO-очередь исходящих сообщений одного подписчика.
///
/// `enqueue` никогда не блокирует публикующую сторону: при переполнении
/// сообщение отклоняется с [`Rejection::Full`], а решение о вытеснении
/// подписчика принимает маршрутизатор. Вычитывает ящик транспортный слой
/// через [`Mailbox::try_dequeue`], [`Mailbox::drain`] или асинхронный
/// [`Mailbox::recv`].
#[derive(Debug)]
pub struct Mailbox {
    state: Mutex<MailboxState>,
    notify: Notify,
    capacity: usize,
}

#[derive(Debug)]
struct MailboxState {
    items: VecDeque<Arc<Message>>,
    closed: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Mailbox {
    /// Создаёт пустой ящик ёмкостью `capacity` (минимум 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(MailboxState {
                items: VecDeque::with_capacity(capacity.min(64)),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Кладёт сообщение в конец очереди.
    ///
    /// # Возвращает
    /// - `Ok(())`, если сообщение принято
    /// - `Err(Rejection::Full)`, если очередь заполнена
    /// - `Err(Rejection::Closed)`, если ящик закрыт (подписчик удалён)
    pub fn enqueue(
        &self,
        message: Arc<Message>,
    ) -> Result<(), Rejection> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Rejection::Closed);
            }
            if state.items.len() >= self.capacity {
                return Err(Rejection::Full {
                    capacity: self.capacity,
                });
            }
            state.items.push_back(message);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Забирает первое сообщение без ожидания.
    ///
    /// Закрытый ящик отдаёт то, что в нём осталось.
    pub fn try_dequeue(&self) -> Option<Arc<Message>> {
        self.state.lock().items.pop_front()
    }

    /// Забирает до `max` сообщений в порядке поступления.
    pub fn drain(
        &self,
        max: usize,
    ) -> Vec<Arc<Message>> {
        let mut state = self.state.lock();
        let n = max.min(state.items.len());
        state.items.drain(..n).collect()
    }

    /// Асинхронно ожидает следующее сообщение.
    ///
    /// # Возвращает
    /// - `Some(message)`, как только в ящике появится сообщение
    /// - `None`, если ящик закрыт и пуст
    pub async fn recv(&self) -> Option<Arc<Message>> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Регистрируемся до проверки состояния, иначе можно пропустить
            // notify_waiters() из close().
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(message) = state.items.pop_front() {
                    return Some(message);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Закрывает ящик: новые сообщения отклоняются, ожидающие `recv`
    /// просыпаются.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

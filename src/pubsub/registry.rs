use std::{collections::HashSet, sync::Arc};

use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;

use super::{ChannelName, Mailbox, SubscriberId};
use crate::error::{RouterError, RouterResult};

/// Живой подписчик: идентификатор, почтовый ящик и каналы, в которых он
/// состоит.
///
/// Владеет подписчиком только [`SubscriberRegistry`]; индекс тем хранит
/// лишь идентификаторы. Набор каналов меняет маршрутизатор под своей
/// эксклюзивной блокировкой, поэтому он всегда совпадает с индексом.
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    mailbox: Mailbox,
    channels: Mutex<HashSet<ChannelName>>,
}

/// Реестр живых подписчиков.
///
/// Единственный владелец жизненного цикла подписчика. Потокобезопасен:
/// `lookup` может идти параллельно с `remove`, и в этом случае вызывающий
/// либо получает подписчика в состоянии до удаления (его ящик к тому моменту
/// может быть уже закрыт), либо `SubscriberNotFound`.
#[derive(Debug)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Arc<Subscriber>>,
    mailbox_capacity: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Subscriber {
    fn new(
        id: SubscriberId,
        mailbox_capacity: usize,
    ) -> Self {
        Self {
            id,
            mailbox: Mailbox::new(mailbox_capacity),
            channels: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Снимок каналов подписчика.
    pub fn channels(&self) -> HashSet<ChannelName> {
        self.channels.lock().clone()
    }

    pub fn is_member_of(
        &self,
        channel: &str,
    ) -> bool {
        self.channels.lock().contains(channel)
    }

    pub(crate) fn add_channel(
        &self,
        channel: ChannelName,
    ) {
        self.channels.lock().insert(channel);
    }

    pub(crate) fn remove_channel(
        &self,
        channel: &str,
    ) -> bool {
        self.channels.lock().remove(channel)
    }

    fn take_channels(&self) -> HashSet<ChannelName> {
        std::mem::take(&mut *self.channels.lock())
    }
}

impl SubscriberRegistry {
    /// Создаёт пустой реестр; каждый новый подписчик получит ящик ёмкостью
    /// `mailbox_capacity`.
    pub fn new(mailbox_capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            mailbox_capacity,
        }
    }

    /// Регистрирует подписчика с пустым ящиком и пустым набором каналов.
    ///
    /// # Ошибки
    /// - `RouterError::SubscriberExists`, если идентификатор уже живой.
    pub fn register(
        &self,
        id: &str,
    ) -> RouterResult<Arc<Subscriber>> {
        let key: SubscriberId = Arc::from(id);
        match self.subscribers.entry(key.clone()) {
            Entry::Occupied(_) => Err(RouterError::SubscriberExists(id.to_string())),
            Entry::Vacant(slot) => {
                let subscriber = Arc::new(Subscriber::new(key, self.mailbox_capacity));
                slot.insert(subscriber.clone());
                Ok(subscriber)
            }
        }
    }

    /// Ищет живого подписчика.
    ///
    /// # Ошибки
    /// - `RouterError::SubscriberNotFound`, если идентификатор неизвестен.
    pub fn lookup(
        &self,
        id: &str,
    ) -> RouterResult<Arc<Subscriber>> {
        self.get(id)
            .ok_or_else(|| RouterError::SubscriberNotFound(id.to_string()))
    }

    /// То же, что [`lookup`](Self::lookup), но без построения ошибки.
    pub fn get(
        &self,
        id: &str,
    ) -> Option<Arc<Subscriber>> {
        self.subscribers.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(
        &self,
        id: &str,
    ) -> bool {
        self.subscribers.contains_key(id)
    }

    /// Удаляет подписчика, закрывает его ящик и возвращает каналы, в которых
    /// он состоял, чтобы вызывающий мог очистить индекс тем.
    ///
    /// # Ошибки
    /// - `RouterError::SubscriberNotFound`, если идентификатор неизвестен.
    pub fn remove(
        &self,
        id: &str,
    ) -> RouterResult<HashSet<ChannelName>> {
        let (_, subscriber) = self
            .subscribers
            .remove(id)
            .ok_or_else(|| RouterError::SubscriberNotFound(id.to_string()))?;
        Ok(Self::retire(&subscriber))
    }

    /// Удаляет именно этот экземпляр подписчика.
    ///
    /// Если под тем же идентификатором уже зарегистрирован новый подписчик,
    /// ничего не делает и возвращает `None`.
    pub(crate) fn remove_exact(
        &self,
        subscriber: &Arc<Subscriber>,
    ) -> Option<HashSet<ChannelName>> {
        self.subscribers
            .remove_if(subscriber.id(), |_, current| Arc::ptr_eq(current, subscriber))
            .map(|(_, removed)| Self::retire(&removed))
    }

    /// Удаляет всех подписчиков, закрывая их ящики.
    pub fn clear(&self) -> usize {
        let ids: Vec<SubscriberId> = self.ids();
        let mut removed = 0;
        for id in ids {
            if self.remove(&id).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    pub fn ids(&self) -> Vec<SubscriberId> {
        self.subscribers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Снимок всех живых подписчиков.
    pub fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    fn retire(subscriber: &Subscriber) -> HashSet<ChannelName> {
        subscriber.mailbox.close();
        subscriber.take_channels()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use super::{ChannelName, SubscriberId};
use crate::config::EmptyChannelPolicy;

/// Двунаправленный индекс: канал → участники и подписчик → каналы.
///
/// Сам по себе индекс не синхронизирован: маршрутизатор держит его под
/// `RwLock`, и каждая мутация меняет обе карты в пределах одной
/// эксклюзивной блокировки. Поэтому `S ∈ members(C) ⇔ C ∈ channels(S)`
/// не нарушается даже для параллельного читателя.
///
/// Имена каналов хранятся как `Arc<str>`: один и тот же ключ разделяется
/// обеими картами.
#[derive(Debug, Default)]
pub struct TopicIndex {
    channels: HashMap<ChannelName, HashSet<SubscriberId>>,
    memberships: HashMap<SubscriberId, HashSet<ChannelName>>,
    policy: EmptyChannelPolicy,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl TopicIndex {
    pub fn new(policy: EmptyChannelPolicy) -> Self {
        Self {
            channels: HashMap::new(),
            memberships: HashMap::new(),
            policy,
        }
    }

    /// Явно создаёт пустой канал.
    ///
    /// # Возвращает
    /// - `true`, если канал создан
    /// - `false`, если канал уже существует
    pub fn add_channel(
        &mut self,
        channel: &str,
    ) -> bool {
        if self.channels.contains_key(channel) {
            return false;
        }
        self.channels.insert(Arc::from(channel), HashSet::new());
        true
    }

    /// Удаляет канал и убирает его из набора каждого участника.
    ///
    /// # Возвращает
    /// - `Some(members)` — бывшие участники канала
    /// - `None`, если канала нет
    pub fn remove_channel(
        &mut self,
        channel: &str,
    ) -> Option<HashSet<SubscriberId>> {
        let members = self.channels.remove(channel)?;
        for id in &members {
            self.unlink_membership(id, channel);
        }
        Some(members)
    }

    /// Добавляет подписчика в канал (канал создаётся при необходимости).
    ///
    /// Операция идемпотентна.
    ///
    /// # Возвращает
    /// - `Some(channel)` — общий ключ канала, если связь создана
    /// - `None`, если подписчик уже состоял в канале
    pub fn join(
        &mut self,
        id: &SubscriberId,
        channel: &str,
    ) -> Option<ChannelName> {
        let key = match self.channels.get_key_value(channel) {
            Some((key, _)) => key.clone(),
            None => Arc::from(channel),
        };

        let members = self.channels.entry(key.clone()).or_default();
        if !members.insert(id.clone()) {
            return None;
        }
        self.memberships
            .entry(id.clone())
            .or_default()
            .insert(key.clone());
        Some(key)
    }

    /// Разрывает связь подписчика с каналом.
    ///
    /// Повторный выход не считается ошибкой и просто возвращает `false`.
    /// При политике [`EmptyChannelPolicy::Prune`] канал удаляется в момент
    /// выхода последнего участника.
    pub fn leave(
        &mut self,
        id: &str,
        channel: &str,
    ) -> bool {
        let Some(members) = self.channels.get_mut(channel) else {
            return false;
        };
        if !members.remove(id) {
            return false;
        }
        let now_empty = members.is_empty();

        self.unlink_membership(id, channel);
        if now_empty && self.policy == EmptyChannelPolicy::Prune {
            self.channels.remove(channel);
        }
        true
    }

    /// Убирает подписчика из всех каналов.
    ///
    /// # Возвращает
    /// - набор каналов, в которых подписчик состоял
    pub fn leave_all(
        &mut self,
        id: &str,
    ) -> HashSet<ChannelName> {
        let channels = self.memberships.remove(id).unwrap_or_default();
        for channel in &channels {
            if let Some(members) = self.channels.get_mut(channel) {
                members.remove(id);
                if members.is_empty() && self.policy == EmptyChannelPolicy::Prune {
                    self.channels.remove(channel);
                }
            }
        }
        channels
    }

    /// Снимок участников канала; `None`, если канала нет.
    pub fn members(
        &self,
        channel: &str,
    ) -> Option<HashSet<SubscriberId>> {
        self.channels.get(channel).cloned()
    }

    /// Участники канала без копирования множества.
    pub fn members_iter<'a>(
        &'a self,
        channel: &str,
    ) -> Option<impl Iterator<Item = &'a SubscriberId> + 'a> {
        self.channels.get(channel).map(|members| members.iter())
    }

    /// Снимок каналов подписчика (пустой, если он нигде не состоит).
    pub fn channels(
        &self,
        id: &str,
    ) -> HashSet<ChannelName> {
        self.memberships.get(id).cloned().unwrap_or_default()
    }

    pub fn is_member(
        &self,
        id: &str,
        channel: &str,
    ) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|members| members.contains(id))
    }

    pub fn contains_channel(
        &self,
        channel: &str,
    ) -> bool {
        self.channels.contains_key(channel)
    }

    /// Идентификаторы, состоящие хотя бы в одном канале.
    pub fn indexed_subscribers(&self) -> Vec<SubscriberId> {
        self.memberships.keys().cloned().collect()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Проверяет двустороннюю согласованность обеих карт.
    pub fn is_consistent(&self) -> bool {
        let forward = self.channels.iter().all(|(channel, members)| {
            members.iter().all(|id| {
                self.memberships
                    .get(id)
                    .is_some_and(|channels| channels.contains(channel))
            })
        });
        let backward = self.memberships.iter().all(|(id, channels)| {
            !channels.is_empty()
                && channels.iter().all(|channel| {
                    self.channels
                        .get(channel)
                        .is_some_and(|members| members.contains(id))
                })
        });
        forward && backward
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.memberships.clear();
    }

    fn unlink_membership(
        &mut self,
        id: &str,
        channel: &str,
    ) {
        if let Some(channels) = self.memberships.get_mut(id) {
            channels.remove(channel);
            if channels.is_empty() {
                self.memberships.remove(id);
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

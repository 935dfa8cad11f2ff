use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use super::{
    ChannelName, DeliveryOutcome, DeliveryReport, DeliverySink, Destination, Message, Rejection,
    Sink, Subscriber, SubscriberId, SubscriberRegistry, TopicIndex,
};
use crate::{
    config::RouterConfig,
    error::{RouterError, RouterResult},
};

/// Маршрутизатор сообщений: публичная поверхность ядра.
///
/// Владеет [`SubscriberRegistry`] и [`TopicIndex`] и связывает их единым
/// протоколом блокировок:
///
/// - любая мутация (подписка, отписка, удаление канала, вытеснение) идёт под
///   эксклюзивной блокировкой индекса и меняет реестр, индекс и набор
///   каналов подписчика за один шаг;
/// - публикация держит разделяемую блокировку всё время доставки, поэтому
///   видит либо состояние до удаления подписчика, либо после, но не
///   промежуточное;
/// - вытеснение подписчиков с переполненным ящиком выполняется уже после
///   освобождения разделяемой блокировки.
///
/// Глобального состояния нет: маршрутизатор создаётся явно и передаётся по
/// ссылке (обычно как `Arc<Router>`).
#[derive(Debug)]
pub struct Router {
    registry: SubscriberRegistry,
    index: RwLock<TopicIndex>,
    sink: Sink,
    config: RouterConfig,
    shut_down: AtomicBool,
    metrics: RouterMetrics,
}

/// Почему подписчик был принудительно удалён.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// Ящик переполнен: потребитель не успевает.
    MailboxFull,
    /// Сигнал от монитора активности.
    Unresponsive,
    /// Вытеснение по запросу вызывающей стороны.
    Manual,
}

/// Снимок счётчиков маршрутизатора.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    /// Вызовы публикации в канал.
    pub published: u64,
    /// Успешные личные сообщения.
    pub direct_sent: u64,
    /// Сообщения, принятые ящиками при рассылке в каналы.
    pub delivered: u64,
    /// Принудительно удалённые подписчики.
    pub evicted: u64,
    /// Получатели, удалённые параллельно с доставкой.
    pub missed: u64,
    /// Сообщения, не переданные из-за заполненной очереди `Forward`.
    pub dropped: u64,
    pub subscribers: usize,
    pub channels: usize,
}

#[derive(Debug, Default)]
struct RouterMetrics {
    published: AtomicU64,
    direct_sent: AtomicU64,
    delivered: AtomicU64,
    evicted: AtomicU64,
    missed: AtomicU64,
    dropped: AtomicU64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Router {
    /// Создаёт маршрутизатор с доставкой в ящики подписчиков.
    pub fn new(config: RouterConfig) -> Self {
        Self::with_sink(config, Sink::Mailbox)
    }

    /// Создаёт маршрутизатор с заданным способом доставки.
    pub fn with_sink(
        config: RouterConfig,
        sink: Sink,
    ) -> Self {
        info!(
            "Router started: mailbox capacity {}, empty channels {:?}, sink {}",
            config.mailbox_capacity,
            config.empty_channel_policy,
            sink.name()
        );
        Self {
            registry: SubscriberRegistry::new(config.mailbox_capacity),
            index: RwLock::new(TopicIndex::new(config.empty_channel_policy)),
            sink,
            config,
            shut_down: AtomicBool::new(false),
            metrics: RouterMetrics::default(),
        }
    }

    /// Явно регистрирует подписчика без каналов.
    ///
    /// # Ошибки
    /// - `RouterError::SubscriberExists`, если идентификатор уже живой.
    pub fn register(
        &self,
        id: &str,
    ) -> RouterResult<Arc<Subscriber>> {
        let _index = self.index.write();
        self.ensure_running()?;
        let subscriber = self.registry.register(id)?;
        debug!("Registered subscriber {}", id);
        Ok(subscriber)
    }

    /// Подписывает `id` на `channel`.
    ///
    /// Первый вызов для нового идентификатора регистрирует подписчика, канал
    /// создаётся при необходимости. Повторная подписка ничего не меняет.
    ///
    /// # Возвращает
    /// - `true`, если связь создана этим вызовом
    pub fn subscribe(
        &self,
        id: &str,
        channel: &str,
    ) -> RouterResult<bool> {
        let mut index = self.index.write();
        self.ensure_running()?;

        let subscriber = match self.registry.get(id) {
            Some(subscriber) => subscriber,
            None => self.registry.register(id)?,
        };
        let Some(key) = index.join(subscriber.id(), channel) else {
            return Ok(false);
        };
        subscriber.add_channel(key);
        debug!("Subscriber {} joined channel {}", id, channel);
        Ok(true)
    }

    /// Отписывает `id` от `channel`.
    ///
    /// Отписка от канала, в котором подписчик не состоит, не считается
    /// ошибкой.
    ///
    /// # Ошибки
    /// - `RouterError::ChannelNotFound`, если канала нет
    /// - `RouterError::SubscriberNotFound`, если подписчик неизвестен
    pub fn unsubscribe(
        &self,
        id: &str,
        channel: &str,
    ) -> RouterResult<()> {
        let mut index = self.index.write();
        self.ensure_running()?;

        if !index.contains_channel(channel) {
            return Err(RouterError::ChannelNotFound(channel.to_string()));
        }
        let subscriber = self.registry.lookup(id)?;
        if index.leave(id, channel) {
            subscriber.remove_channel(channel);
            debug!("Subscriber {} left channel {}", id, channel);
        }
        Ok(())
    }

    /// Удаляет подписчика из всех каналов и из реестра (отключение клиента).
    ///
    /// # Возвращает
    /// - каналы, в которых подписчик состоял
    ///
    /// # Ошибки
    /// - `RouterError::SubscriberNotFound`, если подписчик неизвестен
    pub fn unsubscribe_all(
        &self,
        id: &str,
    ) -> RouterResult<HashSet<ChannelName>> {
        let mut index = self.index.write();
        self.ensure_running()?;

        self.registry.remove(id)?;
        let channels = index.leave_all(id);
        info!(
            "Subscriber {} removed, left {} channel(s)",
            id,
            channels.len()
        );
        Ok(channels)
    }

    /// Принудительно удаляет подписчика. Для монитора активности это то же
    /// самое, что [`unsubscribe_all`](Self::unsubscribe_all).
    ///
    /// # Возвращает
    /// - `true`, если подписчик был живым и удалён
    pub fn evict(
        &self,
        id: &str,
        reason: EvictionReason,
    ) -> bool {
        let mut index = self.index.write();
        if self.is_shut_down() || self.registry.remove(id).is_err() {
            return false;
        }
        let channels = index.leave_all(id);
        self.metrics.evicted.fetch_add(1, Ordering::Relaxed);
        warn!(
            "Subscriber {} evicted ({}), left {} channel(s)",
            id,
            reason,
            channels.len()
        );
        true
    }

    /// Рассылает `payload` всем участникам канала.
    ///
    /// # Ошибки
    /// - `RouterError::ChannelNotFound`, если канала нет
    /// - `RouterError::SinkClosed`, если приёмная сторона `Forward` закрыта
    pub fn publish_to_channel(
        &self,
        channel: &str,
        payload: impl Into<Bytes>,
    ) -> RouterResult<DeliveryReport> {
        self.fan_out(channel, Arc::new(Message::to_channel(channel, payload)))
    }

    /// Отправляет личное сообщение, минуя индекс тем.
    ///
    /// # Ошибки
    /// - `RouterError::ReceiverNotFound`, если получатель неизвестен или
    ///   удаляется прямо сейчас
    /// - `RouterError::MailboxFull`, если ящик получателя переполнен; получатель
    ///   при этом вытесняется
    /// - `RouterError::SinkSaturated` / `RouterError::SinkClosed` при доставке
    ///   через `Forward`; получатель остаётся подписанным
    pub fn send_direct(
        &self,
        receiver: &str,
        payload: impl Into<Bytes>,
    ) -> RouterResult<()> {
        self.deliver_direct(receiver, Arc::new(Message::direct(receiver, payload)))
    }

    /// Доставляет готовое сообщение по его адресу.
    ///
    /// Для личного сообщения отчёт содержит единственного получателя.
    pub fn route(
        &self,
        message: Message,
    ) -> RouterResult<DeliveryReport> {
        let destination = message.destination().clone();
        let message = Arc::new(message);
        match &destination {
            Destination::Channel(channel) => self.fan_out(channel, message),
            Destination::Direct(receiver) => {
                let id = message.id();
                self.deliver_direct(receiver, message)?;
                let mut report = DeliveryReport::new(id, destination.clone());
                report.delivered.push(receiver.clone());
                Ok(report)
            }
        }
    }

    /// Явно создаёт пустой канал.
    ///
    /// # Ошибки
    /// - `RouterError::ChannelExists`, если канал уже есть
    pub fn add_channel(
        &self,
        channel: &str,
    ) -> RouterResult<()> {
        let mut index = self.index.write();
        self.ensure_running()?;

        if !index.add_channel(channel) {
            return Err(RouterError::ChannelExists(channel.to_string()));
        }
        info!("Channel {} created", channel);
        Ok(())
    }

    /// Удаляет канал, предварительно убрав его из набора каждого участника.
    ///
    /// # Возвращает
    /// - бывших участников канала
    ///
    /// # Ошибки
    /// - `RouterError::ChannelNotFound`, если канала нет
    pub fn remove_channel(
        &self,
        channel: &str,
    ) -> RouterResult<HashSet<SubscriberId>> {
        let mut index = self.index.write();
        self.ensure_running()?;

        let members = index
            .remove_channel(channel)
            .ok_or_else(|| RouterError::ChannelNotFound(channel.to_string()))?;
        for id in &members {
            if let Some(subscriber) = self.registry.get(id) {
                subscriber.remove_channel(channel);
            }
        }
        info!("Channel {} removed with {} member(s)", channel, members.len());
        Ok(members)
    }

    /// Каналы подписчика.
    ///
    /// # Ошибки
    /// - `RouterError::SubscriberNotFound`, если подписчик неизвестен
    pub fn subscriptions(
        &self,
        id: &str,
    ) -> RouterResult<HashSet<ChannelName>> {
        let index = self.index.read();
        if !self.registry.contains(id) {
            return Err(RouterError::SubscriberNotFound(id.to_string()));
        }
        Ok(index.channels(id))
    }

    /// Участники канала.
    ///
    /// # Ошибки
    /// - `RouterError::ChannelNotFound`, если канала нет
    pub fn subscribers(
        &self,
        channel: &str,
    ) -> RouterResult<HashSet<SubscriberId>> {
        self.index
            .read()
            .members(channel)
            .ok_or_else(|| RouterError::ChannelNotFound(channel.to_string()))
    }

    pub fn subscriber(
        &self,
        id: &str,
    ) -> Option<Arc<Subscriber>> {
        self.registry.get(id)
    }

    /// Забирает следующее сообщение из ящика подписчика.
    ///
    /// # Ошибки
    /// - `RouterError::SubscriberNotFound`, если подписчик неизвестен
    pub fn dequeue(
        &self,
        id: &str,
    ) -> RouterResult<Option<Arc<Message>>> {
        Ok(self.registry.lookup(id)?.mailbox().try_dequeue())
    }

    pub fn contains_channel(
        &self,
        channel: &str,
    ) -> bool {
        self.index.read().contains_channel(channel)
    }

    pub fn channel_count(&self) -> usize {
        self.index.read().channel_count()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn metrics(&self) -> RouterStats {
        RouterStats {
            published: self.metrics.published.load(Ordering::Relaxed),
            direct_sent: self.metrics.direct_sent.load(Ordering::Relaxed),
            delivered: self.metrics.delivered.load(Ordering::Relaxed),
            evicted: self.metrics.evicted.load(Ordering::Relaxed),
            missed: self.metrics.missed.load(Ordering::Relaxed),
            dropped: self.metrics.dropped.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
            channels: self.channel_count(),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Останавливает маршрутизатор: закрывает все ящики и очищает оба
    /// индекса. Повторный вызов ничего не делает.
    ///
    /// # Возвращает
    /// - число удалённых подписчиков
    pub fn shutdown(&self) -> usize {
        let mut index = self.index.write();
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return 0;
        }
        index.clear();
        let removed = self.registry.clear();
        info!("Router shut down, {} subscriber(s) removed", removed);
        removed
    }

    /// Проверяет согласованность реестра, индекса и наборов каналов
    /// подписчиков.
    pub fn check_invariants(&self) -> bool {
        let index = self.index.read();
        if !index.is_consistent() {
            return false;
        }
        let no_dangling = index
            .indexed_subscribers()
            .iter()
            .all(|id| self.registry.contains(id));
        let mirrored = self
            .registry
            .snapshot()
            .iter()
            .all(|subscriber| subscriber.channels() == index.channels(subscriber.id()));
        no_dangling && mirrored
    }

    fn ensure_running(&self) -> RouterResult<()> {
        if self.is_shut_down() {
            return Err(RouterError::ShutDown);
        }
        Ok(())
    }

    fn fan_out(
        &self,
        channel: &str,
        message: Arc<Message>,
    ) -> RouterResult<DeliveryReport> {
        let mut overflowed = Vec::new();
        let report = {
            let index = self.index.read();
            self.ensure_running()?;

            let members = index
                .members_iter(channel)
                .ok_or_else(|| RouterError::ChannelNotFound(channel.to_string()))?;
            let mut report = DeliveryReport::new(message.id(), message.destination().clone());

            for id in members {
                let Some(subscriber) = self.registry.get(id) else {
                    report.missed.push(id.clone());
                    continue;
                };
                match self.sink.deliver(&subscriber, &message) {
                    DeliveryOutcome::Accepted => {
                        trace!("Message {} delivered to {}", message.id(), id);
                        report.delivered.push(id.clone());
                    }
                    DeliveryOutcome::Rejected(Rejection::Full { .. }) => {
                        report.evicted.push(id.clone());
                        overflowed.push(subscriber);
                    }
                    DeliveryOutcome::Rejected(Rejection::Closed) => {
                        report.missed.push(id.clone());
                    }
                    DeliveryOutcome::Rejected(Rejection::Saturated { .. }) => {
                        report.dropped.push(id.clone());
                    }
                    DeliveryOutcome::Rejected(Rejection::SinkClosed) => {
                        warn!("Forward sink closed, message {} not routed", message.id());
                        return Err(RouterError::SinkClosed);
                    }
                }
            }
            report
        };

        for subscriber in &overflowed {
            self.evict_instance(subscriber, EvictionReason::MailboxFull);
        }

        self.metrics.published.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .delivered
            .fetch_add(report.delivered.len() as u64, Ordering::Relaxed);
        self.metrics
            .missed
            .fetch_add(report.missed.len() as u64, Ordering::Relaxed);
        if !report.dropped.is_empty() {
            self.metrics
                .dropped
                .fetch_add(report.dropped.len() as u64, Ordering::Relaxed);
            debug!(
                "Forward queue saturated, message {} dropped for {} recipient(s)",
                message.id(),
                report.dropped.len()
            );
        }
        Ok(report)
    }

    fn deliver_direct(
        &self,
        receiver: &str,
        message: Arc<Message>,
    ) -> RouterResult<()> {
        let (subscriber, capacity) = {
            let _index = self.index.read();
            self.ensure_running()?;

            let subscriber = self
                .registry
                .get(receiver)
                .ok_or_else(|| RouterError::ReceiverNotFound(receiver.to_string()))?;
            match self.sink.deliver(&subscriber, &message) {
                DeliveryOutcome::Accepted => {
                    trace!("Message {} delivered to {}", message.id(), receiver);
                    self.metrics.direct_sent.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                DeliveryOutcome::Rejected(Rejection::Closed) => {
                    self.metrics.missed.fetch_add(1, Ordering::Relaxed);
                    return Err(RouterError::ReceiverNotFound(receiver.to_string()));
                }
                DeliveryOutcome::Rejected(Rejection::Saturated { capacity }) => {
                    self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                    return Err(RouterError::SinkSaturated { capacity });
                }
                DeliveryOutcome::Rejected(Rejection::SinkClosed) => {
                    return Err(RouterError::SinkClosed);
                }
                DeliveryOutcome::Rejected(Rejection::Full { capacity }) => (subscriber, capacity),
            }
        };

        self.evict_instance(&subscriber, EvictionReason::MailboxFull);
        Err(RouterError::MailboxFull {
            subscriber: receiver.to_string(),
            capacity,
        })
    }

    /// Вытесняет именно этот экземпляр подписчика; если его уже удалили
    /// (или под тем же идентификатором живёт новый), ничего не делает.
    ///
    /// # Возвращает
    /// - `true`, если экземпляр был живым и удалён
    pub fn evict_subscriber(
        &self,
        subscriber: &Arc<Subscriber>,
        reason: EvictionReason,
    ) -> bool {
        if self.is_shut_down() {
            return false;
        }
        self.evict_instance(subscriber, reason)
    }

    fn evict_instance(
        &self,
        subscriber: &Arc<Subscriber>,
        reason: EvictionReason,
    ) -> bool {
        let mut index = self.index.write();
        if self.registry.remove_exact(subscriber).is_none() {
            return false;
        }
        let channels = index.leave_all(subscriber.id());
        self.metrics.evicted.fetch_add(1, Ordering::Relaxed);
        warn!(
            "Subscriber {} evicted ({}), left {} channel(s)",
            subscriber.id(),
            reason,
            channels.len()
        );
        true
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MailboxFull => "mailbox_full",
            Self::Unresponsive => "unresponsive",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmptyChannelPolicy;

    fn router(capacity: usize) -> Router {
        Router::new(RouterConfig::default().with_mailbox_capacity(capacity))
    }

    fn ids(set: &HashSet<SubscriberId>) -> Vec<String> {
        let mut v: Vec<_> = set.iter().map(|id| id.to_string()).collect();
        v.sort();
        v
    }

    /// Тест проверяет, что первая подписка регистрирует подписчика.
    #[test]
    fn test_subscribe_registers_and_joins() {
        let router = router(4);
        assert!(router.subscribe("u1", "news").unwrap());
        assert!(!router.subscribe("u1", "news").unwrap());

        assert_eq!(router.subscriber_count(), 1);
        assert!(router.subscriptions("u1").unwrap().contains("news"));
        assert!(router.subscriber("u1").unwrap().is_member_of("news"));
        assert!(router.check_invariants());
    }

    #[test]
    fn test_register_duplicate() {
        let router = router(4);
        router.register("u1").unwrap();
        assert_eq!(
            router.register("u1").unwrap_err(),
            RouterError::SubscriberExists("u1".into())
        );
    }

    /// Тест проверяет различение «нет канала» и «нет подписчика».
    #[test]
    fn test_unsubscribe_errors() {
        let router = router(4);
        router.subscribe("u1", "news").unwrap();

        assert_eq!(
            router.unsubscribe("u1", "sports").unwrap_err(),
            RouterError::ChannelNotFound("sports".into())
        );
        assert_eq!(
            router.unsubscribe("ghost", "news").unwrap_err(),
            RouterError::SubscriberNotFound("ghost".into())
        );

        router.unsubscribe("u1", "news").unwrap();
        // Повторная отписка не ошибка.
        router.unsubscribe("u1", "news").unwrap();
        assert!(router.subscriptions("u1").unwrap().is_empty());
        assert!(router.check_invariants());
    }

    #[test]
    fn test_unsubscribe_all_removes_subscriber() {
        let router = router(4);
        router.subscribe("u1", "news").unwrap();
        router.subscribe("u1", "weather").unwrap();
        let sub = router.subscriber("u1").unwrap();

        let left = router.unsubscribe_all("u1").unwrap();
        assert_eq!(left.len(), 2);
        assert!(sub.mailbox().is_closed());
        assert_eq!(
            router.subscriptions("u1").unwrap_err(),
            RouterError::SubscriberNotFound("u1".into())
        );
        assert!(router.subscribers("news").unwrap().is_empty());
        assert!(router.unsubscribe_all("u1").is_err());
    }

    #[test]
    fn test_publish_report() {
        let router = router(4);
        router.subscribe("u1", "news").unwrap();
        router.subscribe("u2", "news").unwrap();

        let report = router.publish_to_channel("news", "hello").unwrap();
        assert_eq!(report.delivered_count(), 2);
        assert!(report.is_complete());
        assert_eq!(
            router.dequeue("u1").unwrap().unwrap().payload(),
            "hello"
        );

        assert_eq!(
            router.publish_to_channel("missing", "x").unwrap_err(),
            RouterError::ChannelNotFound("missing".into())
        );
    }

    /// Тест проверяет, что публикация в существующий пустой канал не ошибка.
    #[test]
    fn test_publish_to_empty_channel() {
        let router = router(4);
        router.add_channel("lobby").unwrap();

        let report = router.publish_to_channel("lobby", "x").unwrap();
        assert_eq!(report.attempted(), 0);
    }

    /// Тест проверяет вытеснение при переполнении и изоляцию остальных.
    #[test]
    fn test_full_mailbox_evicts_only_slow_subscriber() {
        let router = router(1);
        router.subscribe("slow", "c").unwrap();
        router.subscribe("fast", "c").unwrap();

        router.publish_to_channel("c", "m1").unwrap();
        router.dequeue("fast").unwrap();

        let report = router.publish_to_channel("c", "m2").unwrap();
        assert!(report.was_evicted("slow"));
        assert!(report.was_delivered_to("fast"));
        assert!(router.subscriber("slow").is_none());
        assert_eq!(ids(&router.subscribers("c").unwrap()), vec!["fast"]);
        assert_eq!(router.metrics().evicted, 1);
        assert!(router.check_invariants());
    }

    #[test]
    fn test_send_direct() {
        let router = router(1);
        router.register("u1").unwrap();

        router.send_direct("u1", "hi").unwrap();
        assert_eq!(
            router.send_direct("ghost", "hi").unwrap_err(),
            RouterError::ReceiverNotFound("ghost".into())
        );

        let err = router.send_direct("u1", "overflow").unwrap_err();
        assert_eq!(
            err,
            RouterError::MailboxFull {
                subscriber: "u1".into(),
                capacity: 1
            }
        );
        assert!(router.subscriber("u1").is_none());
        assert_eq!(router.metrics().direct_sent, 1);
    }

    #[test]
    fn test_route_dispatches_by_destination() {
        let router = router(4);
        router.subscribe("u1", "news").unwrap();

        let report = router
            .route(Message::builder().channel("news").payload("a").build().unwrap())
            .unwrap();
        assert!(report.was_delivered_to("u1"));

        let direct = Message::builder()
            .sender("u2")
            .receiver("u1")
            .payload("b")
            .build()
            .unwrap();
        let report = router.route(direct).unwrap();
        assert_eq!(report.destination, Destination::Direct(Arc::from("u1")));
        assert!(report.was_delivered_to("u1"));

        let received = router.dequeue("u1").unwrap();
        assert_eq!(received.unwrap().payload(), "a");
        let received = router.dequeue("u1").unwrap().unwrap();
        assert_eq!(received.sender(), Some("u2"));
    }

    #[test]
    fn test_channel_lifecycle() {
        let router = router(4);
        router.add_channel("sports").unwrap();
        assert_eq!(
            router.add_channel("sports").unwrap_err(),
            RouterError::ChannelExists("sports".into())
        );

        router.subscribe("u1", "sports").unwrap();
        router.subscribe("u1", "news").unwrap();
        let members = router.remove_channel("sports").unwrap();
        assert_eq!(ids(&members), vec!["u1"]);

        assert!(!router.contains_channel("sports"));
        assert!(!router.subscriber("u1").unwrap().is_member_of("sports"));
        assert_eq!(router.subscriptions("u1").unwrap().len(), 1);
        assert!(router.remove_channel("sports").is_err());
        assert!(router.check_invariants());
    }

    /// Тест проверяет политику Prune на уровне маршрутизатора.
    #[test]
    fn test_prune_policy() {
        let router = Router::new(RouterConfig::default().with_policy(EmptyChannelPolicy::Prune));
        router.subscribe("u1", "news").unwrap();
        router.unsubscribe("u1", "news").unwrap();

        assert!(!router.contains_channel("news"));
        assert!(router.subscriber("u1").unwrap().channels().is_empty());
        assert!(router.check_invariants());
    }

    #[test]
    fn test_evict() {
        let router = router(4);
        router.subscribe("u1", "news").unwrap();

        assert!(router.evict("u1", EvictionReason::Unresponsive));
        assert!(!router.evict("u1", EvictionReason::Unresponsive));
        assert!(router.subscribers("news").unwrap().is_empty());
        assert_eq!(router.metrics().evicted, 1);
    }

    /// Тест проверяет, что после остановки операции возвращают ShutDown.
    #[test]
    fn test_shutdown() {
        let router = router(4);
        router.subscribe("u1", "news").unwrap();
        let sub = router.subscriber("u1").unwrap();

        assert_eq!(router.shutdown(), 1);
        assert_eq!(router.shutdown(), 0);
        assert!(router.is_shut_down());
        assert!(sub.mailbox().is_closed());
        assert_eq!(router.channel_count(), 0);

        assert_eq!(
            router.subscribe("u1", "news").unwrap_err(),
            RouterError::ShutDown
        );
        assert_eq!(
            router.publish_to_channel("news", "x").unwrap_err(),
            RouterError::ShutDown
        );
        assert_eq!(router.send_direct("u1", "x").unwrap_err(), RouterError::ShutDown);
    }

    #[test]
    fn test_metrics_snapshot() {
        let router = router(4);
        router.subscribe("u1", "a").unwrap();
        router.subscribe("u2", "a").unwrap();
        router.publish_to_channel("a", "x").unwrap();
        router.send_direct("u1", "y").unwrap();

        let stats = router.metrics();
        assert_eq!(stats.published, 1);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.direct_sent, 1);
        assert_eq!(stats.subscribers, 2);
        assert_eq!(stats.channels, 1);
    }

    /// Тест проверяет, что заполненная общая очередь Forward не вытесняет
    /// подписчиков: лишние получатели попадают в `dropped`.
    #[test]
    fn test_forward_saturation_keeps_subscribers() {
        let (sink, mut rx) = Sink::forward(2);
        let router = Router::with_sink(RouterConfig::default(), sink);
        for i in 0..10 {
            router.subscribe(&format!("u{i}"), "c").unwrap();
        }

        let report = router.publish_to_channel("c", "x").unwrap();
        assert_eq!(report.delivered_count(), 2);
        assert_eq!(report.dropped.len(), 8);
        assert!(report.evicted.is_empty());
        assert!(report.missed.is_empty());
        assert_eq!(router.subscriber_count(), 10);
        assert_eq!(router.metrics().evicted, 0);
        assert_eq!(router.metrics().dropped, 8);

        while rx.try_recv().is_ok() {}
        router.send_direct("u3", "y").unwrap();
        router.send_direct("u4", "z").unwrap();
        assert_eq!(
            router.send_direct("u5", "w").unwrap_err(),
            RouterError::SinkSaturated { capacity: 2 }
        );
        assert!(router.subscriber("u5").is_some());
        assert!(router.check_invariants());
    }

    /// Тест проверяет, что брошенная приёмная сторона Forward не выдаётся
    /// за отсутствие получателя.
    #[test]
    fn test_forward_sink_closed() {
        let (sink, rx) = Sink::forward(4);
        let router = Router::with_sink(RouterConfig::default(), sink);
        router.subscribe("u1", "news").unwrap();
        router.subscribe("u2", "news").unwrap();
        drop(rx);

        assert_eq!(router.send_direct("u1", "x").unwrap_err(), RouterError::SinkClosed);
        assert_eq!(
            router.publish_to_channel("news", "x").unwrap_err(),
            RouterError::SinkClosed
        );
        assert_eq!(router.subscriber_count(), 2);
        assert_eq!(router.metrics().missed, 0);
    }

    /// Тест проверяет, что вытеснение по экземпляру не трогает нового
    /// подписчика с тем же идентификатором.
    #[test]
    fn test_evict_subscriber_is_incarnation_exact() {
        let router = router(4);
        router.subscribe("u1", "news").unwrap();
        let old = router.subscriber("u1").unwrap();
        router.unsubscribe_all("u1").unwrap();
        router.subscribe("u1", "news").unwrap();

        assert!(!router.evict_subscriber(&old, EvictionReason::Unresponsive));
        assert!(router.subscriber("u1").is_some());

        let current = router.subscriber("u1").unwrap();
        assert!(router.evict_subscriber(&current, EvictionReason::Unresponsive));
        assert!(router.subscriber("u1").is_none());
        assert!(router.check_invariants());
    }

    #[test]
    fn test_eviction_reason_display() {
        assert_eq!(EvictionReason::MailboxFull.to_string(), "mailbox_full");
        assert_eq!(EvictionReason::Unresponsive.as_str(), "unresponsive");
    }
}

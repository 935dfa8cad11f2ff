use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use dashmap::DashMap;
use tokio::{
    select,
    sync::Notify,
    task::JoinHandle,
    time::{interval, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use super::{EvictionReason, Router, Subscriber, SubscriberId};

/// Учёт сигналов активности подписчиков.
///
/// Транспортный слой вызывает [`touch`](Self::touch) на каждый heartbeat;
/// подписчик, молчащий дольше `timeout`, считается неотвечающим и
/// вытесняется фоновой задачей [`spawn_liveness_task`].
///
/// Запись привязана к конкретному экземпляру подписчика, а не к
/// идентификатору: после удаления и повторной регистрации с тем же
/// идентификатором старый heartbeat к новому подписчику не относится.
#[derive(Debug)]
pub struct LivenessMonitor {
    last_seen: DashMap<SubscriberId, Heartbeat>,
    timeout: Duration,
}

#[derive(Debug)]
struct Heartbeat {
    subscriber: Weak<Subscriber>,
    at: Instant,
}

impl Heartbeat {
    fn is_for(
        &self,
        subscriber: &Arc<Subscriber>,
    ) -> bool {
        std::ptr::eq(self.subscriber.as_ptr(), Arc::as_ptr(subscriber))
    }
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_seen: DashMap::new(),
            timeout,
        }
    }

    /// Отмечает подписчика как активного в текущий момент.
    ///
    /// Если под тем же идентификатором раньше следили за другим
    /// экземпляром, запись заменяется.
    pub fn touch(
        &self,
        subscriber: &Arc<Subscriber>,
    ) {
        let now = Instant::now();
        match self.last_seen.get_mut(subscriber.id()) {
            Some(mut seen) => {
                if !seen.is_for(subscriber) {
                    seen.subscriber = Arc::downgrade(subscriber);
                }
                seen.at = now;
            }
            None => {
                self.last_seen.insert(
                    subscriber.id().clone(),
                    Heartbeat {
                        subscriber: Arc::downgrade(subscriber),
                        at: now,
                    },
                );
            }
        }
    }

    /// Перестаёт следить за подписчиком (штатное отключение).
    pub fn forget(
        &self,
        id: &str,
    ) -> bool {
        self.last_seen.remove(id).is_some()
    }

    pub fn last_seen(
        &self,
        id: &str,
    ) -> Option<Instant> {
        self.last_seen.get(id).map(|seen| seen.at)
    }

    /// Убирает из учёта и возвращает подписчиков, молчащих дольше таймаута
    /// на момент `now`.
    ///
    /// Записи об уже удалённых подписчиках отбрасываются молча.
    pub fn sweep(
        &self,
        now: Instant,
    ) -> Vec<Arc<Subscriber>> {
        let mut stale = Vec::new();
        self.last_seen.retain(|_, seen| {
            let Some(subscriber) = seen.subscriber.upgrade() else {
                return false;
            };
            if subscriber.mailbox().is_closed() {
                return false;
            }
            if now.duration_since(seen.at) > self.timeout {
                stale.push(subscriber);
                return false;
            }
            true
        });
        stale
    }

    pub fn tracked(&self) -> usize {
        self.last_seen.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

////////////////////////////////////////////////////////////////////////////////
// Внешние функции
////////////////////////////////////////////////////////////////////////////////

/// Запускает фоновую задачу, которая каждые `sweep_interval` вытесняет
/// неотвечающих подписчиков.
///
/// Задача завершается по сигналу `shutdown` и возвращает общее число
/// вытесненных подписчиков.
pub fn spawn_liveness_task(
    router: Arc<Router>,
    monitor: Arc<LivenessMonitor>,
    sweep_interval: Duration,
    shutdown: Arc<Notify>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut ticker = interval(sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut total = 0;

        loop {
            select! {
                _ = shutdown.notified() => {
                    info!("Liveness task stopped, {} subscriber(s) evicted in total", total);
                    break;
                }
                _ = ticker.tick() => {
                    let evicted = monitor
                        .sweep(Instant::now())
                        .iter()
                        .filter(|subscriber| {
                            router.evict_subscriber(subscriber, EvictionReason::Unresponsive)
                        })
                        .count();
                    if evicted > 0 {
                        debug!("Liveness sweep evicted {} subscriber(s)", evicted);
                    }
                    total += evicted;
                }
            }
        }
        total
    })
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::RouterConfig, pubsub::SubscriberRegistry};

    #[tokio::test]
    async fn test_sweep_returns_stale_only() {
        tokio::time::pause();

        let registry = SubscriberRegistry::new(4);
        let old = registry.register("old").unwrap();
        let fresh = registry.register("fresh").unwrap();

        let monitor = LivenessMonitor::new(Duration::from_secs(10));
        monitor.touch(&old);
        tokio::time::advance(Duration::from_secs(8)).await;
        monitor.touch(&fresh);
        tokio::time::advance(Duration::from_secs(3)).await;

        let stale = monitor.sweep(Instant::now());
        assert_eq!(stale.len(), 1);
        assert!(Arc::ptr_eq(&stale[0], &old));
        assert_eq!(monitor.tracked(), 1);
        assert!(monitor.last_seen("fresh").is_some());
    }

    #[tokio::test]
    async fn test_touch_refreshes_and_forget_untracks() {
        tokio::time::pause();

        let registry = SubscriberRegistry::new(4);
        let sub = registry.register("u1").unwrap();

        let monitor = LivenessMonitor::new(Duration::from_secs(10));
        monitor.touch(&sub);
        tokio::time::advance(Duration::from_secs(9)).await;
        monitor.touch(&sub);
        tokio::time::advance(Duration::from_secs(9)).await;

        assert!(monitor.sweep(Instant::now()).is_empty());
        assert!(monitor.forget("u1"));
        assert!(!monitor.forget("u1"));
        assert_eq!(monitor.tracked(), 0);
    }

    /// Тест проверяет, что heartbeat удалённого подписчика не переносится на
    /// нового подписчика с тем же идентификатором.
    #[tokio::test]
    async fn test_stale_heartbeat_does_not_hit_new_incarnation() {
        tokio::time::pause();

        let router = Router::new(RouterConfig::default());
        router.subscribe("u1", "news").unwrap();
        let monitor = LivenessMonitor::new(Duration::from_secs(10));
        monitor.touch(&router.subscriber("u1").unwrap());

        router.unsubscribe_all("u1").unwrap();
        tokio::time::advance(Duration::from_secs(9)).await;
        router.subscribe("u1", "news").unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(monitor.sweep(Instant::now()).is_empty());
        assert_eq!(monitor.tracked(), 0);
        assert!(router.subscriber("u1").is_some());

        // Новый экземпляр отслеживается с собственного heartbeat.
        let current = router.subscriber("u1").unwrap();
        monitor.touch(&current);
        tokio::time::advance(Duration::from_secs(11)).await;
        let stale = monitor.sweep(Instant::now());
        assert_eq!(stale.len(), 1);
        assert!(Arc::ptr_eq(&stale[0], &current));
    }

    /// Тест проверяет, что повторный touch под тем же идентификатором
    /// переключает запись на новый экземпляр.
    #[tokio::test]
    async fn test_touch_switches_to_new_incarnation() {
        tokio::time::pause();

        let registry = SubscriberRegistry::new(4);
        let first = registry.register("u1").unwrap();
        let monitor = LivenessMonitor::new(Duration::from_secs(5));
        monitor.touch(&first);

        registry.remove("u1").unwrap();
        let second = registry.register("u1").unwrap();
        monitor.touch(&second);
        drop(first);
        tokio::time::advance(Duration::from_secs(6)).await;

        let stale = monitor.sweep(Instant::now());
        assert_eq!(stale.len(), 1);
        assert!(Arc::ptr_eq(&stale[0], &second));
    }

    /// Тест проверяет, что фоновая задача вытесняет молчащего подписчика
    /// так же, как `unsubscribe_all`.
    #[tokio::test]
    async fn test_liveness_task_evicts_unresponsive() {
        tokio::time::pause();

        let router = Arc::new(Router::new(RouterConfig::default()));
        router.subscribe("quiet", "news").unwrap();
        router.subscribe("chatty", "news").unwrap();
        let quiet = router.subscriber("quiet").unwrap();
        let chatty = router.subscriber("chatty").unwrap();

        let monitor = Arc::new(LivenessMonitor::new(Duration::from_secs(8)));
        monitor.touch(&quiet);
        monitor.touch(&chatty);

        let shutdown = Arc::new(Notify::new());
        let handle = spawn_liveness_task(
            router.clone(),
            monitor.clone(),
            Duration::from_secs(5),
            shutdown.clone(),
        );

        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(router.subscriber_count(), 2);

        monitor.touch(&chatty);
        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(router.subscriber("quiet").is_none());
        assert!(router.subscriber("chatty").is_some());
        let members = router.subscribers("news").unwrap();
        assert!(!members.contains("quiet"));
        assert!(router.check_invariants());

        shutdown.notify_one();
        assert_eq!(handle.await.unwrap(), 1);
    }
}

//! Ядро маршрутизации сообщений и подписок.
//!
//! - `message`: сообщение, его адресация и проверка «получатель XOR канал».
//! - `mailbox`: ограниченная FIFO-очередь подписчика.
//! - `registry`: реестр живых подписчиков, единственный владелец их
//!   жизненного цикла.
//! - `topic_index`: двунаправленный индекс «канал ↔ подписчики».
//! - `sink`: передача сообщения в ящик (или внешнему потребителю).
//! - `report`: итог доставки одного сообщения.
//! - `router`: публичная поверхность, связывающая всё вместе.
//! - `liveness`: вытеснение неотвечающих подписчиков по таймауту.

pub mod liveness;
pub mod mailbox;
pub mod message;
pub mod registry;
pub mod report;
pub mod router;
pub mod sink;
pub mod topic_index;

pub use liveness::*;
pub use mailbox::*;
pub use message::*;
pub use registry::*;
pub use report::*;
pub use router::*;
pub use sink::*;
pub use topic_index::*;

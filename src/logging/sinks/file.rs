use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{
    config::{ConsoleConfig, LoggingConfig, Rotation},
    formatter,
};

/// Слой записи в файл через неблокирующий writer.
///
/// Guard нужно держать до завершения процесса: при его drop остаток буфера
/// сбрасывается на диск.
pub fn layer_with_config<S>(config: &LoggingConfig) -> (Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let (writer, guard) = tracing_appender::non_blocking(appender(config));
    let options = ConsoleConfig {
        enabled: true,
        format: config.file.format,
        with_ansi: false,
        with_target: true,
        with_thread_ids: true,
        with_line_numbers: true,
    };
    let layer = formatter::build_formatter(&options, config.file.format, writer);
    (layer, guard)
}

fn appender(config: &LoggingConfig) -> RollingFileAppender {
    let dir = &config.log_dir;
    let name = &config.file.filename;
    match config.file.rotation {
        Rotation::Hourly => rolling::hourly(dir, name),
        Rotation::Daily => rolling::daily(dir, name),
        Rotation::Never => rolling::never(dir, name),
    }
}

use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::Layer as LayerTrait,
    registry::LookupSpan,
};

use crate::logging::config::{ConsoleConfig, LogFormat};

/// Собирает fmt-слой нужного формата поверх произвольного writer-а.
///
/// Возвращаем boxed trait-объект, чтобы стереть конкретный тип формата
/// (json/pretty/compact).
pub fn build_formatter<S, W>(
    options: &ConsoleConfig,
    format: LogFormat,
    writer: W,
) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(options.with_ansi)
        .with_target(options.with_target)
        .with_thread_ids(options.with_thread_ids)
        .with_line_number(options.with_line_numbers);

    match format {
        LogFormat::Json => Box::new(layer.json().with_current_span(true)),
        LogFormat::Pretty => Box::new(layer.pretty().with_span_events(FmtSpan::CLOSE)),
        LogFormat::Compact => Box::new(layer.compact()),
    }
}

use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt::{self, format, FormatEvent, FormatFields},
    registry::LookupSpan,
};

/// Formats events as `monitor_util: LEVEL: message`.
///
/// With `with_target` the event's module is added after the level, which is
/// what debug output wants when a transport call misbehaves.
pub struct Formatter {
    with_target: bool,
}

impl Formatter {
    pub fn new(with_target: bool) -> Formatter {
        Formatter { with_target }
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warning",
        Level::ERROR => "error",
    }
}

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        write!(writer, "monitor_util: {}: ", level_name(metadata.level()))?;
        if self.with_target {
            write!(writer, "[{}] ", metadata.target())?;
        }

        ctx.format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

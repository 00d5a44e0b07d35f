use slog::{o, Discard, Drain, Logger};
use slog_async::Async;
use slog_term::{FullFormat, TermDecorator};

/// Configuration for setting up the audit logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    async_buffer_size: usize,
    use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            async_buffer_size: 1024,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.async_buffer_size = size;
        self
    }
}

/// Terminal logger used for the state-change audit trail.
pub fn setup_logger(config: LoggerConfig) -> Logger {
    let decorator = {
        let builder = TermDecorator::new().stderr();
        let builder = if config.use_color {
            builder.force_color()
        } else {
            builder.force_plain()
        };
        builder.build()
    };

    let drain = FullFormat::new(decorator).build().fuse();

    let drain = Async::new(drain)
        .chan_size(config.async_buffer_size)
        .build()
        .fuse();

    Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Logger that drops every record; used by tests and tooling.
pub fn discard_logger() -> Logger {
    Logger::root(Discard, o!())
}

/// Child logger tagged with the owning component.
pub fn component_logger(base: &Logger, component: &'static str) -> Logger {
    base.new(o!("component" => component))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Capture(Arc<Mutex<Vec<String>>>);

    impl Drain for Capture {
        type Ok = ();
        type Err = slog::Never;

        fn log(
            &self,
            record: &slog::Record<'_>,
            _values: &slog::OwnedKVList,
        ) -> Result<(), slog::Never> {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(record.msg().to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn component_logger_forwards_to_base_drain() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let base = Logger::root(Capture(lines.clone()), o!());
        let logger = component_logger(&base, "energy_zones");

        slog::info!(logger, "energy reserved"; "kwh" => 10);

        assert_eq!(lines.lock().unwrap().as_slice(), ["energy reserved"]);
    }
}

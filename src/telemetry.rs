use tracing::{info_span, Span, Subscriber};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// JSON logs on stderr, filtered by `RUST_LOG` (default `info`). Stdout is
/// left to the report.
pub fn init_tracing() {
    subscriber(std::io::stderr).init();
}

fn subscriber<W>(writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,nexus_dispatch=info".into()),
        )
        .with(fmt::layer().json().with_writer(writer))
}

/// Span wrapping one scenario task; every dispatch event inside it carries
/// the scenario name and horizon length.
pub fn scenario_span(name: &str, hours: usize) -> Span {
    info_span!("scenario", scenario = %name, hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn events_go_to_the_given_writer_as_json() {
        let captured = Captured::default();
        let sink = captured.clone();
        tracing::subscriber::with_default(subscriber(move || sink.clone()), || {
            let _guard = scenario_span("dust_storm", 168).entered();
            tracing::warn!(attempts = 2, "solver gave up");
        });

        let raw = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let line: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["fields"]["message"], "solver gave up");
        assert_eq!(line["span"]["name"], "scenario");
        assert_eq!(line["span"]["scenario"], "dust_storm");
        assert_eq!(line["span"]["hours"], 168);
    }
}

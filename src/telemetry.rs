use opentelemetry::trace::TraceId;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

#[cfg(feature = "telemetry")]
const SERVICE_NAME: &str = "multicluster-observability-addon";
#[cfg(feature = "telemetry")]
const OTLP_ENDPOINT_ENV: &str = "OPENTELEMETRY_ENDPOINT_URL";
const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Clone, Copy, Debug, PartialEq)]
enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// `json` selects structured logs, anything else the compact human format
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Trace id of the current span, if it is exported
pub fn get_trace_id() -> Option<TraceId> {
    use opentelemetry::trace::TraceContextExt as _;
    use tracing_opentelemetry::OpenTelemetrySpanExt as _;

    let trace_id = tracing::Span::current()
        .context()
        .span()
        .span_context()
        .trace_id();
    (trace_id != TraceId::INVALID).then_some(trace_id)
}

#[cfg(feature = "telemetry")]
fn tracer_provider() -> anyhow::Result<opentelemetry_sdk::trace::SdkTracerProvider> {
    use anyhow::Context as _;
    use opentelemetry_otlp::{SpanExporter, WithExportConfig};
    use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};

    let endpoint = std::env::var(OTLP_ENDPOINT_ENV)
        .with_context(|| format!("{OTLP_ENDPOINT_ENV} must point at an OTLP collector"))?;
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("building the OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .build())
}

/// Install the global subscriber: `RUST_LOG` filtering (default `info`), compact or json logs
/// per `LOG_FORMAT`, and span export when built with the `telemetry` feature
pub fn init() -> anyhow::Result<()> {
    let fmt = tracing_subscriber::fmt::layer();
    let fmt = match LogFormat::from_env_value(std::env::var(LOG_FORMAT_ENV).ok().as_deref()) {
        LogFormat::Json => fmt.json().boxed(),
        LogFormat::Compact => fmt.compact().boxed(),
    };
    let env_filter = EnvFilter::try_from_default_env().or(EnvFilter::try_new("info"))?;

    #[cfg(feature = "telemetry")]
    let spans = {
        use opentelemetry::trace::TracerProvider as _;
        let provider = tracer_provider()?;
        let tracer = provider.tracer(SERVICE_NAME);
        // the global provider keeps the exporter alive
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    };
    #[cfg(not(feature = "telemetry"))]
    let spans: Option<tracing_subscriber::layer::Identity> = None;

    tracing::subscriber::set_global_default(
        Registry::default().with(fmt).with(spans).with(env_filter),
    )?;
    Ok(())
}

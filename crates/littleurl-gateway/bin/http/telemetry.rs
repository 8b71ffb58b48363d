use crate::cli::LogFormatArg;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,tower_http=info";

pub fn init(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormatArg::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormatArg::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

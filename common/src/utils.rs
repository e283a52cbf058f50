// common/src/utils.rs
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Tracing level named by `value`, falling back to `INFO`
pub fn parse_level(value: &str) -> Level {
    value.trim().parse::<Level>().unwrap_or(Level::INFO)
}

/// Setup tracing for the service at the configured `log_level`
pub fn setup_tracing(log_level: &str) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(log_level))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

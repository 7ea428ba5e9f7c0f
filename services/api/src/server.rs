use crate::cli::ServeArgs;
use crate::infra::{
    load_records, AppState, InMemoryPipelineRepository, LoggingAlertPublisher, LoggingNavigation,
};
use crate::routes::with_board_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use placement_board::config::AppConfig;
use placement_board::error::AppError;
use placement_board::telemetry;
use placement_board::workflows::pipeline::PipelineBoardService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(seed) = args.seed.take() {
        config.board.seed_path = Some(seed);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let records = load_records(config.board.seed_path.as_deref())?;
    let repository = Arc::new(InMemoryPipelineRepository::with_records(records));
    let alerts = Arc::new(LoggingAlertPublisher::default());
    let board_service = Arc::new(
        PipelineBoardService::from_config(repository, alerts, &config.board)
            .with_navigation(Arc::new(LoggingNavigation)),
    );
    let summary = board_service.refresh().await?;

    let app = with_board_routes(board_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cards = summary.loaded,
        "placement board ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

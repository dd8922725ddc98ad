#[cfg(test)]
mod observability_tests {
    use crate::server::{
        routes,
        tests::{png_bytes, upload, FixedLogit},
        types::AppState,
    };
    use crate::telemetry::{init_tracing, DEFAULT_LOG_FILTER};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use metrics::{counter, histogram};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Arc;
    use tower::ServiceExt;
    use tracing::info;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn test_prometheus_metrics_collection() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            counter!("boneguard_predictions_total", "prediction" => "CANCER").increment(2);
            histogram!("boneguard_inference_duration_seconds").record(0.25);
        });

        let output = handle.render();
        assert!(output.contains("boneguard_predictions_total{prediction=\"CANCER\"} 2"));
        assert!(output.contains("boneguard_inference_duration_seconds"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            counter!("boneguard_prediction_errors_total").increment(1);
        });

        let state = AppState {
            classifier: Arc::new(FixedLogit(0.0)),
            metrics: handle,
        };
        let app = routes::create_router(state, None);

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("boneguard_prediction_errors_total 1"));
    }

    #[test]
    fn test_predict_records_outcome_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = AppState {
            classifier: Arc::new(FixedLogit(2.0)),
            metrics: recorder.handle(),
        };
        let app = routes::create_router(state, None);

        // Counters are recorded on the request task, so keep everything on
        // this thread where the local recorder is active.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let text = metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let served = app
                    .clone()
                    .oneshot(upload(&png_bytes(16, 16)))
                    .await
                    .unwrap();
                assert_eq!(served.status(), StatusCode::OK);

                let failed = app
                    .clone()
                    .oneshot(upload(b"not an image"))
                    .await
                    .unwrap();
                assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

                let response = app
                    .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
                    .await
                    .unwrap();
                let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
                String::from_utf8(bytes.to_vec()).unwrap()
            })
        });

        assert!(text.contains("boneguard_predictions_total{prediction=\"CANCER\"} 1"));
        assert!(text.contains("boneguard_prediction_errors_total 1"));
        assert!(text.contains("boneguard_inference_duration_seconds"));
        assert!(!text.contains("prediction=\"NORMAL\""));
    }

    #[test]
    fn test_default_log_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_tracing_setup_is_idempotent() {
        // Installing twice must not panic.
        init_tracing();
        init_tracing();
        info!("Tracing initialized successfully for test");
    }
}

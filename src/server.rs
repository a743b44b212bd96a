use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use log::info;
use prometheus::{Encoder, TextEncoder};

use crate::metrics::MetricSchema;

// ------------------------------------------------------------
// Exposition endpoint
// ------------------------------------------------------------
//
// One route, GET /metrics, rendering the registry in the standard
// text exposition format. Started once at process startup and kept
// alive across supervisory reconnects, so the last-written values
// stay scrapeable even while the collection side rebuilds.
//

pub async fn serve(metrics: Arc<MetricSchema>, port: u16) -> anyhow::Result<()> {
    let app = Router::new().route("/metrics", get(render)).with_state(metrics);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("serving metrics on port {port}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn render(State(metrics): State<Arc<MetricSchema>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    match encoder.encode(&metrics.gather(), &mut body) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {e}"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_renders_written_series_as_text() {
        let metrics = MetricSchema::new().unwrap();
        metrics
            .total_played_duration
            .with_label_values(&["plex", "alice"])
            .set(15);

        let mut body = Vec::new();
        TextEncoder::new().encode(&metrics.gather(), &mut body).unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("total_played_duration"));
        assert!(text.contains("user=\"alice\""));
    }
}

use std::collections::HashMap;
use std::fmt::Write as _;

use axum::{
    extract::{Query, State},
    response::Html,
};
use tracing::info;

use crate::errors::JsonApiError;
use crate::metrics;
use crate::state::AppState;

/// Operator landing page. `?reloaddata=true` reseeds from the demo file first.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Html<String>, JsonApiError> {
    metrics::observe("index");
    let reload = params
        .get("reloaddata")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    if reload {
        let loaded = state.storage.reload_data(&state.demo_data_file).await?;
        metrics::RELOADS_TOTAL.inc();
        info!(loaded, path = %state.demo_data_file.display(), "demo data reloaded on request");
    }

    let reloads = state.storage.count_reloads().await?;
    let count = state.storage.count().await?;
    Ok(Html(render(&state, reloads, count)))
}

fn render(state: &AppState, reloads: u64, count: u64) -> String {
    let route = &state.schema.route;
    let mut page = String::new();
    let _ = write!(
        page,
        "<html><head><title>Record API</title></head><body>\
         <h1>Record API</h1>\
         <p>Backend: {} at {}</p>\
         <p>Data reloaded {} times, {} records stored</p>",
        state.storage.backend_name(),
        state.storage.describe(),
        reloads,
        count,
    );

    page.push_str("<h2>Routes</h2><ul>");
    for (method, path) in [
        ("GET", format!("/{route}")),
        ("POST", format!("/{route}")),
        ("GET", format!("/{route}/&lt;id&gt;")),
        ("PUT", format!("/{route}/&lt;id&gt;")),
        ("PATCH", format!("/{route}/&lt;id&gt;")),
        ("DELETE", format!("/{route}/&lt;id&gt;")),
        ("GET", "/?reloaddata=true".to_string()),
    ] {
        let _ = write!(page, "<li>{method} {path}</li>");
    }
    page.push_str("</ul>");

    page.push_str("<h2>Fields</h2><ul>");
    for field in state.schema.fields() {
        let ty = state.storage.field_types().get(field);
        let marker = if state.schema.is_required(field) { " (required)" } else { "" };
        let _ = write!(page, "<li>{field}: {ty}{marker}</li>");
    }
    page.push_str("</ul></body></html>");
    page
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use configs::ApiConfig;
    use models::FieldTypes;
    use service::storage::MockStorage;

    use super::*;

    #[test]
    fn lists_fields_with_types() {
        let api = ApiConfig::default();
        let state = AppState::new(Arc::new(MockStorage::new(FieldTypes::from_config(&api))), &api);
        let html = render(&state, 2, 5);
        assert!(html.contains("Data reloaded 2 times, 5 records stored"));
        assert!(html.contains("<li>title: STRING (required)</li>"));
        assert!(html.contains("<li>year: INT</li>"));
        assert!(html.contains("<li>released: DATE</li>"));
        assert!(html.contains("DELETE /albums/&lt;id&gt;"));
    }
}

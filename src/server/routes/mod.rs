pub mod figures;
pub mod meta;
pub mod sessions;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::chart_spec::ChartSpec;
use crate::figures::Figure;
use crate::server::error::AppError;
use crate::server::state::AppState;

/// Run a recompute on the blocking pool; aggregations are CPU bound.
async fn blocking<T, F>(state: Arc<AppState>, f: F) -> Result<T, AppError>
where
    F: FnOnce(&AppState) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state)).await?
}

/// Rendered figures keyed by figure name.
fn by_name(figures: Vec<(Figure, ChartSpec)>) -> BTreeMap<&'static str, ChartSpec> {
    figures
        .into_iter()
        .map(|(figure, spec)| (figure.as_str(), spec))
        .collect()
}

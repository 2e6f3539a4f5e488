use std::sync::Arc;

use tracing::warn;

use super::{Route, RouteProvider, RouteResult};
use crate::spatial::Coordinate;

/// Total front door to a [`RouteProvider`].
///
/// Never fails: any provider error is logged and replaced by the two-point
/// straight line `[from, to]`, so callers must accept degenerate routes.
#[derive(Clone)]
pub struct RoutingGateway {
    provider: Arc<dyn RouteProvider>,
}

impl RoutingGateway {
    pub fn new(provider: Arc<dyn RouteProvider>) -> Self {
        Self { provider }
    }

    pub fn from_boxed(provider: Box<dyn RouteProvider>) -> Self {
        Self {
            provider: Arc::from(provider),
        }
    }

    /// Route geometry from `from` to `to`.
    pub async fn fetch_route(&self, from: Coordinate, to: Coordinate) -> Route {
        self.fetch_route_with_info(from, to).await.route
    }

    /// Route geometry plus the provider's distance/duration summary.
    /// The fallback carries no summary.
    pub async fn fetch_route_with_info(&self, from: Coordinate, to: Coordinate) -> RouteResult {
        match self.provider.route(from, to).await {
            Ok(result) if result.route.len() >= 2 => result,
            Ok(result) => {
                warn!(
                    points = result.route.len(),
                    "degenerate route from provider, using straight line"
                );
                RouteResult::straight_line(from, to)
            }
            Err(err) => {
                warn!(error = %err, "route fetch failed, using straight line");
                RouteResult::straight_line(from, to)
            }
        }
    }
}

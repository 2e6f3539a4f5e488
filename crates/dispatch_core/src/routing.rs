//! Pluggable route providers and the total routing gateway.
//!
//! Implementations, selectable via [`RouteProviderKind`]:
//!
//! - **`StraightLineRouteProvider`**: two-point route with a haversine
//!   distance and a duration estimated at a fixed average speed. No network.
//! - **`OrsRouteProvider`** (feature `ors`): OpenRouteService directions API.
//!
//! Network providers are wrapped in a [`CachedRouteProvider`]. Callers never
//! talk to a provider directly; they go through [`RoutingGateway`], which
//! turns every provider failure into the straight-line fallback.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::spatial::{haversine_distance_meters, haversine_distance_miles, Coordinate};

mod gateway;
#[cfg(feature = "ors")]
pub mod ors;

pub use gateway::RoutingGateway;

/// Ordered travel path. Insertion order is travel order.
pub type Route = Vec<Coordinate>;

/// Summary of a routed leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// Route geometry plus the provider's summary, when it sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub route: Route,
    pub info: Option<RouteInfo>,
}

impl RouteResult {
    /// Two-point fallback with no summary.
    pub fn straight_line(from: Coordinate, to: Coordinate) -> Self {
        Self {
            route: vec![from, to],
            info: None,
        }
    }
}

/// Routing backend. Implementations must be `Send + Sync` so one provider
/// can serve concurrent rides.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Route from `from` to `to`, in that order.
    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, RoutingError>;
}

/// Which routing backend to use.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteProviderKind {
    #[default]
    StraightLine,
    /// OpenRouteService endpoint, e.g. `https://api.openrouteservice.org`.
    #[cfg(feature = "ors")]
    Ors { endpoint: String, api_key: String },
}

// ---------------------------------------------------------------------------
// Straight-line provider (always available)
// ---------------------------------------------------------------------------

/// Direct line between the two points, timed at a constant speed.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineRouteProvider {
    avg_speed_mph: f64,
}

impl StraightLineRouteProvider {
    pub fn new(avg_speed_mph: f64) -> Self {
        Self {
            avg_speed_mph: avg_speed_mph.max(1.0),
        }
    }
}

#[async_trait]
impl RouteProvider for StraightLineRouteProvider {
    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, RoutingError> {
        let miles = haversine_distance_miles(from, to);
        Ok(RouteResult {
            route: vec![from, to],
            info: Some(RouteInfo {
                distance_meters: haversine_distance_meters(from, to),
                duration_seconds: miles / self.avg_speed_mph * 3600.0,
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

/// Default route cache capacity for network providers.
pub const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 1_024;

/// Coordinates quantised to the 1e-5 degree precision of encoded polylines.
type RouteKey = (i64, i64, i64, i64);

fn route_key(from: Coordinate, to: Coordinate) -> RouteKey {
    let q = |v: f64| (v * 1e5).round() as i64;
    (q(from.lat), q(from.lng), q(to.lat), q(to.lng))
}

/// LRU-cached wrapper around any [`RouteProvider`].
///
/// The key is directional. Failures are not cached.
pub struct CachedRouteProvider {
    inner: Box<dyn RouteProvider>,
    cache: Mutex<LruCache<RouteKey, RouteResult>>,
}

impl CachedRouteProvider {
    pub fn new(inner: Box<dyn RouteProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RouteProvider for CachedRouteProvider {
    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, RoutingError> {
        let key = route_key(from, to);

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return Ok(cached.clone());
            }
        }

        let result = self.inner.route(from, to).await?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, result.clone());
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Construct a boxed [`RouteProvider`] from a [`RouteProviderKind`].
///
/// Network providers come wrapped in a [`CachedRouteProvider`].
pub fn build_route_provider(
    kind: &RouteProviderKind,
    avg_speed_mph: f64,
) -> Result<Box<dyn RouteProvider>, RoutingError> {
    match kind {
        RouteProviderKind::StraightLine => {
            Ok(Box::new(StraightLineRouteProvider::new(avg_speed_mph)))
        }

        #[cfg(feature = "ors")]
        RouteProviderKind::Ors { endpoint, api_key } => {
            let inner = Box::new(ors::OrsRouteProvider::new(endpoint, api_key)?);
            Ok(Box::new(CachedRouteProvider::new(
                inner,
                DEFAULT_ROUTE_CACHE_CAPACITY,
            )))
        }
    }
}

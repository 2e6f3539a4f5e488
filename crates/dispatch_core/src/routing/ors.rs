//! OpenRouteService directions client.
//!
//! Sends the two waypoints as `[lng, lat]` pairs and reads the first route's
//! encoded polyline geometry and `{distance, duration}` summary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RouteInfo, RouteProvider, RouteResult};
use crate::error::RoutingError;
use crate::polyline::decode_polyline;
use crate::spatial::Coordinate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DIRECTIONS_PATH: &str = "/v2/directions/driving-car";

/// Public OpenRouteService endpoint.
pub const DEFAULT_ORS_ENDPOINT: &str = "https://api.openrouteservice.org";

/// Routes via the OpenRouteService directions API.
#[derive(Debug, Clone)]
pub struct OrsRouteProvider {
    client: Client,
    url: String,
    api_key: String,
}

impl OrsRouteProvider {
    /// Create a provider for `endpoint` (e.g. `https://api.openrouteservice.org`).
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: format!("{}{}", endpoint.trim_end_matches('/'), DIRECTIONS_PATH),
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Serialize)]
struct DirectionsRequest {
    coordinates: [[f64; 2]; 2],
}

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
struct DirectionsRoute {
    geometry: Option<String>,
    summary: Option<DirectionsSummary>,
}

// ORS omits zero-valued summary fields.
#[derive(Deserialize)]
struct DirectionsSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[async_trait]
impl RouteProvider for OrsRouteProvider {
    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, RoutingError> {
        let body = DirectionsRequest {
            coordinates: [[from.lng, from.lat], [to.lng, to.lat]],
        };

        let response = self
            .client
            .post(&self.url)
            .header(header::AUTHORIZATION, &self.api_key)
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let result = parse_directions_response(&text)?;
        debug!(
            points = result.route.len(),
            distance_m = ?result.info.map(|i| i.distance_meters),
            "ORS route received"
        );
        Ok(result)
    }
}

/// Parse an ORS directions body into a route.
pub(crate) fn parse_directions_response(body: &str) -> Result<RouteResult, RoutingError> {
    let parsed: DirectionsResponse =
        serde_json::from_str(body).map_err(|err| RoutingError::Json(err.to_string()))?;

    let first = parsed.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;
    let geometry = first.geometry.ok_or(RoutingError::NoRoute)?;
    let route = decode_polyline(&geometry)?;
    if route.len() < 2 {
        return Err(RoutingError::NoRoute);
    }

    Ok(RouteResult {
        route,
        info: first.summary.map(|summary| RouteInfo {
            distance_meters: summary.distance,
            duration_seconds: summary.duration,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolylineError;

    #[test]
    fn parses_geometry_and_summary() {
        let body = r#"{
            "routes": [{
                "summary": {"distance": 1834.2, "duration": 262.9},
                "geometry": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"
            }]
        }"#;
        let result = parse_directions_response(body).expect("parse");
        assert_eq!(result.route.len(), 3);
        assert_eq!(
            result.info,
            Some(RouteInfo {
                distance_meters: 1834.2,
                duration_seconds: 262.9
            })
        );
    }

    #[test]
    fn missing_summary_fields_default_to_zero() {
        let body = r#"{"routes": [{"summary": {}, "geometry": "_p~iF~ps|U_ulLnnqC"}]}"#;
        let info = parse_directions_response(body)
            .expect("parse")
            .info
            .expect("info");
        assert_eq!(info.distance_meters, 0.0);
        assert_eq!(info.duration_seconds, 0.0);
    }

    #[test]
    fn empty_routes_is_no_route() {
        assert!(matches!(
            parse_directions_response(r#"{"routes": []}"#),
            Err(RoutingError::NoRoute)
        ));
        assert!(matches!(
            parse_directions_response(r#"{"error": {"code": 2010}}"#),
            Err(RoutingError::NoRoute)
        ));
    }

    #[test]
    fn single_point_geometry_is_no_route() {
        assert!(matches!(
            parse_directions_response(r#"{"routes": [{"geometry": "_p~iF~ps|U"}]}"#),
            Err(RoutingError::NoRoute)
        ));
    }

    #[test]
    fn malformed_body_is_json_error() {
        assert!(matches!(
            parse_directions_response("<html>bad gateway</html>"),
            Err(RoutingError::Json(_))
        ));
    }

    #[test]
    fn bad_geometry_is_polyline_error() {
        assert!(matches!(
            parse_directions_response(r#"{"routes": [{"geometry": "_p~iF"}]}"#),
            Err(RoutingError::Polyline(PolylineError::Truncated { .. }))
        ));
    }
}

//! Client for the external routing provider.
//!
//! One HTTP round-trip per query, no internal retries; the escalation loop
//! owns retry policy. Transport and decoding failures are classified here so
//! raw reqwest/serde errors never reach the resolver.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::avoidance::AvoidanceSpec;
use crate::config::ProviderConfig;
use crate::geo::Coordinate;
use crate::polyline;

/// Notice code the provider attaches when a returned route still crosses a
/// road it was asked to avoid.
pub const BLOCKED_ROAD_CODE: &str = "violatedBlockedRoad";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("routing provider unreachable: {0}")]
    Unreachable(String),
    #[error("routing provider returned an unusable response: {0}")]
    BadResponse(String),
    #[error("routing provider rate limit hit")]
    RateLimited,
}

/// Advisory attached to a route section. All fields are optional on the
/// wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notice {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub title: String,
}

impl Notice {
    pub fn is_blocked_road(&self) -> bool {
        self.code == BLOCKED_ROAD_CODE
    }
}

/// One route as returned by the provider: decoded geometry plus the summary
/// figures the resolver judges it by.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    /// Ordered path, (lat, lng).
    pub geometry: Vec<Coordinate>,
    pub duration_secs: f64,
    pub length_m: f64,
    pub notices: Vec<Notice>,
}

impl RouteCandidate {
    pub fn has_blocked_road(&self) -> bool {
        self.notices.iter().any(Notice::is_blocked_road)
    }
}

/// The single operation the resolver needs from a routing vendor.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn query(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        avoidance: Option<&AvoidanceSpec>,
    ) -> Result<RouteCandidate, ProviderError>;
}

#[async_trait]
impl<T: RouteProvider + ?Sized> RouteProvider for Arc<T> {
    async fn query(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        avoidance: Option<&AvoidanceSpec>,
    ) -> Result<RouteCandidate, ProviderError> {
        (**self).query(origin, destination, avoidance).await
    }
}

// --- Wire DTOs ---
// Deserialized defensively: anything the provider may omit is defaulted.

#[derive(Debug, Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    sections: Vec<Section>,
}

#[derive(Debug, Deserialize)]
struct Section {
    polyline: Option<String>,
    summary: Option<Summary>,
    #[serde(default)]
    notices: Vec<Notice>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    length: f64,
}

/// HTTP client for a HERE-v8-shaped routing endpoint.
pub struct HttpRouteProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpRouteProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// First section of the first route; alternatives are never aggregated.
    fn first_candidate(body: RoutesResponse) -> Result<RouteCandidate, ProviderError> {
        let section = body
            .routes
            .into_iter()
            .next()
            .and_then(|route| route.sections.into_iter().next())
            .ok_or_else(|| ProviderError::BadResponse("no routes in response".into()))?;
        let encoded = section
            .polyline
            .ok_or_else(|| ProviderError::BadResponse("route section without polyline".into()))?;
        let geometry = polyline::decode(&encoded)
            .map_err(|err| ProviderError::BadResponse(format!("undecodable polyline: {err}")))?;
        let summary = section
            .summary
            .ok_or_else(|| ProviderError::BadResponse("route section without summary".into()))?;
        Ok(RouteCandidate {
            geometry,
            duration_secs: summary.duration,
            length_m: summary.length,
            notices: section.notices,
        })
    }
}

#[async_trait]
impl RouteProvider for HttpRouteProvider {
    async fn query(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        avoidance: Option<&AvoidanceSpec>,
    ) -> Result<RouteCandidate, ProviderError> {
        // Wire order asymmetry is the provider's: origin/destination are
        // "lat,lng" strings while avoidance boxes are lng-first.
        let mut params = vec![
            ("apiKey", self.config.api_key.clone()),
            ("transportMode", "pedestrian".to_owned()),
            ("origin", format!("{},{}", origin.lat, origin.lng)),
            (
                "destination",
                format!("{},{}", destination.lat, destination.lng),
            ),
            ("return", "polyline,summary".to_owned()),
        ];
        if let Some(spec) = avoidance {
            params.push(("avoidAreas", spec.to_query_value()));
        }

        let url = format!("{}/routes", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|err| ProviderError::Unreachable(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::BadResponse(format!("status {status}")));
        }

        let body: RoutesResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::BadResponse(err.to_string()))?;
        Self::first_candidate(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<RouteCandidate, ProviderError> {
        HttpRouteProvider::first_candidate(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn takes_the_first_section_of_the_first_route() {
        let candidate = parse(json!({
            "routes": [
                {"sections": [
                    {"polyline": "_p~iF~ps|U", "summary": {"duration": 650.0, "length": 820.0}},
                    {"polyline": "_mqNvxq`@", "summary": {"duration": 1.0, "length": 1.0}}
                ]},
                {"sections": []}
            ]
        }))
        .unwrap();
        assert_eq!(candidate.duration_secs, 650.0);
        assert_eq!(candidate.geometry.len(), 1);
        assert_eq!(candidate.geometry[0].lat, 38.5);
        assert_eq!(candidate.geometry[0].lng, -120.2);
        assert!(candidate.notices.is_empty());
    }

    #[test]
    fn missing_notices_deserialize_as_empty() {
        let candidate = parse(json!({
            "routes": [{"sections": [
                {"polyline": "_p~iF~ps|U", "summary": {"duration": 10.0, "length": 5.0}}
            ]}]
        }))
        .unwrap();
        assert!(!candidate.has_blocked_road());
    }

    #[test]
    fn recognizes_the_blocked_road_notice() {
        let candidate = parse(json!({
            "routes": [{"sections": [{
                "polyline": "_p~iF~ps|U",
                "summary": {"duration": 10.0, "length": 5.0},
                "notices": [
                    {"code": "mlDurationInSummary", "severity": "info"},
                    {"code": "violatedBlockedRoad", "severity": "critical", "title": "Route violates blocked road"}
                ]
            }]}]
        }))
        .unwrap();
        assert!(candidate.has_blocked_road());
    }

    #[test]
    fn empty_route_list_is_a_bad_response() {
        assert!(matches!(
            parse(json!({"routes": []})),
            Err(ProviderError::BadResponse(_))
        ));
        assert!(matches!(
            parse(json!({})),
            Err(ProviderError::BadResponse(_))
        ));
    }

    #[test]
    fn section_without_polyline_is_a_bad_response() {
        assert!(matches!(
            parse(json!({
                "routes": [{"sections": [{"summary": {"duration": 10.0, "length": 5.0}}]}]
            })),
            Err(ProviderError::BadResponse(_))
        ));
    }

    #[test]
    fn garbage_polyline_is_a_bad_response() {
        assert!(matches!(
            parse(json!({
                "routes": [{"sections": [
                    {"polyline": "!!", "summary": {"duration": 10.0, "length": 5.0}}
                ]}]
            })),
            Err(ProviderError::BadResponse(_))
        ));
    }
}

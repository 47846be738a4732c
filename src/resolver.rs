//! The route escalation loop.
//!
//! One resolution is a bounded negotiation with the routing provider: fetch
//! an unconstrained baseline to fix the time budget, then ask for routes
//! that avoid the reported risks, weakening the avoidance constraint (by
//! raising the risk floor) until a candidate is free of blocked-road
//! advisories and within budget. Weakening trades hazard avoidance for
//! route availability; over-constraining pedestrian routing makes routes
//! infeasible or absurdly long, so the loop searches for the weakest
//! constraint that still yields an acceptable route.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::avoidance::AvoidanceSpec;
use crate::config::ResolverConfig;
use crate::geo::{Coordinate, RiskPoint};
use crate::provider::{ProviderError, RouteCandidate, RouteProvider};
use crate::repository::RiskRepository;

#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The unconstrained baseline could not be fetched, so there is no time
    /// budget to judge candidates against.
    #[error("baseline route unavailable: {0}")]
    BaselineUnavailable(#[source] ProviderError),
    /// Every avoidance attempt failed.
    #[error("no route found between the requested points")]
    NoRouteFound,
}

/// What a resolution hands to the rendering client: the chosen path and
/// every known risk point, whether or not it was actively avoided.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub path: Vec<Coordinate>,
    pub risks: Vec<RiskPoint>,
}

pub struct RouteResolver<P, R> {
    provider: P,
    repository: R,
    config: ResolverConfig,
}

impl<P: RouteProvider, R: RiskRepository> RouteResolver<P, R> {
    pub fn new(provider: P, repository: R, config: ResolverConfig) -> Self {
        Self {
            provider,
            repository,
            config,
        }
    }

    /// Resolves a pedestrian route from `origin` to `destination` that
    /// avoids known risk points where feasible.
    ///
    /// The final allowed attempt is accepted unconditionally, violations and
    /// all: the caller always gets some route once the provider can produce
    /// one.
    pub async fn resolve(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Resolution, ResolutionError> {
        // One snapshot per resolution; concurrent reporters are not observed
        // mid-loop. A failed read degrades to "no risks known".
        let risks = match self.repository.read_all().await {
            Ok(risks) => risks,
            Err(err) => {
                warn!(%err, "risk store read failed, resolving without risk data");
                Vec::new()
            }
        };

        // The unconstrained route fixes the time budget. Its geometry is
        // never returned; even with no risks, the loop below issues the
        // query whose result the caller gets.
        let baseline = self
            .provider
            .query(origin, destination, None)
            .await
            .map_err(ResolutionError::BaselineUnavailable)?;
        let budget = baseline.duration_secs * self.config.time_tolerance;
        debug!(
            min_time = baseline.duration_secs,
            budget, "baseline established"
        );

        let mut last_fetched: Option<RouteCandidate> = None;
        for attempt in 0..self.config.max_attempts {
            let floor = self.config.floor_start + f64::from(attempt) * self.config.floor_step;
            let avoidance = AvoidanceSpec::build(&risks, floor, self.config.margin_deg);
            let area_count = avoidance.as_ref().map_or(0, AvoidanceSpec::len);
            let final_attempt = attempt + 1 == self.config.max_attempts;

            let candidate = match self.provider.query(origin, destination, avoidance.as_ref()).await
            {
                Ok(candidate) => candidate,
                Err(err) => {
                    // Not accepted for this attempt only; the next floor may
                    // still succeed.
                    warn!(attempt, floor, %err, "avoidance query failed");
                    continue;
                }
            };

            let violated = candidate.has_blocked_road();
            let over_budget = candidate.duration_secs > budget;
            debug!(
                attempt,
                floor,
                area_count,
                duration = candidate.duration_secs,
                violated,
                over_budget,
                "candidate evaluated"
            );

            if violated || over_budget {
                if !final_attempt {
                    last_fetched = Some(candidate);
                    continue;
                }
                info!(
                    attempt,
                    violated, over_budget, "accepting final attempt best-effort"
                );
            } else {
                info!(
                    attempt,
                    floor,
                    duration = candidate.duration_secs,
                    "route accepted"
                );
            }
            return Ok(Resolution {
                path: candidate.geometry,
                risks,
            });
        }

        // The final attempt's query failed. Best effort still applies: fall
        // back to the most recent candidate actually received.
        match last_fetched {
            Some(candidate) => {
                info!("final attempt failed, returning last fetched candidate");
                Ok(Resolution {
                    path: candidate.geometry,
                    risks,
                })
            }
            None => Err(ResolutionError::NoRouteFound),
        }
    }
}

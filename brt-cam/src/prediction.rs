//! Arrival prediction
//!
//! Two strategies, chosen in configuration:
//! - **Fixed**: the registry's nominal minutes for the line (default for
//!   unknown lines).
//! - **Route**: total route distance over a constant speed, always rounded
//!   up to the next whole minute, never zero.
//!
//! The route strategy sums the shared corridor topology for every line
//! unless a per-line route is configured. The shared sum does not depend on
//! where the bus was seen; per-line routes exist to model the remaining
//! distance properly.

use brt_common::config::{PredictionConfig, PredictionStrategyKind, RouteSegment};
use brt_common::{time, LineRegistry, Prediction};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Distance-based estimator
#[derive(Debug, Clone)]
pub struct RouteEstimator {
    speed_km_per_min: f64,
    shared: Vec<RouteSegment>,
    per_line: HashMap<String, Vec<RouteSegment>>,
}

impl RouteEstimator {
    pub fn new(
        speed_km_per_min: f64,
        shared: Vec<RouteSegment>,
        per_line: HashMap<String, Vec<RouteSegment>>,
    ) -> Self {
        Self {
            speed_km_per_min,
            shared,
            per_line,
        }
    }

    /// Route used for `line_id`
    pub fn route_for(&self, line_id: &str) -> &[RouteSegment] {
        self.per_line
            .get(line_id)
            .map(Vec::as_slice)
            .unwrap_or(&self.shared)
    }

    pub fn distance_km(&self, line_id: &str) -> f64 {
        self.route_for(line_id).iter().map(|s| s.distance_km).sum()
    }

    pub fn eta_minutes(&self, line_id: &str) -> u32 {
        minutes_for_distance(self.distance_km(line_id), self.speed_km_per_min)
    }
}

/// Whole minutes to cover `distance_km` at `speed_km_per_min`
///
/// Rounds by dropping the fraction and adding one, so the result is at least
/// 1 and an exact whole number also moves up by one.
pub fn minutes_for_distance(distance_km: f64, speed_km_per_min: f64) -> u32 {
    let raw = distance_km / speed_km_per_min;
    if !raw.is_finite() || raw <= 0.0 {
        return 1;
    }
    let whole = raw.floor().min(f64::from(u32::MAX - 1));
    whole as u32 + 1
}

#[derive(Debug, Clone)]
pub enum PredictionStrategy {
    Fixed,
    Route(RouteEstimator),
}

/// Prediction engine: pure apart from reading the clock in [`Predictor::predict`]
#[derive(Debug, Clone)]
pub struct Predictor {
    registry: Arc<LineRegistry>,
    strategy: PredictionStrategy,
}

impl Predictor {
    pub fn new(registry: Arc<LineRegistry>, strategy: PredictionStrategy) -> Self {
        Self { registry, strategy }
    }

    pub fn fixed(registry: Arc<LineRegistry>) -> Self {
        Self::new(registry, PredictionStrategy::Fixed)
    }

    pub fn from_config(config: &PredictionConfig, registry: Arc<LineRegistry>) -> Self {
        let strategy = match config.strategy {
            PredictionStrategyKind::Fixed => PredictionStrategy::Fixed,
            PredictionStrategyKind::Route => PredictionStrategy::Route(RouteEstimator::new(
                config.speed_km_per_min,
                config.segments.clone(),
                config.routes.clone(),
            )),
        };
        Self::new(registry, strategy)
    }

    pub fn strategy_name(&self) -> &'static str {
        match self.strategy {
            PredictionStrategy::Fixed => PredictionStrategyKind::Fixed.as_str(),
            PredictionStrategy::Route(_) => PredictionStrategyKind::Route.as_str(),
        }
    }

    pub fn eta_minutes(&self, line_id: &str) -> u32 {
        match &self.strategy {
            PredictionStrategy::Fixed => self.registry.nominal_minutes(line_id),
            PredictionStrategy::Route(route) => route.eta_minutes(line_id),
        }
    }

    /// Prediction as seen at `now`
    pub fn predict_at(&self, line_id: &str, now: DateTime<Utc>) -> Prediction {
        Prediction::starting_at(line_id, self.eta_minutes(line_id), now)
    }

    pub fn predict(&self, line_id: &str) -> Prediction {
        self.predict_at(line_id, time::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brt_common::config::{default_route_segments, DEFAULT_SPEED_KM_PER_MIN};
    use chrono::TimeZone;

    fn registry() -> Arc<LineRegistry> {
        Arc::new(LineRegistry::builtin())
    }

    fn route_predictor(per_line: HashMap<String, Vec<RouteSegment>>) -> Predictor {
        Predictor::new(
            registry(),
            PredictionStrategy::Route(RouteEstimator::new(
                DEFAULT_SPEED_KM_PER_MIN,
                default_route_segments(),
                per_line,
            )),
        )
    }

    #[test]
    fn test_fixed_uses_registry_minutes() {
        let p = Predictor::fixed(registry());
        assert_eq!(p.eta_minutes("301"), 3);
        assert_eq!(p.eta_minutes("2450"), 7);
        assert_eq!(p.strategy_name(), "fixed");
    }

    #[test]
    fn test_fixed_unknown_line_uses_default() {
        assert_eq!(Predictor::fixed(registry()).eta_minutes("999"), 6);
    }

    #[test]
    fn test_arrival_is_exactly_eta_after_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let prediction = Predictor::fixed(registry()).predict_at("437", now);
        assert_eq!(prediction.eta_minutes, 5);
        assert_eq!(prediction.arrival_at - now, chrono::Duration::minutes(5));
        assert_eq!(prediction.line_id, "437");
    }

    #[test]
    fn test_predict_reads_the_clock() {
        let p = Predictor::fixed(registry());
        let before = time::now();
        let prediction = p.predict("2444");
        let after = time::now();

        assert_eq!(prediction.eta_minutes, 4);
        let eta = chrono::Duration::minutes(4);
        assert!(prediction.arrival_at >= before + eta);
        assert!(prediction.arrival_at <= after + eta);
        assert!(prediction.arrival_at - before <= eta + chrono::Duration::seconds(1));
    }

    #[test]
    fn test_route_sums_whole_corridor() {
        // 4.43 km at 22 km/h = 12.08 min -> 13
        let p = route_predictor(HashMap::new());
        assert_eq!(p.eta_minutes("437"), 13);
        assert_eq!(p.eta_minutes("999"), 13);
        assert_eq!(p.strategy_name(), "route");
    }

    #[test]
    fn test_route_prefers_per_line_route() {
        let mut routes = HashMap::new();
        routes.insert(
            "820".to_string(),
            vec![RouteSegment::new("Derby", "Boa Vista", 0.9)],
        );
        let p = route_predictor(routes);
        // 0.9 km / 0.3667 km/min = 2.45 -> 3
        assert_eq!(p.eta_minutes("820"), 3);
        assert_eq!(p.eta_minutes("437"), 13);
    }

    #[test]
    fn test_minutes_never_zero() {
        assert_eq!(minutes_for_distance(0.0, 0.5), 1);
        assert_eq!(minutes_for_distance(0.001, 0.5), 1);
    }

    #[test]
    fn test_minutes_exact_whole_moves_up() {
        assert_eq!(minutes_for_distance(2.0, 0.5), 5);
        assert_eq!(minutes_for_distance(2.1, 0.5), 5);
    }

    #[test]
    fn test_route_from_config() {
        let config = PredictionConfig {
            strategy: PredictionStrategyKind::Route,
            ..PredictionConfig::default()
        };
        let p = Predictor::from_config(&config, registry());
        assert_eq!(p.eta_minutes("301"), 13);
    }
}

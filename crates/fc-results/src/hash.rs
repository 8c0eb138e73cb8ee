//! Content-based hashing for run IDs.

use chrono::{DateTime, Utc};
use fc_hydro::{CatchmentParameters, StoreState, WeatherRecord};
use fc_project::schema::ForecastConfig;
use sha2::{Digest, Sha256};

/// Everything a run's output depends on.
#[derive(Debug, Clone, Copy)]
pub struct RunInputs<'a> {
    pub config: &'a ForecastConfig,
    pub start: DateTime<Utc>,
    pub weather: &'a [WeatherRecord],
    pub parameters: &'a [CatchmentParameters],
    pub initial_state: &'a [StoreState],
    pub model_version: &'a str,
}

pub fn compute_run_id(inputs: &RunInputs<'_>) -> String {
    let mut hasher = Sha256::new();

    let config_json = serde_json::to_string(inputs.config).unwrap_or_default();
    hasher.update(config_json.as_bytes());

    hasher.update(inputs.start.to_rfc3339().as_bytes());

    let weather_json = serde_json::to_string(inputs.weather).unwrap_or_default();
    hasher.update(weather_json.as_bytes());

    let params_json = serde_json::to_string(inputs.parameters).unwrap_or_default();
    hasher.update(params_json.as_bytes());

    let state_json = serde_json::to_string(inputs.initial_state).unwrap_or_default();
    hasher.update(state_json.as_bytes());

    hasher.update(inputs.model_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fc_project::schema::*;

    fn config(name: &str) -> ForecastConfig {
        ForecastConfig {
            version: 1,
            name: name.to_string(),
            catchment: CatchmentDef {
                id: "c1".to_string(),
                name: "Test".to_string(),
                area_km2: 10.0,
                altitude_m: 500.0,
                latitude_deg: -7.0,
            },
            weather: WeatherDef::default(),
            inputs: InputsDef {
                weather: "w.csv".into(),
                parameters: "p.csv".into(),
                initial_conditions: "f0.csv".into(),
                flood_parameters: None,
            },
            flood: Some(FloodDef::default()),
        }
    }

    fn inputs<'a>(
        config: &'a ForecastConfig,
        state: &'a [StoreState],
        params: &'a [CatchmentParameters],
    ) -> RunInputs<'a> {
        RunInputs {
            config,
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            weather: &[],
            parameters: params,
            initial_state: state,
            model_version: "v1",
        }
    }

    const PARAMS: [CatchmentParameters; 1] = [CatchmentParameters {
        smax: 100.0,
        qmax: 20.0,
        k: 1.0,
        tr: 10.0,
    }];

    #[test]
    fn hash_stability() {
        let c = config("a");
        let state = [StoreState::default()];
        let hash1 = compute_run_id(&inputs(&c, &state, &PARAMS));
        let hash2 = compute_run_id(&inputs(&c, &state, &PARAMS));
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let c = config("a");
        let s1 = [StoreState::default()];
        let s2 = [StoreState {
            storage: 1.0,
            ..StoreState::default()
        }];
        assert_ne!(
            compute_run_id(&inputs(&c, &s1, &PARAMS)),
            compute_run_id(&inputs(&c, &s2, &PARAMS))
        );

        let other = config("b");
        assert_ne!(
            compute_run_id(&inputs(&c, &s1, &PARAMS)),
            compute_run_id(&inputs(&other, &s1, &PARAMS))
        );
    }
}

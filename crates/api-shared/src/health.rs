use crate::types::HealthRes;

/// Simple health service shared by the REST server and the CLI.
///
/// Reports liveness plus whether the narrative model was available at startup.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Builds the health response.
    ///
    /// # Arguments
    /// * `narrative_model` - Whether a narrative generator was set up at startup
    pub fn check_health(narrative_model: bool) -> HealthRes {
        HealthRes {
            ok: true,
            message: "Discharge summary service is alive".into(),
            narrative_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_model_state() {
        assert!(HealthService::check_health(true).narrative_model);
        let res = HealthService::check_health(false);
        assert!(res.ok);
        assert!(!res.narrative_model);
    }
}

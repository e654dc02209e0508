//! Scheduling solver HTTP client.
//!
//! Submission is fire-and-forget: the solver acknowledges the request and
//! later posts the optimized assignment to the callback URL on its own.
//! A non-2xx acknowledgement is logged and surfaced; this subsystem never
//! retries automatically.

use std::time::Duration;

use prep_engine::types::PlanningRequest;

use crate::error::{DispatchError, Result};

/// Connection settings for the solver endpoint.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Base URL, e.g. `https://solver.internal:8081`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Solver-side planning delay knob, forwarded verbatim.
    pub delay_millis: i64,
    pub request_timeout: Duration,
}

impl SolverConfig {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        SolverConfig {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            delay_millis: 0,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolverClient {
    http: reqwest::Client,
    config: SolverConfig,
}

impl SolverClient {
    pub fn new(config: SolverConfig) -> Self {
        SolverClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn delay_millis(&self) -> i64 {
        self.config.delay_millis
    }

    /// POST the planning request to the solve endpoint with basic auth.
    pub async fn submit(&self, request: &PlanningRequest) -> Result<()> {
        let url = format!(
            "{}/timeTable/admin/solve-day",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .timeout(self.config.request_timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                singleton = %request.singleton_id,
                status = status.as_u16(),
                body = %body,
                "solver rejected planning request"
            );
            return Err(DispatchError::SolverRejected {
                status: status.as_u16(),
            });
        }

        tracing::info!(
            singleton = %request.singleton_id,
            parts = request.event_parts.len(),
            timeslots = request.timeslots.len(),
            users = request.user_list.len(),
            "planning request submitted"
        );
        Ok(())
    }
}

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{info, warn};

use crate::client::{AdvisorService, ServiceError};
use crate::contract::{self, ValidationError};
use crate::models::{
    InstitutionMatch, RecommendationResult, SimulationInput, SimulationResult, StudentInput,
    Submission,
};
use crate::stream::{self, CatalogStream, FallbackCatalog, StreamCategory};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a request is already in flight")]
    Busy,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Single-flight flag for one action surface. Never queues.
#[derive(Debug, Default)]
pub struct ActionGuard {
    busy: AtomicBool,
}

pub struct InFlight<'a> {
    guard: &'a ActionGuard,
}

impl ActionGuard {
    pub fn try_begin(&self) -> Option<InFlight<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { guard: self })
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

/// State carried from one view to the next. Nothing here outlives the
/// process.
#[derive(Debug, Clone, Default)]
pub struct NavState {
    pub submission: Option<Submission>,
    pub result: Option<RecommendationResult>,
}

impl NavState {
    pub fn input(&self) -> Option<&StudentInput> {
        self.submission.as_ref().map(Submission::input)
    }
}

/// What-if adjustments; unset fields start from the prior input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioOverrides {
    pub budget: Option<u64>,
    pub stress_level: Option<u32>,
    pub risk_level: Option<u32>,
}

pub fn simulation_input(nav: &NavState, overrides: ScenarioOverrides) -> SimulationInput {
    let base = nav.input().map(SimulationInput::from).unwrap_or_default();
    SimulationInput {
        budget: overrides.budget.unwrap_or(base.budget),
        stress_level: overrides.stress_level.unwrap_or(base.stress_level),
        risk_level: overrides.risk_level.unwrap_or(base.risk_level),
    }
}

pub enum CollegeSource<'a> {
    Matched(&'a [InstitutionMatch]),
    Fallback(&'a CatalogStream),
}

pub struct CollegeView<'a> {
    pub stream_label: Option<&'a str>,
    pub category: StreamCategory,
    pub source: CollegeSource<'a>,
}

/// Engine matches win; otherwise the catalog bucket picked by the
/// stream classifier.
pub fn plan_college_view<'a>(
    result: Option<&'a RecommendationResult>,
    catalog: &'a FallbackCatalog,
) -> Result<CollegeView<'a>, stream::CatalogError> {
    let stream_label = result.map(|r| r.recommended_stream.as_str());
    let category = stream::classify(stream_label);

    let source = match result {
        Some(r) if !r.institution_matches.is_empty() => {
            CollegeSource::Matched(&r.institution_matches)
        }
        _ => CollegeSource::Fallback(
            catalog
                .get(category)
                .ok_or(stream::CatalogError::MissingCategory(category.key()))?,
        ),
    };

    Ok(CollegeView {
        stream_label,
        category,
        source,
    })
}

pub struct Advisor<S> {
    service: S,
    recommend_guard: ActionGuard,
    simulate_guard: ActionGuard,
}

impl<S: AdvisorService> Advisor<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            recommend_guard: ActionGuard::default(),
            simulate_guard: ActionGuard::default(),
        }
    }

    #[cfg(test)]
    pub fn service(&self) -> &S {
        &self.service
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.recommend_guard.is_busy() || self.simulate_guard.is_busy()
    }

    /// Validates, sends, and returns the state the results view needs.
    pub async fn submit_assessment(&self, input: StudentInput) -> Result<NavState, FlowError> {
        let input = contract::validate_student_input(input)?;
        self.send_assessment(Submission::new(input)).await
    }

    /// Same as `submit_assessment` but range-checks every score.
    pub async fn submit_assessment_strict(
        &self,
        input: StudentInput,
    ) -> Result<NavState, FlowError> {
        let input = contract::validate_student_input_strict(input)?;
        self.send_assessment(Submission::new(input)).await
    }

    async fn send_assessment(&self, submission: Submission) -> Result<NavState, FlowError> {
        let _in_flight = self.recommend_guard.try_begin().ok_or(FlowError::Busy)?;
        info!(submission = %submission.id, location = %submission.input().location, "submitting assessment");

        match self.service.recommend(submission.input()).await {
            Ok(result) => {
                info!(
                    submission = %submission.id,
                    stream = %result.recommended_stream,
                    confidence = result.confidence_score,
                    "recommendation received"
                );
                Ok(NavState {
                    submission: Some(submission),
                    result: Some(result),
                })
            }
            Err(err) => {
                warn!(submission = %submission.id, error = %err, "recommendation failed");
                Err(err.into())
            }
        }
    }

    pub async fn run_simulation(
        &self,
        nav: &NavState,
        overrides: ScenarioOverrides,
    ) -> Result<SimulationResult, FlowError> {
        let input = contract::validate_simulation_input(simulation_input(nav, overrides))?;
        let _in_flight = self.simulate_guard.try_begin().ok_or(FlowError::Busy)?;
        info!(
            budget = input.budget,
            stress = input.stress_level,
            risk = input.risk_level,
            "running simulation"
        );

        self.service.simulate(&input).await.map_err(|err| {
            warn!(error = %err, "simulation failed");
            FlowError::from(err)
        })
    }
}

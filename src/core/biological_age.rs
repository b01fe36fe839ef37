//! Request/response contract for the remote biological-age estimate.
//!
//! The crate performs no estimation itself. Callers plug in an implementation
//! of [`BiologicalAgeEstimator`] that talks to whatever model serves the
//! estimate; this module only validates requests and normalizes responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::CalcError;

/// Form fields arrive as numbers or free text ("non-smoker", "120/80").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BiomarkerValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BiologicalAgeRequest {
    pub chronological_age: Option<BiomarkerValue>,
    pub sex: Option<BiomarkerValue>,
    pub resting_heart_rate: Option<BiomarkerValue>,
    pub blood_pressure: Option<BiomarkerValue>,
    pub bmi: Option<BiomarkerValue>,
    pub fasting_glucose: Option<BiomarkerValue>,
    pub hba1c: Option<BiomarkerValue>,
    pub total_cholesterol: Option<BiomarkerValue>,
    pub hdl_cholesterol: Option<BiomarkerValue>,
    pub triglycerides: Option<BiomarkerValue>,
    pub c_reactive_protein: Option<BiomarkerValue>,
    pub vo2_max: Option<BiomarkerValue>,
    pub sleep_hours: Option<BiomarkerValue>,
    pub smoking_status: Option<BiomarkerValue>,
}

impl BiologicalAgeRequest {
    fn fields(&self) -> [(&'static str, Option<&BiomarkerValue>); 14] {
        [
            ("chronologicalAge", self.chronological_age.as_ref()),
            ("sex", self.sex.as_ref()),
            ("restingHeartRate", self.resting_heart_rate.as_ref()),
            ("bloodPressure", self.blood_pressure.as_ref()),
            ("bmi", self.bmi.as_ref()),
            ("fastingGlucose", self.fasting_glucose.as_ref()),
            ("hba1c", self.hba1c.as_ref()),
            ("totalCholesterol", self.total_cholesterol.as_ref()),
            ("hdlCholesterol", self.hdl_cholesterol.as_ref()),
            ("triglycerides", self.triglycerides.as_ref()),
            ("cReactiveProtein", self.c_reactive_protein.as_ref()),
            ("vo2Max", self.vo2_max.as_ref()),
            ("sleepHours", self.sleep_hours.as_ref()),
            ("smokingStatus", self.smoking_status.as_ref()),
        ]
    }

    pub fn provided(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter_map(|(name, value)| value.map(|_| name))
            .collect()
    }

    pub fn missing(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        let mut any = false;
        for (name, value) in self.fields() {
            match value {
                None => {}
                Some(BiomarkerValue::Number(number)) if !number.is_finite() || *number < 0.0 => {
                    return Err(CalcError::invalid(name, "must be a non-negative number"));
                }
                Some(BiomarkerValue::Text(text)) if text.trim().is_empty() => {
                    return Err(CalcError::invalid(name, "must not be blank"));
                }
                Some(_) => any = true,
            }
        }
        if !any {
            return Err(CalcError::invalid(
                "biomarkers",
                "provide at least one biomarker",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiologicalAgeResponse {
    pub estimated_age: f64,
    pub insights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_biomarkers_note: Option<String>,
}

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error(transparent)]
    Invalid(#[from] CalcError),
    #[error("biological age estimator is not configured")]
    Unavailable,
    #[error("estimator request failed: {0}")]
    Upstream(String),
    #[error("estimator returned an unusable response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait BiologicalAgeEstimator: Send + Sync {
    async fn estimate(
        &self,
        request: &BiologicalAgeRequest,
    ) -> Result<BiologicalAgeResponse, EstimatorError>;
}

pub fn missing_biomarkers_note(request: &BiologicalAgeRequest) -> Option<String> {
    let missing = request.missing();
    if missing.is_empty() {
        return None;
    }
    Some(format!(
        "Estimated without {}; supplying them would sharpen the estimate.",
        missing.join(", ")
    ))
}

/// Validates the request, calls the estimator, and fills in the missing-biomarker
/// note when the estimator leaves it out.
pub async fn estimate_biological_age(
    estimator: &dyn BiologicalAgeEstimator,
    request: &BiologicalAgeRequest,
) -> Result<BiologicalAgeResponse, EstimatorError> {
    request.validate()?;
    debug!(provided = request.provided().len(), "requesting biological age estimate");

    let mut response = estimator.estimate(request).await?;
    if !response.estimated_age.is_finite() || response.estimated_age < 0.0 {
        return Err(EstimatorError::InvalidResponse(format!(
            "estimatedAge {} is not a valid age",
            response.estimated_age
        )));
    }
    if response.missing_biomarkers_note.is_none() {
        response.missing_biomarkers_note = missing_biomarkers_note(request);
    }
    Ok(response)
}

//! Validation gate.
//!
//! The gate knows which field paths belong to a step (via a [`StepFieldMap`]) and nothing
//! about the fields themselves: the actual checks come from an injected [`FieldValidator`]
//! that only ever sees the paths of the current step.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::utils::validation::{is_answered, resolve_field};
use crate::wizard::steps::{describe_step, Section, StarPart, StepDescriptor};

/// Which snapshot fields a step collects.
pub trait StepFieldMap: Send + Sync {
    fn fields_for(&self, descriptor: &StepDescriptor) -> Vec<String>;
}

/// Checks the given paths and returns the ones that failed.
pub trait FieldValidator: Send + Sync {
    fn failed_fields(&self, snapshot: &Value, paths: &[String]) -> Vec<String>;
}

impl<F> FieldValidator for F
where
    F: Fn(&Value, &[String]) -> Vec<String> + Send + Sync,
{
    fn failed_fields(&self, snapshot: &Value, paths: &[String]) -> Vec<String> {
        self(snapshot, paths)
    }
}

/// Field layout of the pitch intake form.
#[derive(Debug, Clone, Copy, Default)]
pub struct StarFieldMap;

impl StarFieldMap {
    fn star_questions(part: StarPart) -> &'static [&'static str] {
        match part {
            StarPart::Situation => &[
                "where-and-when-did-this-experience-occur",
                "briefly-describe-the-situation-or-challenge-you-faced",
            ],
            StarPart::Task => &[
                "what-was-your-responsibility-in-addressing-this-issue",
                "what-constraints-or-requirements-did-you-need-to-consider",
            ],
            StarPart::Action => &["steps"],
            StarPart::Result => &[
                "what-positive-outcome-did-you-achieve",
                "how-did-this-outcome-benefit-your-team-stakeholders-or-organization",
            ],
        }
    }
}

impl StepFieldMap for StarFieldMap {
    fn fields_for(&self, descriptor: &StepDescriptor) -> Vec<String> {
        match descriptor.section {
            Section::Intro | Section::StarIntro | Section::Review => Vec::new(),
            Section::RoleDetails => vec![
                "roleName".to_string(),
                "roleLevel".to_string(),
                "pitchWordLimit".to_string(),
                "roleDescription".to_string(),
            ],
            Section::Experience => vec!["relevantExperience".to_string()],
            Section::Guidance => vec!["guidance.acknowledged".to_string()],
            Section::StarExamples => match &descriptor.star {
                Some(pos) => Self::star_questions(pos.part)
                    .iter()
                    .map(|q| format!("starExamples.{}.{}.{}", pos.example, pos.part.key(), q))
                    .collect(),
                None => Vec::new(),
            },
        }
    }
}

/// Default checks: every path must be present and non-blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredFieldsValidator;

impl FieldValidator for RequiredFieldsValidator {
    fn failed_fields(&self, snapshot: &Value, paths: &[String]) -> Vec<String> {
        paths
            .iter()
            .filter(|p| !is_answered(resolve_field(snapshot, p)))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub passed: bool,
    pub failed_field_paths: Vec<String>,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            failed_field_paths: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct ValidationGate {
    fields: Arc<dyn StepFieldMap>,
    validator: Arc<dyn FieldValidator>,
}

impl Default for ValidationGate {
    fn default() -> Self {
        Self::new(Arc::new(StarFieldMap), Arc::new(RequiredFieldsValidator))
    }
}

impl ValidationGate {
    pub fn new(fields: Arc<dyn StepFieldMap>, validator: Arc<dyn FieldValidator>) -> Self {
        Self { fields, validator }
    }

    pub fn fields_for_step(&self, step: u32, repeat_count: u32) -> Vec<String> {
        self.fields.fields_for(&describe_step(step, repeat_count))
    }

    pub fn validate(&self, step: u32, repeat_count: u32, snapshot: &Value) -> ValidationOutcome {
        let descriptor = describe_step(step, repeat_count);
        if !descriptor.section.requires_validation() {
            return ValidationOutcome::pass();
        }

        let scope = self.fields.fields_for(&descriptor);
        if scope.is_empty() {
            return ValidationOutcome::pass();
        }

        let reported = self.validator.failed_fields(snapshot, &scope);
        // Report only paths that belong to this step, in step order.
        let failed: Vec<String> = scope
            .into_iter()
            .filter(|p| reported.contains(p))
            .collect();

        ValidationOutcome {
            passed: failed.is_empty(),
            failed_field_paths: failed,
        }
    }
}

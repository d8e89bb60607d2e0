//! Run parameters, loaded as a single global property.
//!
//! Every field has a default matching the hospital game's constants, so a
//! config file only needs to name what it changes:
//!
//! ```json
//! {
//!     "wardsim.Parameters": {
//!         "seed": 7,
//!         "infection_levels": [10, 20, 50, 80],
//!         "closure_threshold": 50.0
//!     }
//! }
//! ```
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_global_property;
use crate::error::SimError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::hospital::MAX_RESISTANCE;

/// Closure level quoted in the ward-closed message when no closure policy is
/// configured.
pub const DEFAULT_CLOSURE_THRESHOLD: f64 = 50.0;

/// Message templates. Placeholders: `{ward}` (display name), `{level}`
/// (crossed infection level), `{threshold}` (closure threshold) and
/// `{staff}` (e.g. "doctors").
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NewsTemplates {
    pub outbreak: String,
    pub first_infection: String,
    pub infection_level: String,
    pub ward_closed: String,
    pub staff_stressed: String,
}

impl Default for NewsTemplates {
    fn default() -> Self {
        NewsTemplates {
            outbreak: "An unidentified viral illness has broken out.".to_string(),
            first_infection: "First domestic case confirmed! All hospitals are urged to take \
                              precautions against the infection!"
                .to_string(),
            infection_level: "WARNING!! The infection rate in {ward} has reached {level}%!"
                .to_string(),
            ward_closed: "WARNING!! The infection rate of the {ward} ward has exceeded \
                          {threshold}%!"
                .to_string(),
            staff_stressed: "The {staff} of {ward} are under severe stress!".to_string(),
        }
    }
}

/// One ward of the runner's starting population.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WardSpec {
    pub name: String,
    pub doctors: usize,
    pub nurses: usize,
    pub outpatients: usize,
    pub inpatients: usize,
    pub emergency: usize,
    pub resistance: u8,
}

impl Default for WardSpec {
    fn default() -> Self {
        WardSpec {
            name: String::new(),
            doctors: 2,
            nurses: 4,
            outpatients: 6,
            inpatients: 8,
            emergency: 2,
            resistance: 20,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ParametersValues {
    pub seed: u64,
    pub max_time: f64,
    /// Simulated time between announcer ticks.
    pub tick_period: f64,
    /// Infection levels (percent) announced once per ward, ascending.
    pub infection_levels: Vec<u32>,
    /// Infection probability per simulation stage.
    pub stage_probabilities: BTreeMap<u32, u32>,
    pub initial_stage: u32,
    /// When set, wards above this rate are closed automatically.
    pub closure_threshold: Option<f64>,
    /// When set, the news queue drops its oldest item beyond this length.
    pub news_capacity: Option<usize>,
    /// Display lifetime attached to every news item.
    pub news_lifetime: Option<f64>,
    pub templates: NewsTemplates,

    // Runner scenario
    pub wards: Vec<WardSpec>,
    pub initial_infections: usize,
    pub initial_viruses: usize,
    pub mean_recovery_time: f64,
    pub shed_probability: f64,
    pub exposure_period: f64,
}

impl Default for ParametersValues {
    fn default() -> Self {
        ParametersValues {
            seed: 0,
            max_time: 60.0,
            tick_period: 1.0,
            infection_levels: vec![20, 50, 80],
            stage_probabilities: BTreeMap::from([(1, 30), (2, 20)]),
            initial_stage: 1,
            closure_threshold: None,
            news_capacity: None,
            news_lifetime: None,
            templates: NewsTemplates::default(),
            wards: Vec::new(),
            initial_infections: 1,
            initial_viruses: 0,
            mean_recovery_time: 14.0,
            shed_probability: 0.1,
            exposure_period: 1.0,
        }
    }
}

fn positive(name: &str, value: f64) -> Result<(), SimError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidParameter(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

fn validate_parameters(values: &ParametersValues) -> Result<(), SimError> {
    positive("tick_period", values.tick_period)?;
    positive("mean_recovery_time", values.mean_recovery_time)?;
    positive("exposure_period", values.exposure_period)?;
    if !(values.max_time >= 0.0 && values.max_time.is_finite()) {
        return Err(SimError::InvalidParameter(format!(
            "max_time must be a non-negative number, got {}",
            values.max_time
        )));
    }

    if values
        .infection_levels
        .iter()
        .any(|level| *level == 0 || *level > 100)
    {
        return Err(SimError::InvalidParameter(format!(
            "infection levels must lie in 1..=100, got {:?}",
            values.infection_levels
        )));
    }
    if values.infection_levels.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(SimError::InvalidParameter(format!(
            "infection levels must be strictly ascending, got {:?}",
            values.infection_levels
        )));
    }

    if !values.stage_probabilities.contains_key(&values.initial_stage) {
        return Err(SimError::InvalidParameter(format!(
            "initial stage {} has no infection probability",
            values.initial_stage
        )));
    }
    if let Some(threshold) = values.closure_threshold {
        if !(0.0..=100.0).contains(&threshold) {
            return Err(SimError::InvalidParameter(format!(
                "closure threshold {threshold} is not a percentage"
            )));
        }
    }
    if values.news_capacity == Some(0) {
        return Err(SimError::InvalidParameter(
            "news capacity must be at least 1".to_string(),
        ));
    }
    if let Some(lifetime) = values.news_lifetime {
        positive("news_lifetime", lifetime)?;
    }
    if !(0.0..=1.0).contains(&values.shed_probability) {
        return Err(SimError::InvalidParameter(format!(
            "shed probability {} is not a probability",
            values.shed_probability
        )));
    }
    if let Some(ward) = values
        .wards
        .iter()
        .find(|ward| ward.resistance > MAX_RESISTANCE || ward.name.is_empty())
    {
        return Err(SimError::InvalidParameter(format!(
            "ward {:?} needs a name and a resistance of at most {MAX_RESISTANCE}",
            ward.name
        )));
    }
    Ok(())
}

define_global_property!(Parameters, ParametersValues, validate_parameters);

static DEFAULT_PARAMETERS: LazyLock<ParametersValues> = LazyLock::new(ParametersValues::default);

pub trait ContextParametersExt {
    /// Loads `wardsim.Parameters` from a JSON config file.
    ///
    /// # Errors
    ///
    /// Fails if the file is unreadable, malformed, or the values are invalid.
    fn init_parameters(&mut self, file_path: &Path) -> Result<(), SimError>;

    /// Sets parameters from code.
    ///
    /// # Errors
    ///
    /// Fails if the values are invalid or parameters were already set.
    fn set_parameters(&mut self, values: ParametersValues) -> Result<(), SimError>;

    /// The run's parameters, or the defaults if none were set.
    fn get_parameters(&self) -> &ParametersValues;
}

impl ContextParametersExt for Context {
    fn init_parameters(&mut self, file_path: &Path) -> Result<(), SimError> {
        self.load_global_property_from_file(Parameters, file_path)
    }

    fn set_parameters(&mut self, values: ParametersValues) -> Result<(), SimError> {
        self.set_global_property_value(Parameters, values)
    }

    fn get_parameters(&self) -> &ParametersValues {
        self.get_global_property_value(Parameters)
            .unwrap_or(&DEFAULT_PARAMETERS)
    }
}

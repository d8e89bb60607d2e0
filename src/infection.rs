//! Infection-rate queries and the infection check.
//!
//! Rates are total functions of the current rosters: an empty scope has a
//! rate of 0, and the hospital-wide rate pools head counts rather than
//! averaging per-ward rates, so one sick patient in a ward of one next to a
//! healthy ward of 99 is a 1% hospital, not a 50% one.
use log::{info, trace, warn};
use strum::IntoEnumIterator;

use crate::context::Context;
use crate::define_data_plugin;
use crate::define_rng;
use crate::error::SimError;
use crate::hospital::{for_each_rostered_person, ContextHospitalExt, Role, WardCounts, WardId};
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::virus::ContextVirusExt;
use crate::{HashMap, HashMapExt};

define_rng!(InfectionRng);

/// Percentage of `counts` that is infected, in `[0, 100]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn infection_rate(counts: &WardCounts) -> f64 {
    if counts.total == 0 {
        0.0
    } else {
        100.0 * counts.infected as f64 / counts.total as f64
    }
}

struct InfectionData {
    stage: Option<u32>,
    infection_probability: Option<u32>,
}

define_data_plugin!(
    InfectionPlugin,
    InfectionData,
    InfectionData {
        stage: None,
        infection_probability: None,
    }
);

pub trait ContextInfectionExt {
    /// Infection rate of one ward, in percent.
    ///
    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward is not registered.
    fn get_infection_rate(&self, ward: WardId) -> Result<f64, SimError>;

    /// Pooled infection rate of `wards`, in percent. Unknown wards contribute
    /// nothing.
    fn get_overall_infection_rate(&self, wards: &[WardId]) -> f64;

    /// Fraction (`0..=1`) of each role that is infected, across every ward.
    /// A role with nobody in it maps to 0.
    fn get_infection_rate_by_role(&self) -> HashMap<Role, f64>;

    /// Decides whether an exposure infects someone with the given resistance.
    fn check_infection(&self, resistance: u8) -> bool;

    /// Switches to a new simulation stage, picking its infection probability
    /// from the configured stage table. Unknown stages keep the current
    /// probability.
    fn set_simulation_stage(&mut self, stage: u32);

    fn get_simulation_stage(&self) -> u32;

    fn get_infection_probability(&self) -> u32;

    /// Clears every live infection source in the hospital.
    fn disinfect_all(&mut self);
}

impl ContextInfectionExt for Context {
    fn get_infection_rate(&self, ward: WardId) -> Result<f64, SimError> {
        Ok(infection_rate(&self.get_ward_counts(ward)?))
    }

    fn get_overall_infection_rate(&self, wards: &[WardId]) -> f64 {
        let counts: WardCounts = wards
            .iter()
            .filter_map(|ward| self.get_ward_counts(*ward).ok())
            .sum();
        infection_rate(&counts)
    }

    #[allow(clippy::cast_precision_loss)]
    fn get_infection_rate_by_role(&self) -> HashMap<Role, f64> {
        let mut counts: HashMap<Role, WardCounts> = HashMap::new();
        for_each_rostered_person(self, |role, person| {
            let bucket = counts.entry(role).or_default();
            bucket.total += 1;
            if person.status().is_infected() {
                bucket.infected += 1;
            }
        });
        Role::iter()
            .map(|role| {
                let bucket = counts.get(&role).copied().unwrap_or_default();
                (role, infection_rate(&bucket) / 100.0)
            })
            .collect()
    }

    fn check_infection(&self, resistance: u8) -> bool {
        let probability = self.get_infection_probability();
        if probability == 0 {
            return false;
        }
        let exposure: u32 = self.sample_range(InfectionRng, 0..probability);
        let threshold: u32 = self.sample_range(InfectionRng, 0..=100);
        let infected = i64::from(exposure) - i64::from(resistance) >= i64::from(threshold);
        trace!("infection check: {exposure} - {resistance} vs {threshold} -> {infected}");
        infected
    }

    fn set_simulation_stage(&mut self, stage: u32) {
        let probability = self
            .get_parameters()
            .stage_probabilities
            .get(&stage)
            .copied();
        let Some(probability) = probability else {
            warn!(
                "stage {stage} has no infection probability; keeping {}",
                self.get_infection_probability()
            );
            return;
        };
        let data = self.get_data_mut(InfectionPlugin);
        data.stage = Some(stage);
        data.infection_probability = Some(probability);
        info!("simulation stage {stage}: infection probability {probability}");
    }

    fn get_simulation_stage(&self) -> u32 {
        self.get_data(InfectionPlugin)
            .and_then(|data| data.stage)
            .unwrap_or(self.get_parameters().initial_stage)
    }

    fn get_infection_probability(&self) -> u32 {
        if let Some(probability) = self
            .get_data(InfectionPlugin)
            .and_then(|data| data.infection_probability)
        {
            return probability;
        }
        let parameters = self.get_parameters();
        parameters
            .stage_probabilities
            .get(&parameters.initial_stage)
            .copied()
            .unwrap_or(0)
    }

    fn disinfect_all(&mut self) {
        self.disinfect();
    }
}

//! Exposure and recovery for the command-line runner.
//!
//! Every `exposure_period`, each healthy person in a ward that holds a live
//! virus or an infected person is exposed once and infected if
//! `check_infection` says so. An infected person recovers after an
//! exponentially distributed time and may leave a virus behind in their ward.
use log::{error, trace};
use rand::seq::IndexedRandom;
use rand_distr::Exp;

use crate::context::Context;
use crate::define_rng;
use crate::error::SimError;
use crate::hospital::{ContextHospitalExt, InfectionStatus, InfectionStatusEvent, PersonId};
use crate::infection::ContextInfectionExt;
use crate::parameters::ContextParametersExt;
use crate::plan::ExecutionPhase;
use crate::random::ContextRandomExt;
use crate::virus::ContextVirusExt;

define_rng!(TransmissionRng);

fn schedule_recovery(context: &mut Context, person: PersonId) -> Result<(), SimError> {
    let mean_recovery_time = context.get_parameters().mean_recovery_time;
    let distribution = Exp::new(1.0 / mean_recovery_time)
        .map_err(|err| SimError::InvalidParameter(format!("recovery time: {err}")))?;
    let recovery_time =
        context.get_current_time() + context.sample_distr(TransmissionRng, distribution);
    context.add_plan(recovery_time, move |context| {
        if let Err(err) = context.set_infection_status(person, InfectionStatus::Recovered) {
            error!("could not recover {person}: {err}");
        }
    });
    Ok(())
}

fn handle_infection_status_change(context: &mut Context, event: InfectionStatusEvent) {
    if event.current != InfectionStatus::Infected {
        return;
    }
    if let Err(err) = schedule_recovery(context, event.person) {
        error!("could not schedule recovery for {}: {err}", event.person);
    }
    let shed_probability = context.get_parameters().shed_probability;
    if let Some(ward) = event.ward {
        if context.sample_bool(TransmissionRng, shed_probability) {
            if let Err(err) = context.add_virus(ward) {
                error!("{} could not shed a virus: {err}", event.person);
            }
        }
    }
}

/// Healthy people in wards with a live virus or an infected person, with
/// their resistance.
fn exposed_people(context: &Context) -> Vec<(PersonId, u8)> {
    let mut exposed = Vec::new();
    for ward_id in context.ward_ids() {
        let Ok(ward) = context.get_ward(ward_id) else {
            continue;
        };
        let people: Vec<_> = ward
            .members()
            .filter_map(|person| context.get_person(person).ok())
            .collect();
        let has_source = context.live_viruses_in(ward_id) > 0
            || people
                .iter()
                .any(|person| person.status() == InfectionStatus::Infected);
        if has_source {
            exposed.extend(
                people
                    .iter()
                    .filter(|person| person.status() == InfectionStatus::Normal)
                    .map(|person| (person.id(), person.resistance())),
            );
        }
    }
    exposed
}

fn expose(context: &mut Context) {
    let exposed = exposed_people(context);
    trace!("exposing {} people", exposed.len());
    for (person, resistance) in exposed {
        if context.check_infection(resistance) {
            if let Err(err) = context.set_infection_status(person, InfectionStatus::Infected) {
                error!("could not infect {person}: {err}");
            }
        }
    }
}

fn seed_outbreak(context: &mut Context) -> Result<(), SimError> {
    let parameters = context.get_parameters();
    let initial_infections = parameters.initial_infections;
    let initial_viruses = parameters.initial_viruses;

    let everyone: Vec<PersonId> = context
        .ward_ids()
        .into_iter()
        .filter_map(|ward| context.get_ward(ward).ok())
        .flat_map(|ward| ward.members().collect::<Vec<_>>())
        .collect();
    let index_cases: Vec<PersonId> = context.sample(TransmissionRng, |rng| {
        everyone
            .choose_multiple(rng, initial_infections)
            .copied()
            .collect()
    });
    for person in index_cases {
        context.set_infection_status(person, InfectionStatus::Infected)?;
    }

    let wards = context.ward_ids();
    if !wards.is_empty() {
        for _ in 0..initial_viruses {
            let ward = wards[context.sample_range(TransmissionRng, 0..wards.len())];
            context.add_virus(ward)?;
        }
    }
    Ok(())
}

/// Seeds the outbreak at time 0 and starts periodic exposure.
///
/// # Errors
///
/// `SimError::InvalidParameter` if the exposure period is not positive.
pub fn init(context: &mut Context) -> Result<(), SimError> {
    let period = context.get_parameters().exposure_period;
    if !(period > 0.0 && period.is_finite()) {
        return Err(SimError::InvalidParameter(format!(
            "exposure period must be positive, got {period}"
        )));
    }
    context.subscribe_to_event(handle_infection_status_change);
    context.add_plan(0.0, |context| {
        if let Err(err) = seed_outbreak(context) {
            error!("could not seed the outbreak: {err}");
        }
    });
    context.add_periodic_plan_with_phase(period, expose, ExecutionPhase::Normal);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_data_plugin;
    use crate::hospital::Role;
    use crate::parameters::ParametersValues;

    define_data_plugin!(RecoveryCount, usize, 0);

    fn setup(parameters: ParametersValues) -> Context {
        let mut context = Context::new();
        context.set_parameters(parameters).unwrap();
        context.init_random(8);
        context
    }

    #[test]
    fn every_infection_recovers() {
        let mut context = setup(ParametersValues {
            shed_probability: 0.0,
            ..ParametersValues::default()
        });
        context.subscribe_to_event(handle_infection_status_change);
        context.subscribe_to_event(|context, event: InfectionStatusEvent| {
            if event.current == InfectionStatus::Recovered {
                *context.get_data_mut(RecoveryCount) += 1;
            }
        });
        let ward = context.add_ward("A");
        for _ in 0..10 {
            let person = context.add_person(ward, Role::Inpatient, 0).unwrap();
            context
                .set_infection_status(person, InfectionStatus::Infected)
                .unwrap();
        }
        context.execute();
        assert_eq!(context.get_data(RecoveryCount), Some(&10));
        assert_eq!(context.live_virus_count(), 0);
    }

    #[test]
    fn infected_people_always_shed_when_certain() {
        let mut context = setup(ParametersValues {
            shed_probability: 1.0,
            ..ParametersValues::default()
        });
        context.subscribe_to_event(handle_infection_status_change);
        let ward = context.add_ward("A");
        let person = context.add_person(ward, Role::Doctor, 0).unwrap();
        context
            .set_infection_status(person, InfectionStatus::Infected)
            .unwrap();
        context.execute();
        assert_eq!(context.live_viruses_in(ward), 1);
    }

    #[test]
    fn only_wards_with_a_source_are_exposed() {
        let mut context = Context::new();
        let quiet = context.add_ward("Quiet");
        let sick = context.add_ward("Sick");
        let dusty = context.add_ward("Dusty");
        context.add_person(quiet, Role::Nurse, 10).unwrap();
        let patient = context.add_person(sick, Role::Inpatient, 0).unwrap();
        let neighbour = context.add_person(sick, Role::Inpatient, 30).unwrap();
        let cleaner = context.add_person(dusty, Role::Nurse, 50).unwrap();
        context
            .set_infection_status(patient, InfectionStatus::Infected)
            .unwrap();
        context.add_virus(dusty).unwrap();

        assert_eq!(exposed_people(&context), vec![(neighbour, 30), (cleaner, 50)]);

        context.disinfect_all();
        assert_eq!(exposed_people(&context), vec![(neighbour, 30)]);
    }

    #[test]
    fn seeding_infects_and_places_viruses() {
        let mut context = setup(ParametersValues {
            initial_infections: 3,
            initial_viruses: 2,
            shed_probability: 0.0,
            ..ParametersValues::default()
        });
        let ward = context.add_ward("A");
        for _ in 0..20 {
            context.add_person(ward, Role::Outpatient, 0).unwrap();
        }
        seed_outbreak(&mut context).unwrap();
        assert_eq!(context.get_ward_counts(ward).unwrap().infected, 3);
        assert_eq!(context.live_viruses_in(ward), 2);
    }

    #[test]
    fn outbreak_spreads_over_time() {
        let mut context = setup(ParametersValues {
            stage_probabilities: [(1, 100)].into(),
            initial_infections: 1,
            mean_recovery_time: 50.0,
            ..ParametersValues::default()
        });
        let ward = context.add_ward("A");
        for _ in 0..30 {
            context.add_person(ward, Role::Inpatient, 0).unwrap();
        }
        init(&mut context).unwrap();
        context.add_plan(10.0, Context::shutdown);
        context.execute();
        assert!(context.get_ward_counts(ward).unwrap().infected > 1);
    }
}

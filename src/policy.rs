//! Automatic ward closure.
//!
//! When `closure_threshold` is configured, every ward whose infection rate is
//! above it is closed, and reopened once it falls back to or below it. The
//! check runs every `tick_period` in the `Normal` phase, so the announcer sees
//! the result in the same tick. Without a threshold the closed flag is left
//! entirely to callers of `set_ward_closed`.
use log::{error, info, trace};

use crate::context::Context;
use crate::error::SimError;
use crate::hospital::ContextHospitalExt;
use crate::infection::ContextInfectionExt;
use crate::parameters::ContextParametersExt;
use crate::plan::ExecutionPhase;

fn apply_closures(context: &mut Context, threshold: f64) -> Result<(), SimError> {
    for ward in context.ward_ids() {
        let rate = context.get_infection_rate(ward)?;
        context.set_ward_closed(ward, rate > threshold)?;
    }
    Ok(())
}

/// Starts the closure policy if a threshold is configured.
///
/// # Errors
///
/// `SimError::InvalidParameter` if the tick period is not positive.
pub fn init(context: &mut Context) -> Result<(), SimError> {
    let parameters = context.get_parameters();
    let Some(threshold) = parameters.closure_threshold else {
        trace!("no closure threshold configured; ward closure is manual");
        return Ok(());
    };
    let period = parameters.tick_period;
    if !(period > 0.0 && period.is_finite()) {
        return Err(SimError::InvalidParameter(format!(
            "tick period must be positive, got {period}"
        )));
    }

    info!("closing wards above {threshold}% infection");
    context.add_periodic_plan_with_phase(
        period,
        move |context| {
            if let Err(err) = apply_closures(context, threshold) {
                error!("closure policy failed: {err}");
            }
        },
        ExecutionPhase::Normal,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hospital::{InfectionStatus, PersonId, Role};
    use crate::parameters::ParametersValues;

    fn setup(threshold: Option<f64>) -> (Context, Vec<PersonId>) {
        let mut context = Context::new();
        context
            .set_parameters(ParametersValues {
                closure_threshold: threshold,
                ..ParametersValues::default()
            })
            .unwrap();
        let ward = context.add_ward("A");
        let people = (0..4)
            .map(|_| context.add_person(ward, Role::Inpatient, 0).unwrap())
            .collect();
        (context, people)
    }

    fn set_status_at(context: &mut Context, time: f64, people: &[PersonId], status: InfectionStatus) {
        let people = people.to_vec();
        context.add_plan(time, move |context| {
            for person in &people {
                context.set_infection_status(*person, status).unwrap();
            }
        });
    }

    #[test]
    fn wards_close_and_reopen() {
        let (mut context, people) = setup(Some(50.0));
        init(&mut context).unwrap();
        let ward = context.ward_ids()[0];

        // 75% at t=0.5, then back to 50% (not above) at t=1.5.
        set_status_at(&mut context, 0.5, &people[0..3], InfectionStatus::Infected);
        context.add_plan(1.25, move |context| {
            assert!(context.get_ward(ward).unwrap().is_closed());
        });
        set_status_at(&mut context, 1.5, &people[2..3], InfectionStatus::Normal);
        context.add_plan(2.5, Context::shutdown);
        context.execute();

        assert!(!context.get_ward(ward).unwrap().is_closed());
    }

    #[test]
    fn exactly_at_threshold_stays_open() {
        let (mut context, people) = setup(Some(50.0));
        init(&mut context).unwrap();
        set_status_at(&mut context, 0.5, &people[0..2], InfectionStatus::Infected);
        context.add_plan(1.5, Context::shutdown);
        context.execute();
        assert!(!context.get_ward(context.ward_ids()[0]).unwrap().is_closed());
    }

    #[test]
    fn without_threshold_nothing_is_scheduled() {
        let (mut context, people) = setup(None);
        init(&mut context).unwrap();
        set_status_at(&mut context, 0.5, &people, InfectionStatus::Infected);
        context.add_plan(3.0, Context::shutdown);
        context.execute();
        assert!(!context.get_ward(context.ward_ids()[0]).unwrap().is_closed());
    }

    #[test]
    fn closure_is_announced_in_the_same_tick() {
        use crate::announcer::{self, ContextAnnouncerExt};

        let (mut context, people) = setup(Some(50.0));
        init(&mut context).unwrap();
        announcer::init(&mut context).unwrap();
        let ward = context.ward_ids()[0];
        set_status_at(&mut context, 0.5, &people[0..3], InfectionStatus::Infected);
        context.add_plan(1.5, Context::shutdown);
        context.execute();
        assert!(context.get_ward_triggers(ward).unwrap().closed());
    }

    #[test]
    fn policy_and_announcer_stop_without_shutdown() {
        use crate::announcer;

        let (mut context, people) = setup(Some(50.0));
        init(&mut context).unwrap();
        announcer::init(&mut context).unwrap();
        set_status_at(&mut context, 2.5, &people[0..3], InfectionStatus::Infected);
        context.execute();
        // Both ticks run at t=3, after the last one-shot plan, then stop.
        assert_eq!(context.get_current_time(), 3.0);
        assert!(context.get_ward(context.ward_ids()[0]).unwrap().is_closed());
    }
}

//! The runner's hospital: wards from the parameters, an outbreak, and CSV
//! reports of what happened.
//!
//! `init` wires every module together in the order a run needs them:
//! population, reports, transmission, the closure policy, then the
//! announcer, which must see every ward at start.
use log::info;
use serde::Serialize;

use crate::announcer::{self, ContextAnnouncerExt};
use crate::context::Context;
use crate::define_report;
use crate::error::SimError;
use crate::hospital::{ContextHospitalExt, InfectionStatus, InfectionStatusEvent, PersonId, Role};
use crate::infection::ContextInfectionExt;
use crate::news::NewsEnqueuedEvent;
use crate::parameters::{ContextParametersExt, WardSpec};
use crate::policy;
use crate::report::ContextReportExt;
use crate::transmission;

#[derive(Serialize)]
struct NewsReportItem {
    time: f64,
    message: String,
}

define_report!(NewsReportItem);

#[derive(Serialize)]
struct IncidenceReportItem {
    time: f64,
    person_id: PersonId,
    ward: Option<String>,
    role: Role,
    infection_status: InfectionStatus,
}

define_report!(IncidenceReportItem);

fn add_ward_from_spec(context: &mut Context, spec: &WardSpec) -> Result<(), SimError> {
    let ward = context.add_ward(spec.name.clone());
    let roster = [
        (Role::Doctor, spec.doctors),
        (Role::Nurse, spec.nurses),
        (Role::Outpatient, spec.outpatients),
        (Role::Inpatient, spec.inpatients),
        (Role::Emergency, spec.emergency),
    ];
    for (role, count) in roster {
        for _ in 0..count {
            context.add_person(ward, role, spec.resistance)?;
        }
    }
    Ok(())
}

fn default_wards() -> Vec<WardSpec> {
    ["Internal Medicine", "Surgery", "Emergency"]
        .into_iter()
        .map(|name| WardSpec {
            name: name.to_string(),
            ..WardSpec::default()
        })
        .collect()
}

fn add_reports(context: &mut Context) -> Result<(), SimError> {
    context.add_report::<NewsReportItem>("news")?;
    context.add_report::<IncidenceReportItem>("incidence")?;

    context.subscribe_to_event(|context, event: NewsEnqueuedEvent| {
        context.send_report(NewsReportItem {
            time: event.item.time,
            message: event.item.message,
        });
    });
    context.subscribe_to_event(|context, event: InfectionStatusEvent| {
        let ward = event
            .ward
            .and_then(|ward| context.get_ward(ward).ok())
            .map(|ward| ward.name().to_string());
        context.send_report(IncidenceReportItem {
            time: context.get_current_time(),
            person_id: event.person,
            ward,
            role: event.role,
            infection_status: event.current,
        });
    });
    Ok(())
}

/// Builds the hospital and starts every module. With no wards configured, a
/// three-ward hospital is used.
///
/// # Errors
///
/// Fails if a report cannot be created or a module rejects the parameters.
pub fn init(context: &mut Context) -> Result<(), SimError> {
    let parameters = context.get_parameters();
    let wards = if parameters.wards.is_empty() {
        default_wards()
    } else {
        parameters.wards.clone()
    };
    let max_time = parameters.max_time;
    let initial_stage = parameters.initial_stage;

    for spec in &wards {
        add_ward_from_spec(context, spec)?;
    }
    info!(
        "hospital has {} ward(s) and {} people",
        context.ward_count(),
        context
            .ward_ids()
            .into_iter()
            .filter_map(|ward| context.get_ward(ward).ok())
            .map(|ward| ward.total())
            .sum::<usize>()
    );

    add_reports(context)?;
    transmission::init(context)?;
    policy::init(context)?;
    announcer::init(context)?;

    context.add_plan(0.0, move |context| {
        context.set_simulation_stage(initial_stage);
        context.announce_outbreak();
    });
    context.add_plan(max_time, Context::shutdown);
    Ok(())
}

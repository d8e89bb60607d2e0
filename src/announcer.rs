//! The news announcer.
//!
//! Once started with [`init`], the announcer ticks every `tick_period` units
//! of simulated time in the `Last` phase, so everything else scheduled for
//! the same instant has already happened. Each tick reads one
//! [`HospitalSnapshot`] and checks, in order:
//!
//! 1. the first infection anywhere in the hospital (announced once per run);
//! 2. each ward's infection rate against the configured levels: a level is
//!    announced the first time the rate reaches it and never again, however
//!    the rate moves afterwards;
//! 3. each ward's closed flag, announced on every open-to-closed change;
//! 4. each ward's stressed staff categories, announced on every
//!    calm-to-stressed change.
//!
//! Wards are visited in registration order, so the same inputs always give
//! the same messages in the same order. Messages are formatted from the
//! templates in [`NewsTemplates`](crate::parameters::NewsTemplates) when they
//! are queued; renaming a ward later does not touch them.
//!
//! Every ward must have trigger state by the time a tick sees it. [`init`]
//! creates it for every ward registered so far; a ward added afterwards needs
//! [`ContextAnnouncerExt::register_ward_triggers`] before the next tick, or
//! the tick fails loudly.
use log::{error, info, trace};
use strum::{EnumCount, IntoEnumIterator};

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::SimError;
use crate::hospital::{ContextHospitalExt, HospitalSnapshot, StaffCategory, WardCounts, WardId};
use crate::infection::infection_rate;
use crate::news::ContextNewsExt;
use crate::parameters::{ContextParametersExt, NewsTemplates, DEFAULT_CLOSURE_THRESHOLD};
use crate::plan::ExecutionPhase;
use crate::HashMap;

/// Announcement state of one ward.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WardTriggers {
    /// Bit `n` is set once level `n` has been announced. Levels are at most
    /// 100.
    crossed_levels: u128,
    closed: bool,
    stressed_staff: [bool; StaffCategory::COUNT],
}

impl WardTriggers {
    #[must_use]
    pub fn has_crossed(&self, level: u32) -> bool {
        level < u128::BITS && self.crossed_levels & (1 << level) != 0
    }

    fn mark_crossed(&mut self, level: u32) {
        self.crossed_levels |= 1 << level;
    }

    /// Announced levels, ascending.
    #[must_use]
    pub fn crossed_levels(&self) -> Vec<u32> {
        (0..u128::BITS).filter(|level| self.has_crossed(*level)).collect()
    }

    /// Whether the ward was closed as of the last tick.
    #[must_use]
    pub fn closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn staff_stressed(&self, category: StaffCategory) -> bool {
        self.stressed_staff[category as usize]
    }
}

/// Updates a re-armable flag and reports whether it just went from unset to
/// set.
fn rising_edge(flag: &mut bool, condition: bool) -> bool {
    let rising = condition && !*flag;
    *flag = condition;
    rising
}

/// Infection rate rounded half-to-even to a whole percent.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rounded_rate(counts: &WardCounts) -> u32 {
    infection_rate(counts).round_ties_even() as u32
}

/// Replaces each `{key}` in `template` with its value in a single pass.
/// Substituted values are copied verbatim; unknown placeholders are kept.
fn fill_template(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut message = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        message.push_str(&rest[..open]);
        let candidate = &rest[open + 1..];
        let value = candidate.find('}').and_then(|close| {
            let key = &candidate[..close];
            substitutions
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                message.push_str(value);
                rest = &candidate[close + 1..];
            }
            None => {
                message.push('{');
                rest = candidate;
            }
        }
    }
    message.push_str(rest);
    message
}

#[derive(Default)]
struct AnnouncerState {
    running: bool,
    levels: Vec<u32>,
    templates: NewsTemplates,
    closure_threshold: f64,
    first_infection_announced: bool,
    outbreak_announced: bool,
    triggers: HashMap<WardId, WardTriggers>,
}

impl AnnouncerState {
    /// Compares `snapshot` against the trigger state, updates it, and returns
    /// the messages to queue. Nothing is updated if a ward has no trigger
    /// state.
    fn evaluate(&mut self, snapshot: &HospitalSnapshot) -> Result<Vec<String>, SimError> {
        if let Some(ward) = snapshot
            .wards
            .iter()
            .find(|ward| !self.triggers.contains_key(&ward.id))
        {
            return Err(SimError::UnknownWard(ward.id));
        }

        let mut messages = Vec::new();

        if !self.first_infection_announced && infection_rate(&snapshot.total_counts()) > 0.0 {
            self.first_infection_announced = true;
            messages.push(self.templates.first_infection.clone());
        }

        for ward in &snapshot.wards {
            let rate = rounded_rate(&ward.counts);
            let triggers = self.triggers.entry(ward.id).or_default();
            for &level in &self.levels {
                if rate >= level && !triggers.has_crossed(level) {
                    triggers.mark_crossed(level);
                    messages.push(fill_template(
                        &self.templates.infection_level,
                        &[("ward", &ward.name), ("level", &level.to_string())],
                    ));
                }
            }
        }

        for ward in &snapshot.wards {
            let triggers = self.triggers.entry(ward.id).or_default();
            if rising_edge(&mut triggers.closed, ward.closed) {
                messages.push(fill_template(
                    &self.templates.ward_closed,
                    &[
                        ("ward", &ward.name),
                        ("threshold", &self.closure_threshold.to_string()),
                    ],
                ));
            }
        }

        for ward in &snapshot.wards {
            let triggers = self.triggers.entry(ward.id).or_default();
            for category in StaffCategory::iter() {
                let flag = &mut triggers.stressed_staff[category as usize];
                if rising_edge(flag, ward.is_staff_stressed(category)) {
                    messages.push(fill_template(
                        &self.templates.staff_stressed,
                        &[("ward", &ward.name), ("staff", category.plural())],
                    ));
                }
            }
        }

        Ok(messages)
    }
}

define_data_plugin!(AnnouncerPlugin, AnnouncerState, AnnouncerState::default());

fn tick(context: &mut Context) {
    let snapshot = context.snapshot();
    let result = context.get_data_mut(AnnouncerPlugin).evaluate(&snapshot);
    match result {
        Ok(messages) => {
            trace!(
                "announcer tick at t={}: {} message(s)",
                snapshot.time,
                messages.len()
            );
            for message in messages {
                context.enqueue_news(message);
            }
        }
        Err(err) => {
            error!(
                "announcer tick at t={} found a ward without trigger state: {err}",
                snapshot.time
            );
            panic!("announcer is misconfigured: {err}");
        }
    }
}

/// Creates trigger state for every registered ward and starts the periodic
/// tick.
///
/// # Errors
///
/// * `SimError::InvalidParameter` if the tick period is not positive.
/// * `SimError::ConfigError` if no ward is registered or the announcer is
///   already running.
pub fn init(context: &mut Context) -> Result<(), SimError> {
    let parameters = context.get_parameters();
    let tick_period = parameters.tick_period;
    if !(tick_period > 0.0 && tick_period.is_finite()) {
        error!("cannot start the announcer: tick period {tick_period} is not positive");
        return Err(SimError::InvalidParameter(format!(
            "tick period must be positive, got {tick_period}"
        )));
    }
    let ward_ids = context.ward_ids();
    if ward_ids.is_empty() {
        error!("cannot start the announcer: no wards are registered");
        return Err(SimError::ConfigError(
            "the announcer needs at least one registered ward".to_string(),
        ));
    }
    if context
        .get_data(AnnouncerPlugin)
        .is_some_and(|state| state.running)
    {
        error!("cannot start the announcer twice");
        return Err(SimError::ConfigError(
            "the announcer is already running".to_string(),
        ));
    }

    let levels = parameters.infection_levels.clone();
    let templates = parameters.templates.clone();
    let closure_threshold = parameters
        .closure_threshold
        .unwrap_or(DEFAULT_CLOSURE_THRESHOLD);

    let state = context.get_data_mut(AnnouncerPlugin);
    state.running = true;
    state.levels = levels;
    state.templates = templates;
    state.closure_threshold = closure_threshold;
    for ward in &ward_ids {
        state.triggers.entry(*ward).or_default();
    }
    info!(
        "announcer watching {} ward(s) every {tick_period} time units",
        ward_ids.len()
    );

    context.add_periodic_plan_with_phase(tick_period, tick, ExecutionPhase::Last);
    Ok(())
}

pub trait ContextAnnouncerExt {
    /// Announces the outbreak of an unknown virus. Only the first call has an
    /// effect.
    fn announce_outbreak(&mut self);

    /// Creates trigger state for a ward registered after [`init`].
    ///
    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward is not registered.
    fn register_ward_triggers(&mut self, ward: WardId) -> Result<(), SimError>;

    /// Forgets everything announced for a ward, so its levels and flags can
    /// be announced again.
    ///
    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward has no trigger state.
    fn reset_ward_triggers(&mut self, ward: WardId) -> Result<(), SimError>;

    fn get_ward_triggers(&self, ward: WardId) -> Option<&WardTriggers>;

    fn first_infection_announced(&self) -> bool;
}

impl ContextAnnouncerExt for Context {
    fn announce_outbreak(&mut self) {
        let message = self.get_parameters().templates.outbreak.clone();
        let state = self.get_data_mut(AnnouncerPlugin);
        if state.outbreak_announced {
            trace!("outbreak already announced");
            return;
        }
        state.outbreak_announced = true;
        self.enqueue_news(message);
    }

    fn register_ward_triggers(&mut self, ward: WardId) -> Result<(), SimError> {
        self.get_ward(ward)?;
        self.get_data_mut(AnnouncerPlugin)
            .triggers
            .entry(ward)
            .or_default();
        trace!("registered announcer triggers for {ward}");
        Ok(())
    }

    fn reset_ward_triggers(&mut self, ward: WardId) -> Result<(), SimError> {
        let triggers = self
            .get_data_mut(AnnouncerPlugin)
            .triggers
            .get_mut(&ward)
            .ok_or(SimError::UnknownWard(ward))?;
        *triggers = WardTriggers::default();
        trace!("reset announcer triggers for {ward}");
        Ok(())
    }

    fn get_ward_triggers(&self, ward: WardId) -> Option<&WardTriggers> {
        self.get_data(AnnouncerPlugin)?.triggers.get(&ward)
    }

    fn first_infection_announced(&self) -> bool {
        self.get_data(AnnouncerPlugin)
            .is_some_and(|state| state.first_infection_announced)
    }
}

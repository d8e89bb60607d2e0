//! The ward registry.
//!
//! The hospital is a fixed, append-only list of wards. Each ward keeps one
//! roster per [`Role`]; a person belongs to at most one ward at a time and
//! leaves every roster when discharged. Registration order is the iteration
//! order everywhere, which is what makes announcement order deterministic.
use std::fmt::{self, Display};

use log::{info, trace};
use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::context::{Context, SimEvent};
use crate::define_data_plugin;
use crate::error::SimError;
use crate::{HashSet, HashSetExt};

/// Highest (and most protective) infection resistance.
pub const MAX_RESISTANCE: u8 = 100;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WardId(pub(crate) usize);

impl WardId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for WardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ward {}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PersonId(pub(crate) usize);

impl PersonId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Person {}", self.0)
    }
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, Serialize, Deserialize,
)]
pub enum Role {
    Doctor,
    Nurse,
    Outpatient,
    Inpatient,
    Emergency,
}

impl Role {
    fn roster_index(self) -> usize {
        self as usize
    }

    /// The staff category for doctors and nurses; `None` for patients.
    #[must_use]
    pub fn staff_category(self) -> Option<StaffCategory> {
        match self {
            Role::Doctor => Some(StaffCategory::Doctor),
            Role::Nurse => Some(StaffCategory::Nurse),
            Role::Outpatient | Role::Inpatient | Role::Emergency => None,
        }
    }
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, Serialize, Deserialize,
)]
pub enum StaffCategory {
    Doctor,
    Nurse,
}

impl StaffCategory {
    /// Lower-case plural used in news messages.
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            StaffCategory::Doctor => "doctors",
            StaffCategory::Nurse => "nurses",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfectionStatus {
    #[default]
    Normal,
    Infected,
    Recovered,
}

impl InfectionStatus {
    /// Anyone who is no longer `Normal` counts toward infection rates.
    #[must_use]
    pub fn is_infected(self) -> bool {
        self != InfectionStatus::Normal
    }
}

#[derive(Clone, Debug)]
pub struct Person {
    id: PersonId,
    role: Role,
    status: InfectionStatus,
    resistance: u8,
    ward: Option<WardId>,
}

impl Person {
    #[must_use]
    pub fn id(&self) -> PersonId {
        self.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn status(&self) -> InfectionStatus {
        self.status
    }

    /// 0 to 100; higher values make infection less likely.
    #[must_use]
    pub fn resistance(&self) -> u8 {
        self.resistance
    }

    /// The ward the person is in, or `None` once discharged.
    #[must_use]
    pub fn ward(&self) -> Option<WardId> {
        self.ward
    }
}

#[derive(Clone, Debug)]
pub struct Ward {
    id: WardId,
    name: String,
    rosters: [Vec<PersonId>; Role::COUNT],
    closed: bool,
    stressed_staff: HashSet<StaffCategory>,
}

impl Ward {
    fn new(id: WardId, name: String) -> Self {
        Ward {
            id,
            name,
            rosters: Default::default(),
            closed: false,
            stressed_staff: HashSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> WardId {
        self.id
    }

    /// Display name used in news messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn roster(&self, role: Role) -> &[PersonId] {
        &self.rosters[role.roster_index()]
    }

    /// Every person in the ward, role by role in `Role` order.
    pub fn members(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.rosters.iter().flatten().copied()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.rosters.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn is_staff_stressed(&self, category: StaffCategory) -> bool {
        self.stressed_staff.contains(&category)
    }

    fn roster_mut(&mut self, role: Role) -> &mut Vec<PersonId> {
        &mut self.rosters[role.roster_index()]
    }
}

/// Infected and total head counts of one scope.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WardCounts {
    pub infected: usize,
    pub total: usize,
}

impl std::ops::Add for WardCounts {
    type Output = WardCounts;

    fn add(self, other: WardCounts) -> WardCounts {
        WardCounts {
            infected: self.infected + other.infected,
            total: self.total + other.total,
        }
    }
}

impl std::iter::Sum for WardCounts {
    fn sum<I: Iterator<Item = WardCounts>>(iter: I) -> WardCounts {
        iter.fold(WardCounts::default(), |acc, counts| acc + counts)
    }
}

/// The state of one ward as of a snapshot. Names are copied, so renaming a
/// ward later does not change a snapshot already taken.
#[derive(Clone, Debug, PartialEq)]
pub struct WardSnapshot {
    pub id: WardId,
    pub name: String,
    pub counts: WardCounts,
    pub closed: bool,
    pub stressed_staff: Vec<StaffCategory>,
}

impl WardSnapshot {
    #[must_use]
    pub fn is_staff_stressed(&self, category: StaffCategory) -> bool {
        self.stressed_staff.contains(&category)
    }
}

/// Every ward, in registration order, read at a single instant.
#[derive(Clone, Debug, PartialEq)]
pub struct HospitalSnapshot {
    pub time: f64,
    pub wards: Vec<WardSnapshot>,
}

impl HospitalSnapshot {
    /// Hospital-wide counts: the sum over wards.
    #[must_use]
    pub fn total_counts(&self) -> WardCounts {
        self.wards.iter().map(|ward| ward.counts).sum()
    }
}

/// Emitted whenever a person's infection status actually changes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InfectionStatusEvent {
    pub person: PersonId,
    pub ward: Option<WardId>,
    pub role: Role,
    pub previous: InfectionStatus,
    pub current: InfectionStatus,
}

impl SimEvent for InfectionStatusEvent {}

#[derive(Default)]
struct HospitalData {
    wards: Vec<Ward>,
    people: Vec<Person>,
}

impl HospitalData {
    fn ward(&self, ward_id: WardId) -> Result<&Ward, SimError> {
        self.wards
            .get(ward_id.0)
            .ok_or(SimError::UnknownWard(ward_id))
    }

    fn ward_mut(&mut self, ward_id: WardId) -> Result<&mut Ward, SimError> {
        self.wards
            .get_mut(ward_id.0)
            .ok_or(SimError::UnknownWard(ward_id))
    }

    fn person(&self, person_id: PersonId) -> Result<&Person, SimError> {
        self.people
            .get(person_id.0)
            .ok_or(SimError::UnknownPerson(person_id))
    }

    fn person_mut(&mut self, person_id: PersonId) -> Result<&mut Person, SimError> {
        self.people
            .get_mut(person_id.0)
            .ok_or(SimError::UnknownPerson(person_id))
    }

    fn counts(&self, ward: &Ward) -> WardCounts {
        let infected = ward
            .members()
            .filter(|person_id| self.people[person_id.0].status.is_infected())
            .count();
        WardCounts {
            infected,
            total: ward.total(),
        }
    }

    fn snapshot_ward(&self, ward: &Ward) -> WardSnapshot {
        let stressed_staff = StaffCategory::iter()
            .filter(|category| ward.is_staff_stressed(*category))
            .collect();
        WardSnapshot {
            id: ward.id,
            name: ward.name.clone(),
            counts: self.counts(ward),
            closed: ward.closed,
            stressed_staff,
        }
    }
}

define_data_plugin!(HospitalPlugin, HospitalData, HospitalData::default());

pub trait ContextHospitalExt {
    /// Registers a ward. Wards are never removed.
    fn add_ward(&mut self, name: impl Into<String>) -> WardId;

    /// Admits a new person into `ward`. Resistance is clamped to
    /// `MAX_RESISTANCE`.
    ///
    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward is not registered.
    fn add_person(&mut self, ward: WardId, role: Role, resistance: u8) -> Result<PersonId, SimError>;

    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward is not registered.
    fn get_ward(&self, ward: WardId) -> Result<&Ward, SimError>;

    /// # Errors
    ///
    /// `SimError::UnknownPerson` if the person does not exist.
    fn get_person(&self, person: PersonId) -> Result<&Person, SimError>;

    /// All wards in registration order.
    fn ward_ids(&self) -> Vec<WardId>;

    fn ward_count(&self) -> usize;

    /// # Errors
    ///
    /// `SimError::UnknownWardName` if no ward has that display name.
    fn find_ward_by_name(&self, name: &str) -> Result<WardId, SimError>;

    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward is not registered.
    fn rename_ward(&mut self, ward: WardId, name: impl Into<String>) -> Result<(), SimError>;

    /// Sets the closed flag, normally on behalf of a closure policy.
    ///
    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward is not registered.
    fn set_ward_closed(&mut self, ward: WardId, closed: bool) -> Result<(), SimError>;

    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward is not registered.
    fn set_staff_stressed(
        &mut self,
        ward: WardId,
        category: StaffCategory,
        stressed: bool,
    ) -> Result<(), SimError>;

    /// Moves a person to another ward's roster for their role. A discharged
    /// person is re-admitted.
    ///
    /// # Errors
    ///
    /// `SimError::UnknownPerson` or `SimError::UnknownWard`.
    fn transfer_person(&mut self, person: PersonId, ward: WardId) -> Result<(), SimError>;

    /// Removes a person from every roster. They keep their id and status but
    /// no longer count toward any rate.
    ///
    /// # Errors
    ///
    /// `SimError::UnknownPerson` if the person does not exist.
    fn discharge_person(&mut self, person: PersonId) -> Result<(), SimError>;

    /// Changes a person's infection status and emits an
    /// `InfectionStatusEvent` if it actually changed.
    ///
    /// # Errors
    ///
    /// `SimError::UnknownPerson` if the person does not exist.
    fn set_infection_status(
        &mut self,
        person: PersonId,
        status: InfectionStatus,
    ) -> Result<(), SimError>;

    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward is not registered.
    fn get_ward_counts(&self, ward: WardId) -> Result<WardCounts, SimError>;

    /// Reads every ward at once.
    fn snapshot(&self) -> HospitalSnapshot;
}

impl ContextHospitalExt for Context {
    fn add_ward(&mut self, name: impl Into<String>) -> WardId {
        let data = self.get_data_mut(HospitalPlugin);
        let ward_id = WardId(data.wards.len());
        let name = name.into();
        trace!("registering {ward_id} as {name:?}");
        data.wards.push(Ward::new(ward_id, name));
        ward_id
    }

    fn add_person(&mut self, ward: WardId, role: Role, resistance: u8) -> Result<PersonId, SimError> {
        let data = self.get_data_mut(HospitalPlugin);
        let person_id = PersonId(data.people.len());
        data.ward_mut(ward)?.roster_mut(role).push(person_id);
        data.people.push(Person {
            id: person_id,
            role,
            status: InfectionStatus::Normal,
            resistance: resistance.min(MAX_RESISTANCE),
            ward: Some(ward),
        });
        Ok(person_id)
    }

    fn get_ward(&self, ward: WardId) -> Result<&Ward, SimError> {
        self.get_data(HospitalPlugin)
            .ok_or(SimError::UnknownWard(ward))?
            .ward(ward)
    }

    fn get_person(&self, person: PersonId) -> Result<&Person, SimError> {
        self.get_data(HospitalPlugin)
            .ok_or(SimError::UnknownPerson(person))?
            .person(person)
    }

    fn ward_ids(&self) -> Vec<WardId> {
        self.get_data(HospitalPlugin)
            .map(|data| data.wards.iter().map(Ward::id).collect())
            .unwrap_or_default()
    }

    fn ward_count(&self) -> usize {
        self.get_data(HospitalPlugin)
            .map_or(0, |data| data.wards.len())
    }

    fn find_ward_by_name(&self, name: &str) -> Result<WardId, SimError> {
        self.get_data(HospitalPlugin)
            .and_then(|data| data.wards.iter().find(|ward| ward.name == name))
            .map(Ward::id)
            .ok_or_else(|| SimError::UnknownWardName(name.to_string()))
    }

    fn rename_ward(&mut self, ward: WardId, name: impl Into<String>) -> Result<(), SimError> {
        self.get_data_mut(HospitalPlugin).ward_mut(ward)?.name = name.into();
        Ok(())
    }

    fn set_ward_closed(&mut self, ward: WardId, closed: bool) -> Result<(), SimError> {
        let entry = self.get_data_mut(HospitalPlugin).ward_mut(ward)?;
        if entry.closed != closed {
            info!(
                "{} ({}) is now {}",
                entry.name,
                ward,
                if closed { "closed" } else { "open" }
            );
            entry.closed = closed;
        }
        Ok(())
    }

    fn set_staff_stressed(
        &mut self,
        ward: WardId,
        category: StaffCategory,
        stressed: bool,
    ) -> Result<(), SimError> {
        let entry = self.get_data_mut(HospitalPlugin).ward_mut(ward)?;
        if stressed {
            entry.stressed_staff.insert(category);
        } else {
            entry.stressed_staff.remove(&category);
        }
        Ok(())
    }

    fn transfer_person(&mut self, person: PersonId, ward: WardId) -> Result<(), SimError> {
        let data = self.get_data_mut(HospitalPlugin);
        data.ward(ward)?;
        let (role, previous_ward) = {
            let entry = data.person(person)?;
            (entry.role, entry.ward)
        };
        if previous_ward == Some(ward) {
            return Ok(());
        }
        if let Some(previous_ward) = previous_ward {
            data.ward_mut(previous_ward)?
                .roster_mut(role)
                .retain(|member| *member != person);
        }
        data.ward_mut(ward)?.roster_mut(role).push(person);
        data.person_mut(person)?.ward = Some(ward);
        trace!("moved {person} from {previous_ward:?} to {ward}");
        Ok(())
    }

    fn discharge_person(&mut self, person: PersonId) -> Result<(), SimError> {
        let data = self.get_data_mut(HospitalPlugin);
        let entry = data.person_mut(person)?;
        let role = entry.role;
        if let Some(ward) = entry.ward.take() {
            data.ward_mut(ward)?
                .roster_mut(role)
                .retain(|member| *member != person);
            trace!("discharged {person} from {ward}");
        }
        Ok(())
    }

    fn set_infection_status(
        &mut self,
        person: PersonId,
        status: InfectionStatus,
    ) -> Result<(), SimError> {
        let entry = self.get_data_mut(HospitalPlugin).person_mut(person)?;
        let previous = entry.status;
        if previous == status {
            return Ok(());
        }
        entry.status = status;
        let event = InfectionStatusEvent {
            person,
            ward: entry.ward,
            role: entry.role,
            previous,
            current: status,
        };
        trace!("{person}: {previous:?} -> {status:?}");
        self.emit_event(event);
        Ok(())
    }

    fn get_ward_counts(&self, ward: WardId) -> Result<WardCounts, SimError> {
        let data = self
            .get_data(HospitalPlugin)
            .ok_or(SimError::UnknownWard(ward))?;
        Ok(data.counts(data.ward(ward)?))
    }

    fn snapshot(&self) -> HospitalSnapshot {
        let wards = self
            .get_data(HospitalPlugin)
            .map(|data| {
                data.wards
                    .iter()
                    .map(|ward| data.snapshot_ward(ward))
                    .collect()
            })
            .unwrap_or_default();
        HospitalSnapshot {
            time: self.get_current_time(),
            wards,
        }
    }
}

/// Iterates the people of every ward with their role, in registration order.
/// Used for role-partitioned scans.
pub(crate) fn for_each_rostered_person(context: &Context, mut visit: impl FnMut(Role, &Person)) {
    let Some(data) = context.get_data(HospitalPlugin) else {
        return;
    };
    for ward in &data.wards {
        for role in Role::iter() {
            for person_id in ward.roster(role) {
                visit(role, &data.people[person_id.0]);
            }
        }
    }
}

//! Infection sources lying around the wards.
//!
//! A virus is created in a ward (seeded at start, or shed by a newly
//! infected person) and stays live until a disinfection clears it.
use std::fmt::{self, Display};

use log::{info, trace};

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::SimError;
use crate::hospital::{ContextHospitalExt, WardId};
use crate::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirusId(usize);

impl Display for VirusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Virus {}", self.0)
    }
}

#[derive(Default)]
struct VirusData {
    next_id: usize,
    live_by_ward: HashMap<WardId, usize>,
}

define_data_plugin!(VirusPlugin, VirusData, VirusData::default());

pub trait ContextVirusExt {
    /// Places a live virus in `ward`.
    ///
    /// # Errors
    ///
    /// `SimError::UnknownWard` if the ward is not registered.
    fn add_virus(&mut self, ward: WardId) -> Result<VirusId, SimError>;

    /// Number of live viruses in `ward`.
    fn live_viruses_in(&self, ward: WardId) -> usize;

    /// Number of live viruses in the whole hospital.
    fn live_virus_count(&self) -> usize;

    /// Clears every live virus. Returns how many were cleared.
    fn disinfect(&mut self) -> usize;
}

impl ContextVirusExt for Context {
    fn add_virus(&mut self, ward: WardId) -> Result<VirusId, SimError> {
        self.get_ward(ward)?;
        let data = self.get_data_mut(VirusPlugin);
        let virus_id = VirusId(data.next_id);
        data.next_id += 1;
        *data.live_by_ward.entry(ward).or_insert(0) += 1;
        trace!("{virus_id} appeared in {ward}");
        Ok(virus_id)
    }

    fn live_viruses_in(&self, ward: WardId) -> usize {
        self.get_data(VirusPlugin)
            .and_then(|data| data.live_by_ward.get(&ward).copied())
            .unwrap_or(0)
    }

    fn live_virus_count(&self) -> usize {
        self.get_data(VirusPlugin)
            .map_or(0, |data| data.live_by_ward.values().sum())
    }

    fn disinfect(&mut self) -> usize {
        let cleared = self
            .get_data_mut(VirusPlugin)
            .live_by_ward
            .drain()
            .map(|(_, count)| count)
            .sum::<usize>();
        info!("disinfection cleared {cleared} viruses");
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viruses_are_counted_per_ward() {
        let mut context = Context::new();
        let a = context.add_ward("A");
        let b = context.add_ward("B");
        context.add_virus(a).unwrap();
        context.add_virus(a).unwrap();
        context.add_virus(b).unwrap();
        assert_eq!(context.live_viruses_in(a), 2);
        assert_eq!(context.live_viruses_in(b), 1);
        assert_eq!(context.live_virus_count(), 3);
    }

    #[test]
    fn unknown_ward_is_rejected() {
        let mut context = Context::new();
        assert!(matches!(
            context.add_virus(WardId(0)),
            Err(SimError::UnknownWard(_))
        ));
        assert_eq!(context.live_virus_count(), 0);
    }

    #[test]
    fn disinfect_clears_everything_once() {
        let mut context = Context::new();
        let ward = context.add_ward("A");
        context.add_virus(ward).unwrap();
        context.add_virus(ward).unwrap();
        assert_eq!(context.disinfect(), 2);
        assert_eq!(context.live_viruses_in(ward), 0);
        assert_eq!(context.disinfect(), 0);

        context.add_virus(ward).unwrap();
        assert_eq!(context.live_virus_count(), 1);
    }

    #[test]
    fn ids_stay_unique_across_disinfections() {
        let mut context = Context::new();
        let ward = context.add_ward("A");
        let first = context.add_virus(ward).unwrap();
        context.disinfect();
        let second = context.add_virus(ward).unwrap();
        assert_ne!(first, second);
        assert_eq!(second.to_string(), "Virus 1");
    }

    #[test]
    fn disinfect_on_empty_world() {
        let mut context = Context::new();
        assert_eq!(context.disinfect(), 0);
    }
}

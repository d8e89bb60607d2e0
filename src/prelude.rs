pub use crate::announcer::ContextAnnouncerExt;
pub use crate::context::{Context, SimEvent};
pub use crate::error::SimError;
pub use crate::global_properties::ContextGlobalPropertiesExt;
pub use crate::hospital::{
    ContextHospitalExt, InfectionStatus, InfectionStatusEvent, PersonId, Role, StaffCategory,
    WardId,
};
pub use crate::infection::ContextInfectionExt;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::news::{ContextNewsExt, NewsEnqueuedEvent, NewsItem};
pub use crate::parameters::{ContextParametersExt, ParametersValues};
pub use crate::plan::ExecutionPhase;
pub use crate::random::ContextRandomExt;
pub use crate::report::ContextReportExt;
pub use crate::virus::ContextVirusExt;
pub use crate::{define_data_plugin, define_global_property, define_report, define_rng};

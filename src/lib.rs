//! A discrete-event simulation of an infection outbreak in a hospital
//!
//! The central object of a `wardsim` run is the [`Context`], which keeps
//! simulated time, executes scheduled plans and event handlers, and holds
//! every module's data. Modules extend `Context` with a trait and never
//! reach for one another through globals:
//! * [`hospital`] is the ward registry: wards, people, and their roles.
//! * [`infection`] answers infection-rate questions (per ward, per role,
//!   hospital-wide) and decides whether an exposure infects someone.
//! * [`virus`] tracks the infection sources lying around the wards.
//! * [`announcer`] ticks on simulated time and turns rate changes into
//!   one-shot and re-armable news items.
//! * [`news`] is the FIFO queue the news ticker display consumes.
//! * [`policy`] optionally closes wards whose infection rate is too high.
//! * [`transmission`] drives exposures for the command-line runner.
//! * [`scenario`] builds the runner's hospital from [`parameters`] and writes
//!   CSV [`report`]s of news and infections.
//!
//! A minimal run:
//!
//! ```rust
//! use wardsim::prelude::*;
//!
//! let mut context = Context::new();
//! context.init_random(42);
//! let ward = context.add_ward("Internal Medicine");
//! let doctor = context.add_person(ward, Role::Doctor, 40).unwrap();
//! wardsim::announcer::init(&mut context).unwrap();
//!
//! context.add_plan(0.5, move |context| {
//!     context.set_infection_status(doctor, InfectionStatus::Infected).unwrap();
//! });
//! context.add_plan(2.0, Context::shutdown);
//! context.execute();
//!
//! assert!(context.news_len() > 0);
//! ```
pub mod announcer;
pub mod context;
pub mod error;
pub mod global_properties;
pub mod hashing;
pub mod hospital;
pub mod infection;
pub mod log;
pub mod news;
pub mod parameters;
pub mod plan;
pub mod policy;
pub mod prelude;
pub mod random;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod transmission;
pub mod virus;

pub use context::{Context, DataPlugin, SimEvent};
pub use error::SimError;
pub use hashing::{HashMap, HashMapExt, HashSet, HashSetExt};
pub use plan::{ExecutionPhase, PlanId};
pub use random::{ContextRandomExt, RngId};

// Re-exports used by the exported macros.
pub use csv;
pub use paste;
pub use rand;
pub use serde_json;

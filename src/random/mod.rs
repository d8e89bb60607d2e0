//! Seeded, independent random number streams.
//!
//! Every consumer of randomness declares its own stream with `define_rng!`.
//! Each stream is seeded from the base seed passed to `init_random` plus a
//! stable hash of the stream's name, so adding draws to one stream never
//! perturbs another and a run is reproducible from its seed alone.
mod context_ext;
mod macros;

use std::any::{Any, TypeId};
use std::cell::RefCell;

pub use context_ext::ContextRandomExt;

use crate::define_data_plugin;
use crate::rand::SeedableRng;
use crate::{HashMap, HashMapExt};

pub trait RngId: Copy + Clone + Any {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

// Type-erased so that any `SeedableRng` can back a stream.
struct RngHolder {
    rng: Box<dyn Any>,
}

struct RngData {
    base_seed: u64,
    // Behind a `RefCell` so streams can be drawn from a shared `&Context`.
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        rng_holders: RefCell::new(HashMap::new()),
    }
);

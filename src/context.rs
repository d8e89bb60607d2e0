//! The simulation `Context`.
//!
//! A `Context` owns everything a run needs: simulated time, the queue of
//! future plans, the queue of immediate callbacks, the typed event bus, and
//! the module data containers ("data plugins"). Modules never look each other
//! up by name; they extend `Context` with a trait and keep their state in a
//! plugin, so the lifetime of every piece of state is the lifetime of the run.
use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::rc::Rc;

use log::trace;

use crate::plan::{ExecutionPhase, PlanId, PlanQueue};
use crate::{HashMap, HashMapExt};

/// A trait for objects that can provide data containers to be held by `Context`
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new type for storing data in Context.
#[macro_export]
macro_rules! define_data_plugin {
    ($plugin:ident, $data_container:ty, $default: expr) => {
        struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

/// Marker trait for values that can be sent through the event bus.
pub trait SimEvent: Clone + 'static {}

type Callback = dyn FnOnce(&mut Context);
type EventHandler<E> = dyn Fn(&mut Context, E);

struct ScheduledPlan {
    callback: Box<Callback>,
    periodic: bool,
}

pub struct Context {
    plan_queue: PlanQueue<ScheduledPlan>,
    periodic_plan_count: usize,
    callback_queue: VecDeque<Box<Callback>>,
    event_handlers: HashMap<TypeId, Box<dyn Any>>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: PlanQueue::new(),
            periodic_plan_count: 0,
            callback_queue: VecDeque::new(),
            event_handlers: HashMap::new(),
            data_plugins: HashMap::new(),
            current_time: 0.0,
            shutdown_requested: false,
        }
    }

    /// Schedules `callback` to run at `time` in the `Normal` phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan(&mut self, time: f64, callback: impl FnOnce(&mut Context) + 'static) -> PlanId {
        self.add_plan_with_phase(time, callback, ExecutionPhase::Normal)
    }

    /// Schedules `callback` to run at `time` in the given phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) -> PlanId {
        self.schedule(time, Box::new(callback), phase, false)
    }

    fn schedule(
        &mut self,
        time: f64,
        callback: Box<Callback>,
        phase: ExecutionPhase,
        periodic: bool,
    ) -> PlanId {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Invalid time value: {time}"
        );
        if periodic {
            self.periodic_plan_count += 1;
        }
        self.plan_queue
            .add_plan(time, ScheduledPlan { callback, periodic }, phase)
    }

    /// Whether any plan other than a periodic one is still queued.
    fn has_one_shot_plans(&self) -> bool {
        self.plan_queue.remaining_plan_count() > self.periodic_plan_count
    }

    /// Runs `callback` every `period` time units, first at
    /// `current_time + period`.
    ///
    /// Periodic plans do not keep the simulation alive: one is only
    /// rescheduled while a non-periodic plan remains in the queue, so two
    /// periodic plans cannot keep each other running.
    ///
    /// # Panics
    ///
    /// Panics if `period` is not a positive, finite number.
    pub fn add_periodic_plan_with_phase(
        &mut self,
        period: f64,
        callback: impl Fn(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) {
        assert!(
            period > 0.0 && period.is_finite(),
            "Period must be greater than 0: {period}"
        );
        let callback: Rc<dyn Fn(&mut Context)> = Rc::new(callback);
        let first_time = self.current_time + period;
        self.schedule_periodic(first_time, period, callback, phase);
    }

    fn schedule_periodic(
        &mut self,
        time: f64,
        period: f64,
        callback: Rc<dyn Fn(&mut Context)>,
        phase: ExecutionPhase,
    ) {
        self.schedule(
            time,
            Box::new(move |context: &mut Context| {
                callback(context);
                if context.has_one_shot_plans() {
                    let next_time = context.current_time + period;
                    context.schedule_periodic(next_time, period, callback, phase);
                }
            }),
            phase,
            true,
        );
    }

    /// Cancels a plan. Returns `false` if it already ran or was cancelled.
    pub fn cancel_plan(&mut self, id: PlanId) -> bool {
        match self.plan_queue.cancel_plan(id) {
            Some(plan) => {
                if plan.periodic {
                    self.periodic_plan_count -= 1;
                }
                true
            }
            None => false,
        }
    }

    /// Runs `callback` before the next plan, at the current time.
    pub fn queue_callback(&mut self, callback: impl FnOnce(&mut Context) + 'static) {
        self.callback_queue.push_back(Box::new(callback));
    }

    /// Registers `handler` for events of type `E`. Handlers run as queued
    /// callbacks, in the order they were subscribed.
    pub fn subscribe_to_event<E: SimEvent>(&mut self, handler: impl Fn(&mut Context, E) + 'static) {
        let handlers = self
            .event_handlers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<Rc<EventHandler<E>>>::new()));
        if let Some(handlers) = handlers.downcast_mut::<Vec<Rc<EventHandler<E>>>>() {
            handlers.push(Rc::new(handler));
        }
    }

    /// Queues a callback for every handler subscribed to `E`.
    pub fn emit_event<E: SimEvent>(&mut self, event: E) {
        let Some(handlers) = self
            .event_handlers
            .get(&TypeId::of::<E>())
            .and_then(|handlers| handlers.downcast_ref::<Vec<Rc<EventHandler<E>>>>())
        else {
            return;
        };
        let handlers = handlers.clone();
        for handler in handlers {
            let event = event.clone();
            self.queue_callback(move |context| handler(context, event));
        }
    }

    fn add_plugin<T: DataPlugin>(&mut self) {
        self.data_plugins
            .insert(TypeId::of::<T>(), Box::new(T::create_data_container()));
    }

    /// Returns the data container for `T`, creating it on first use.
    ///
    /// # Panics
    ///
    /// Panics if the stored container is not a `T::DataContainer`, which can
    /// only happen if two plugins share a `TypeId`.
    pub fn get_data_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        let type_id = TypeId::of::<T>();
        if !self.data_plugins.contains_key(&type_id) {
            self.add_plugin::<T>();
        }
        self.data_plugins
            .get_mut(&type_id)
            .and_then(|container| container.downcast_mut::<T::DataContainer>())
            .expect("data plugin holds the wrong container type")
    }

    /// Returns the data container for `T`, or `None` if nothing has created
    /// it yet.
    #[must_use]
    pub fn get_data<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Stops the simulation after the current callback returns. Pending
    /// plans and callbacks are discarded.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested at t={}", self.current_time);
        self.shutdown_requested = true;
    }

    /// Runs callbacks and plans until both queues are empty or `shutdown`
    /// is called.
    pub fn execute(&mut self) {
        trace!("entering event loop");
        loop {
            if self.shutdown_requested {
                self.plan_queue.clear();
                self.periodic_plan_count = 0;
                self.callback_queue.clear();
                break;
            }

            // Callbacks always run before the next plan.
            if let Some(callback) = self.callback_queue.pop_front() {
                callback(self);
                continue;
            }

            if let Some(plan) = self.plan_queue.get_next_plan() {
                self.current_time = plan.time;
                if plan.data.periodic {
                    self.periodic_plan_count -= 1;
                }
                (plan.data.callback)(self);
            } else {
                break;
            }
        }
        trace!("event loop finished at t={}", self.current_time);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

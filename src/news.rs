//! The news queue: announcements waiting for the ticker display.
//!
//! One producer (the announcer, or any caller of `enqueue_news`) and one
//! consumer (the display). Items come out in the order they went in and are
//! never changed after being queued.
use std::collections::VecDeque;

use log::{debug, info};
use serde::Serialize;

use crate::context::{Context, SimEvent};
use crate::define_data_plugin;
use crate::parameters::ContextParametersExt;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewsItem {
    /// Simulated time the item was queued.
    pub time: f64,
    pub message: String,
    /// How long the display should show the item, if it cares.
    pub lifetime: Option<f64>,
}

/// Emitted for every item put on the queue, including ones later dropped
/// for capacity.
#[derive(Clone, Debug, PartialEq)]
pub struct NewsEnqueuedEvent {
    pub item: NewsItem,
}

impl SimEvent for NewsEnqueuedEvent {}

#[derive(Default)]
struct NewsData {
    queue: VecDeque<NewsItem>,
    dropped: usize,
}

define_data_plugin!(NewsPlugin, NewsData, NewsData::default());

pub trait ContextNewsExt {
    /// Appends a message stamped with the current time and the configured
    /// lifetime. If a capacity is configured and the queue is full, the
    /// oldest item is dropped.
    fn enqueue_news(&mut self, message: impl Into<String>);

    /// Takes the oldest item.
    fn pop_news(&mut self) -> Option<NewsItem>;

    /// Takes every queued item, oldest first.
    fn drain_news(&mut self) -> Vec<NewsItem>;

    fn peek_news(&self) -> Option<&NewsItem>;

    fn news_len(&self) -> usize;

    /// Number of items dropped for capacity so far.
    fn dropped_news_count(&self) -> usize;
}

impl ContextNewsExt for Context {
    fn enqueue_news(&mut self, message: impl Into<String>) {
        let parameters = self.get_parameters();
        let capacity = parameters.news_capacity;
        let item = NewsItem {
            time: self.get_current_time(),
            message: message.into(),
            lifetime: parameters.news_lifetime,
        };
        info!("news: {}", item.message);

        let data = self.get_data_mut(NewsPlugin);
        data.queue.push_back(item.clone());
        if let Some(capacity) = capacity {
            while data.queue.len() > capacity {
                if let Some(oldest) = data.queue.pop_front() {
                    data.dropped += 1;
                    debug!("news queue full; dropped {:?}", oldest.message);
                }
            }
        }
        self.emit_event(NewsEnqueuedEvent { item });
    }

    fn pop_news(&mut self) -> Option<NewsItem> {
        self.get_data_mut(NewsPlugin).queue.pop_front()
    }

    fn drain_news(&mut self) -> Vec<NewsItem> {
        self.get_data_mut(NewsPlugin).queue.drain(..).collect()
    }

    fn peek_news(&self) -> Option<&NewsItem> {
        self.get_data(NewsPlugin)?.queue.front()
    }

    fn news_len(&self) -> usize {
        self.get_data(NewsPlugin).map_or(0, |data| data.queue.len())
    }

    fn dropped_news_count(&self) -> usize {
        self.get_data(NewsPlugin).map_or(0, |data| data.dropped)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::parameters::ParametersValues;

    #[test]
    fn queue_is_fifo() {
        let mut context = Context::new();
        assert!(context.peek_news().is_none());
        context.enqueue_news("one");
        context.enqueue_news("two".to_string());
        assert_eq!(context.news_len(), 2);
        assert_eq!(context.peek_news().unwrap().message, "one");
        assert_eq!(context.pop_news().unwrap().message, "one");
        assert_eq!(context.pop_news().unwrap().message, "two");
        assert!(context.pop_news().is_none());
    }

    #[test]
    fn items_carry_time_and_lifetime() {
        let mut context = Context::new();
        context
            .set_parameters(ParametersValues {
                news_lifetime: Some(5.0),
                ..ParametersValues::default()
            })
            .unwrap();
        context.add_plan(3.0, |context| context.enqueue_news("late"));
        context.execute();
        let item = context.pop_news().unwrap();
        assert_eq!(item.time, 3.0);
        assert_eq!(item.lifetime, Some(5.0));
    }

    #[test]
    fn drain_empties_in_order() {
        let mut context = Context::new();
        for message in ["a", "b", "c"] {
            context.enqueue_news(message);
        }
        let messages: Vec<String> = context
            .drain_news()
            .into_iter()
            .map(|item| item.message)
            .collect();
        assert_eq!(messages, vec!["a", "b", "c"]);
        assert_eq!(context.news_len(), 0);
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut context = Context::new();
        context
            .set_parameters(ParametersValues {
                news_capacity: Some(2),
                ..ParametersValues::default()
            })
            .unwrap();
        for message in ["a", "b", "c"] {
            context.enqueue_news(message);
        }
        assert_eq!(context.news_len(), 2);
        assert_eq!(context.dropped_news_count(), 1);
        assert_eq!(context.pop_news().unwrap().message, "b");
    }

    #[test]
    fn enqueue_emits_event() {
        let mut context = Context::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        context.subscribe_to_event(move |_, event: NewsEnqueuedEvent| {
            sink.borrow_mut().push(event.item.message);
        });
        context.enqueue_news("hello");
        context.execute();
        assert_eq!(*seen.borrow(), vec!["hello".to_string()]);
    }
}

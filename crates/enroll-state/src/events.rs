//! # Machine Events
//!
//! Synchronous publish/subscribe for [`RegistrationMachine`] events.
//!
//! ## Dispatch rules
//!
//! - One [`Topic`] per event kind. Listeners run in subscription order.
//! - Dispatch is synchronous and depth-first: every listener has returned
//!   before the emitting machine method returns.
//! - Listeners receive `&mut RegistrationMachine` and may call back into it.
//!   Events raised by such calls are dispatched immediately (nested) to every
//!   listener, including the one whose call raised them. Listeners are `Fn`;
//!   state they keep lives in their own `Cell` or `RefCell`.
//! - [`EventBus::subscribe`] returns a [`Subscription`] handle; pass it to
//!   [`EventBus::unsubscribe`]. A listener removed during a dispatch pass is
//!   not called for the remainder of that pass.
//!
//! Storage is `Rc<…>`: the machine is single-threaded.

use std::collections::HashMap;
use std::rc::Rc;

use enroll_core::{RegistrationId, SubjectId};

use crate::machine::RegistrationMachine;
use crate::registration::{ConfigKey, FormData, Registration, RegistrationConfig, Schedule};
use crate::state::RegistrationState;

/// Event kinds a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    StateChange,
    ActiveSubjectChange,
    ConfigChange,
    ScheduleChange,
    FormDataChange,
    RegistrationSubmitted,
}

/// An event emitted by the registration machine.
#[derive(Debug, Clone)]
pub enum MachineEvent {
    /// A registration changed lifecycle state.
    StateChange {
        registration_id: RegistrationId,
        from: RegistrationState,
        to: RegistrationState,
        /// Snapshot after the change.
        registration: Box<Registration>,
    },
    /// The active registration changed. Both fields are `None` when the
    /// selection was cleared.
    ActiveSubjectChange {
        subject_id: Option<SubjectId>,
        registration_id: Option<RegistrationId>,
    },
    /// A configuration field changed. `key` is `None` for a full reset.
    ConfigChange {
        subject_id: SubjectId,
        registration_id: RegistrationId,
        key: Option<ConfigKey>,
        value: String,
        config: RegistrationConfig,
    },
    /// A timeslot was assigned.
    ScheduleChange {
        subject_id: SubjectId,
        registration_id: RegistrationId,
        schedule: Schedule,
    },
    /// Personal details were attached.
    FormDataChange {
        subject_id: SubjectId,
        registration_id: RegistrationId,
        form_data: FormData,
    },
    /// A registration completed local submission and awaits review.
    RegistrationSubmitted {
        subject_id: SubjectId,
        registration_id: RegistrationId,
        registration: Box<Registration>,
    },
}

impl MachineEvent {
    /// The topic this event is published on.
    pub fn topic(&self) -> Topic {
        match self {
            Self::StateChange { .. } => Topic::StateChange,
            Self::ActiveSubjectChange { .. } => Topic::ActiveSubjectChange,
            Self::ConfigChange { .. } => Topic::ConfigChange,
            Self::ScheduleChange { .. } => Topic::ScheduleChange,
            Self::FormDataChange { .. } => Topic::FormDataChange,
            Self::RegistrationSubmitted { .. } => Topic::RegistrationSubmitted,
        }
    }
}

/// Listener callback.
pub type Listener = dyn Fn(&mut RegistrationMachine, &MachineEvent);

pub(crate) type SharedListener = Rc<Listener>;

/// Handle returned by [`EventBus::subscribe`].
#[must_use = "dropping a Subscription makes the listener impossible to remove"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    topic: Topic,
    id: u64,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

/// Listener registry, keyed by topic.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    topics: HashMap<Topic, Vec<(u64, SharedListener)>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&Topic, usize> = self.topics.iter().map(|(t, l)| (t, l.len())).collect();
        f.debug_struct("EventBus")
            .field("next_id", &self.next_id)
            .field("listeners", &counts)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` on `topic`.
    pub fn subscribe<F>(&mut self, topic: Topic, listener: F) -> Subscription
    where
        F: Fn(&mut RegistrationMachine, &MachineEvent) + 'static,
    {
        self.next_id += 1;
        let id = self.next_id;
        let shared: SharedListener = Rc::new(listener);
        self.topics.entry(topic).or_default().push((id, shared));
        Subscription { topic, id }
    }

    /// Remove a listener. Returns `false` if it was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let Some(listeners) = self.topics.get_mut(&subscription.topic) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != subscription.id);
        before != listeners.len()
    }

    /// Number of listeners on `topic`.
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.topics.get(&topic).map_or(0, Vec::len)
    }

    pub(crate) fn snapshot(&self, topic: Topic) -> Vec<(u64, SharedListener)> {
        self.topics.get(&topic).cloned().unwrap_or_default()
    }

    pub(crate) fn is_subscribed(&self, topic: Topic, id: u64) -> bool {
        self.topics
            .get(&topic)
            .is_some_and(|listeners| listeners.iter().any(|(lid, _)| *lid == id))
    }
}

//! # Registration Machine
//!
//! The sole mutator of registration state. Owns the subject catalog, the
//! registration record store, the active-registration pointer, and the event
//! bus.
//!
//! ## Transitions
//!
//! [`RegistrationMachine::transition`] validates every request against the
//! transition table in [`RegistrationState::valid_transitions`].
//!
//! [`RegistrationMachine::apply_override`] is the administrative override
//! used for status resynchronisation: while a registration is in flight
//! (`draft`, `schedule_selected` or `pending`) it accepts any target state.
//! From any other state it falls back to the table. Nothing leaves
//! `accepted` on either path.
//!
//! ## Abandoned drafts
//!
//! Switching to another subject, or clearing the selection, discards the
//! previously active registration if it is still a draft. Registrations that
//! reached `schedule_selected` are kept.
//!
//! ## Failure signalling
//!
//! Every fallible operation returns `Result<_, RegistrationError>`. A failed
//! call changes nothing and emits no event.

use chrono::Utc;
use thiserror::Error;

use enroll_core::{RegistrationId, SubjectId, Timestamp};

use crate::catalog::{Subject, SubjectCatalog};
use crate::events::{EventBus, MachineEvent, Subscription, Topic};
use crate::registration::{ConfigKey, FormData, Registration, Schedule, TransitionRecord};
use crate::state::{RegistrationState, SubjectStatus};

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from registration machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// No registration with this identifier is in the store.
    #[error("registration {0} not found")]
    NotFound(RegistrationId),

    /// The subject is not in the catalog.
    #[error("unknown subject {0}")]
    UnknownSubject(SubjectId),

    /// The operation needs an active registration and there is none.
    #[error("no active registration")]
    NoActiveRegistration,

    /// The transition table has no such edge.
    #[error("invalid registration transition: {from} -> {to}")]
    InvalidTransition {
        from: RegistrationState,
        to: RegistrationState,
    },

    /// The registration is in a terminal state.
    #[error("registration is in terminal state {state}")]
    TerminalState { state: RegistrationState },

    /// Submission requires a selected schedule.
    #[error("registration cannot be submitted from state {state}")]
    NotReadyForSubmission { state: RegistrationState },
}

// ─── Active subject view ─────────────────────────────────────────────

/// The active registration, addressed by its subject.
#[derive(Debug, Clone, Copy)]
pub struct ActiveSubject<'a> {
    /// The subject identifier (not the registration identifier).
    pub id: &'a SubjectId,
    pub registration: &'a Registration,
}

// ─── Machine ─────────────────────────────────────────────────────────

/// Registration store plus lifecycle rules.
#[derive(Debug, Default)]
pub struct RegistrationMachine {
    catalog: SubjectCatalog,
    registrations: Vec<Registration>,
    active: Option<RegistrationId>,
    counter: u64,
    events: EventBus,
}

impl RegistrationMachine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Catalog ──────────────────────────────────────────────────────

    /// Replace the subject catalog. Existing registrations are untouched.
    pub fn load_subjects(&mut self, subjects: Vec<Subject>) {
        self.catalog.load(subjects);
    }

    pub fn get_subject(&self, id: &SubjectId) -> Option<&Subject> {
        self.catalog.get(id)
    }

    pub fn catalog(&self) -> &SubjectCatalog {
        &self.catalog
    }

    // ── Store queries ────────────────────────────────────────────────

    pub fn get_registration(&self, id: &RegistrationId) -> Option<&Registration> {
        self.registrations.iter().find(|r| &r.id == id)
    }

    /// All registrations, in insertion order.
    pub fn all_registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn get_registrations_for_subject(&self, subject_id: &SubjectId) -> Vec<&Registration> {
        self.registrations
            .iter()
            .filter(|r| &r.subject_id == subject_id)
            .collect()
    }

    pub fn registration_count_for_subject(&self, subject_id: &SubjectId) -> u32 {
        let count = self
            .registrations
            .iter()
            .filter(|r| &r.subject_id == subject_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Registrations currently in `state`, in insertion order.
    pub fn get_subjects_by_state(&self, state: RegistrationState) -> Vec<&Registration> {
        self.registrations.iter().filter(|r| r.state == state).collect()
    }

    pub fn active_registration_id(&self) -> Option<&RegistrationId> {
        self.active.as_ref()
    }

    pub fn active_registration(&self) -> Option<&Registration> {
        self.active.as_ref().and_then(|id| self.get_registration(id))
    }

    /// The active registration reshaped so that `id` is the subject.
    pub fn get_active_subject(&self) -> Option<ActiveSubject<'_>> {
        self.active_registration().map(|registration| ActiveSubject {
            id: &registration.subject_id,
            registration,
        })
    }

    /// Sidebar status for a subject.
    pub fn subject_status(&self, subject_id: &SubjectId) -> SubjectStatus {
        match self.active_registration() {
            Some(reg) if &reg.subject_id == subject_id => SubjectStatus::Active(reg.state),
            _ => SubjectStatus::Available,
        }
    }

    // ── Creation and selection ───────────────────────────────────────

    /// Create a draft registration for `subject_id` without activating it.
    pub fn create_registration(
        &mut self,
        subject_id: &SubjectId,
    ) -> Result<RegistrationId, RegistrationError> {
        let subject = self
            .catalog
            .get(subject_id)
            .cloned()
            .ok_or_else(|| RegistrationError::UnknownSubject(subject_id.clone()))?;

        self.counter += 1;
        let id = RegistrationId::compose(subject_id, self.counter, Utc::now().timestamp_millis());
        let number = self.registration_count_for_subject(subject_id) + 1;
        self.registrations
            .push(Registration::new_draft(id.clone(), &subject, number));

        tracing::debug!(registration_id = %id, subject_id = %subject_id, number, "registration created");
        Ok(id)
    }

    /// Make a new draft for `subject_id` the active registration, or clear
    /// the selection when `None`. A previously active draft is discarded.
    ///
    /// An unknown subject is rejected before anything changes.
    pub fn set_active_subject(
        &mut self,
        subject_id: Option<&SubjectId>,
    ) -> Result<Option<RegistrationId>, RegistrationError> {
        if let Some(sid) = subject_id {
            if self.catalog.get(sid).is_none() {
                return Err(RegistrationError::UnknownSubject(sid.clone()));
            }
        }

        self.discard_abandoned_draft();

        let registration_id = match subject_id {
            Some(sid) => Some(self.create_registration(sid)?),
            None => None,
        };
        self.active = registration_id.clone();

        self.emit(MachineEvent::ActiveSubjectChange {
            subject_id: subject_id.cloned(),
            registration_id: registration_id.clone(),
        });
        Ok(registration_id)
    }

    fn discard_abandoned_draft(&mut self) {
        let Some(previous) = self.active.take() else {
            return;
        };
        if self
            .get_registration(&previous)
            .is_some_and(Registration::is_discardable)
        {
            self.registrations.retain(|r| r.id != previous);
            tracing::debug!(registration_id = %previous, "discarded abandoned draft");
        }
    }

    // ── Editing the active registration ──────────────────────────────

    pub fn update_config(
        &mut self,
        key: ConfigKey,
        value: impl Into<String>,
    ) -> Result<(), RegistrationError> {
        let idx = self.active_index()?;
        let value = value.into();
        let reg = &mut self.registrations[idx];
        reg.config.set(key, value.clone());

        let event = MachineEvent::ConfigChange {
            subject_id: reg.subject_id.clone(),
            registration_id: reg.id.clone(),
            key: Some(key),
            value,
            config: reg.config.clone(),
        };
        self.emit(event);
        Ok(())
    }

    /// True only when the active registration has all four fields set.
    pub fn is_config_complete(&self) -> bool {
        self.active_registration()
            .is_some_and(|r| r.config.is_complete())
    }

    /// Assign a schedule, overwriting any previous one. A draft advances to
    /// `schedule_selected`.
    pub fn set_schedule(&mut self, schedule: Schedule) -> Result<(), RegistrationError> {
        let idx = self.active_index()?;
        let reg = &mut self.registrations[idx];
        reg.schedule = Some(schedule.clone());
        let registration_id = reg.id.clone();
        let subject_id = reg.subject_id.clone();

        if reg.state == RegistrationState::Draft {
            self.transition(&registration_id, RegistrationState::ScheduleSelected)?;
        }

        self.emit(MachineEvent::ScheduleChange {
            subject_id,
            registration_id,
            schedule,
        });
        Ok(())
    }

    /// Return the active registration to `draft` so a different slot can be
    /// chosen. The current schedule stays until it is overwritten.
    pub fn request_different_slot(&mut self) -> Result<(), RegistrationError> {
        let idx = self.active_index()?;
        let id = self.registrations[idx].id.clone();
        self.transition(&id, RegistrationState::Draft)
    }

    pub fn set_form_data(&mut self, form_data: FormData) -> Result<(), RegistrationError> {
        let idx = self.active_index()?;
        let reg = &mut self.registrations[idx];
        reg.form_data = Some(form_data.clone());

        let event = MachineEvent::FormDataChange {
            subject_id: reg.subject_id.clone(),
            registration_id: reg.id.clone(),
            form_data,
        };
        self.emit(event);
        Ok(())
    }

    /// Clear configuration, schedule and form data of the active
    /// registration. A registration in `schedule_selected` returns to
    /// `draft`.
    pub fn reset_config(&mut self) -> Result<(), RegistrationError> {
        let idx = self.active_index()?;
        let reg = &mut self.registrations[idx];
        reg.config = Default::default();
        reg.schedule = None;
        reg.form_data = None;
        let registration_id = reg.id.clone();
        let subject_id = reg.subject_id.clone();
        let state = reg.state;

        if state == RegistrationState::ScheduleSelected {
            self.transition(&registration_id, RegistrationState::Draft)?;
        }

        self.emit(MachineEvent::ConfigChange {
            subject_id,
            registration_id,
            key: None,
            value: String::new(),
            config: Default::default(),
        });
        Ok(())
    }

    /// Submit the active registration: `schedule_selected → submitted →
    /// pending`, then clear the active pointer.
    ///
    /// Fails without side effects unless the active registration is in
    /// `schedule_selected`.
    pub fn submit_registration(&mut self) -> Result<Registration, RegistrationError> {
        let idx = self.active_index()?;
        let state = self.registrations[idx].state;
        if state != RegistrationState::ScheduleSelected {
            tracing::debug!(%state, "submission refused");
            return Err(RegistrationError::NotReadyForSubmission { state });
        }
        let id = self.registrations[idx].id.clone();

        self.transition(&id, RegistrationState::Submitted)?;
        self.transition(&id, RegistrationState::Pending)?;
        if self.active.as_ref() == Some(&id) {
            self.active = None;
        }

        let snapshot = self.require(&id)?.clone();
        tracing::info!(registration_id = %id, subject_id = %snapshot.subject_id, "registration submitted");
        self.emit(MachineEvent::RegistrationSubmitted {
            subject_id: snapshot.subject_id.clone(),
            registration_id: id,
            registration: Box::new(snapshot.clone()),
        });
        Ok(snapshot)
    }

    // ── Transitions ──────────────────────────────────────────────────

    pub fn can_transition(&self, id: &RegistrationId, to: RegistrationState) -> bool {
        self.get_registration(id)
            .is_some_and(|r| r.state.can_transition_to(to))
    }

    /// Move a registration along a legal edge.
    pub fn transition(
        &mut self,
        id: &RegistrationId,
        to: RegistrationState,
    ) -> Result<(), RegistrationError> {
        let from = self.require(id)?.state;
        if from.is_terminal() {
            tracing::warn!(registration_id = %id, %from, %to, "transition out of terminal state refused");
            return Err(RegistrationError::TerminalState { state: from });
        }
        if !from.can_transition_to(to) {
            tracing::warn!(registration_id = %id, %from, %to, "invalid transition refused");
            return Err(RegistrationError::InvalidTransition { from, to });
        }
        self.commit_transition(id, to, false);
        Ok(())
    }

    /// Administrative override: any target is accepted while the
    /// registration is in flight; otherwise the transition table applies.
    pub fn apply_override(
        &mut self,
        id: &RegistrationId,
        to: RegistrationState,
    ) -> Result<(), RegistrationError> {
        let from = self.require(id)?.state;
        if !from.is_in_flight() {
            return self.transition(id, to);
        }
        if !from.can_transition_to(to) {
            tracing::info!(registration_id = %id, %from, %to, "applying state override outside the transition table");
        }
        self.commit_transition(id, to, true);
        Ok(())
    }

    fn commit_transition(&mut self, id: &RegistrationId, to: RegistrationState, via_override: bool) {
        let Some(reg) = self.registrations.iter_mut().find(|r| &r.id == id) else {
            return;
        };
        let from = reg.state;
        let now = Timestamp::now();
        reg.state = to;
        if to == RegistrationState::Submitted {
            reg.timestamp = Some(now);
        }
        reg.transitions.push(TransitionRecord {
            from,
            to,
            timestamp: now,
            via_override,
        });
        let snapshot = Box::new(reg.clone());

        tracing::debug!(registration_id = %id, %from, %to, via_override, "state transition");
        self.emit(MachineEvent::StateChange {
            registration_id: id.clone(),
            from,
            to,
            registration: snapshot,
        });
    }

    // ── Server bookkeeping ───────────────────────────────────────────

    /// Record the identifier issued by the submission service.
    pub fn attach_server_id(
        &mut self,
        id: &RegistrationId,
        server_id: RegistrationId,
    ) -> Result<(), RegistrationError> {
        let reg = self
            .registrations
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| RegistrationError::NotFound(id.clone()))?;
        reg.server_id = Some(server_id);
        Ok(())
    }

    /// Insert a fully formed registration restored from history, bypassing
    /// the creation counter. An existing record with the same identifier is
    /// replaced and returned.
    pub fn insert_rehydrated(&mut self, registration: Registration) -> Option<Registration> {
        match self.registrations.iter_mut().find(|r| r.id == registration.id) {
            Some(existing) => Some(std::mem::replace(existing, registration)),
            None => {
                self.registrations.push(registration);
                None
            }
        }
    }

    /// Remove a registration from the store.
    pub fn remove_registration(&mut self, id: &RegistrationId) -> Option<Registration> {
        let idx = self.registrations.iter().position(|r| &r.id == id)?;
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        Some(self.registrations.remove(idx))
    }

    // ── Events ───────────────────────────────────────────────────────

    pub fn subscribe<F>(&mut self, topic: Topic, listener: F) -> Subscription
    where
        F: Fn(&mut RegistrationMachine, &MachineEvent) + 'static,
    {
        self.events.subscribe(topic, listener)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.events.unsubscribe(subscription)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn emit(&mut self, event: MachineEvent) {
        let topic = event.topic();
        for (listener_id, listener) in self.events.snapshot(topic) {
            if !self.events.is_subscribed(topic, listener_id) {
                continue;
            }
            listener(self, &event);
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn require(&self, id: &RegistrationId) -> Result<&Registration, RegistrationError> {
        self.get_registration(id)
            .ok_or_else(|| RegistrationError::NotFound(id.clone()))
    }

    fn active_index(&self) -> Result<usize, RegistrationError> {
        let id = self
            .active
            .as_ref()
            .ok_or(RegistrationError::NoActiveRegistration)?;
        self.registrations
            .iter()
            .position(|r| &r.id == id)
            .ok_or(RegistrationError::NoActiveRegistration)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn sid(raw: &str) -> SubjectId {
        SubjectId::new(raw).unwrap()
    }

    fn machine() -> RegistrationMachine {
        let mut m = RegistrationMachine::new();
        m.load_subjects(
            ["Math", "Physics", "Chemistry"]
                .iter()
                .enumerate()
                .map(|(i, name)| Subject::from_listing(sid(name), name, i, &[]))
                .collect(),
        );
        m
    }

    fn schedule(day: &str, start: &str) -> Schedule {
        Schedule {
            day: day.into(),
            time: "8-10 AM".into(),
            start_time: start.into(),
            end_time: "10:00".into(),
            teacher: "Dr. Ahmed".into(),
            group_name: Some("A1".into()),
            timeslot_id: None,
        }
    }

    fn complete_config(m: &mut RegistrationMachine) {
        m.update_config(ConfigKey::GroupType, "group").unwrap();
        m.update_config(ConfigKey::GroupLevel, "beginner").unwrap();
        m.update_config(ConfigKey::EducationType, "national").unwrap();
        m.update_config(ConfigKey::Grade, "G10").unwrap();
    }

    fn form() -> FormData {
        FormData::new("Omar Ali", "omar@example.com", "0123", "G10", None).unwrap()
    }

    // ── Creation ─────────────────────────────────────────────────────

    #[test]
    fn test_first_registration_is_number_one() {
        let mut m = machine();
        let id = m.create_registration(&sid("Math")).unwrap();
        let reg = m.get_registration(&id).unwrap();
        assert_eq!(reg.registration_number, 1);
        assert_eq!(reg.state, RegistrationState::Draft);
        assert!(reg.schedule.is_none());
        assert!(reg.form_data.is_none());
        assert!(reg.config == Default::default());
    }

    #[test]
    fn test_registration_numbers_are_per_subject() {
        let mut m = machine();
        m.create_registration(&sid("Physics")).unwrap();
        m.create_registration(&sid("Math")).unwrap();
        let second_physics = m.create_registration(&sid("Physics")).unwrap();
        let first_math = &m.get_registrations_for_subject(&sid("Math"))[0];
        assert_eq!(first_math.registration_number, 1);
        assert_eq!(m.get_registration(&second_physics).unwrap().registration_number, 2);
    }

    #[test]
    fn test_registration_number_is_fixed_after_removal() {
        let mut m = machine();
        let first = m.create_registration(&sid("Math")).unwrap();
        let second = m.create_registration(&sid("Math")).unwrap();
        m.remove_registration(&first);
        assert_eq!(m.get_registration(&second).unwrap().registration_number, 2);
    }

    #[test]
    fn test_repeated_selection_gives_unique_ids() {
        let mut m = machine();
        let a = m.create_registration(&sid("Math")).unwrap();
        let b = m.create_registration(&sid("Math")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_subject_is_rejected() {
        let mut m = machine();
        assert_eq!(
            m.create_registration(&sid("Latin")),
            Err(RegistrationError::UnknownSubject(sid("Latin")))
        );
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        let before = m.active_registration_id().cloned();
        assert!(m.set_active_subject(Some(&sid("Latin"))).is_err());
        assert_eq!(m.active_registration_id().cloned(), before);
    }

    // ── Active subject ───────────────────────────────────────────────

    #[test]
    fn test_switching_subject_discards_draft() {
        let mut m = machine();
        let a = m.set_active_subject(Some(&sid("Math"))).unwrap().unwrap();
        m.set_active_subject(Some(&sid("Physics"))).unwrap();
        assert!(m.get_registration(&a).is_none());
        assert_eq!(m.all_registrations().len(), 1);
    }

    #[test]
    fn test_switching_subject_keeps_scheduled_registration() {
        let mut m = machine();
        let a = m.set_active_subject(Some(&sid("Math"))).unwrap().unwrap();
        m.set_schedule(schedule("Sat", "08:00")).unwrap();
        m.set_active_subject(Some(&sid("Physics"))).unwrap();
        assert_eq!(
            m.get_registration(&a).unwrap().state,
            RegistrationState::ScheduleSelected
        );
    }

    #[test]
    fn test_clearing_selection_discards_draft() {
        let mut m = machine();
        let a = m.set_active_subject(Some(&sid("Math"))).unwrap().unwrap();
        assert_eq!(m.set_active_subject(None).unwrap(), None);
        assert!(m.get_registration(&a).is_none());
        assert!(m.active_registration_id().is_none());
    }

    #[test]
    fn test_active_subject_change_event_carries_ids() {
        let mut m = machine();
        let seen: Rc<RefCell<Vec<(Option<SubjectId>, Option<RegistrationId>)>>> = Rc::default();
        let sink = seen.clone();
        let _sub = m.subscribe(Topic::ActiveSubjectChange, move |_, event| {
            if let MachineEvent::ActiveSubjectChange { subject_id, registration_id } = event {
                sink.borrow_mut().push((subject_id.clone(), registration_id.clone()));
            }
        });
        let rid = m.set_active_subject(Some(&sid("Math"))).unwrap();
        m.set_active_subject(None).unwrap();
        assert_eq!(*seen.borrow(), vec![(Some(sid("Math")), rid), (None, None)]);
    }

    #[test]
    fn test_get_active_subject_aliases_subject_id() {
        let mut m = machine();
        let rid = m.set_active_subject(Some(&sid("Physics"))).unwrap().unwrap();
        let active = m.get_active_subject().unwrap();
        assert_eq!(active.id, &sid("Physics"));
        assert_eq!(active.registration.id, rid);
    }

    #[test]
    fn test_subject_status() {
        let mut m = machine();
        assert_eq!(m.subject_status(&sid("Math")), SubjectStatus::Available);
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        assert_eq!(
            m.subject_status(&sid("Math")),
            SubjectStatus::Active(RegistrationState::Draft)
        );
        assert_eq!(m.subject_status(&sid("Physics")), SubjectStatus::Available);
    }

    // ── Configuration ────────────────────────────────────────────────

    #[test]
    fn test_config_complete_only_with_all_fields() {
        let mut m = machine();
        assert!(!m.is_config_complete());
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        m.update_config(ConfigKey::GroupType, "group").unwrap();
        m.update_config(ConfigKey::GroupLevel, "beginner").unwrap();
        m.update_config(ConfigKey::EducationType, "national").unwrap();
        assert!(!m.is_config_complete());
        m.update_config(ConfigKey::Grade, "G10").unwrap();
        assert!(m.is_config_complete());
        m.update_config(ConfigKey::GroupLevel, "").unwrap();
        assert!(!m.is_config_complete());
    }

    #[test]
    fn test_config_change_does_not_transition() {
        let mut m = machine();
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        complete_config(&mut m);
        assert_eq!(m.active_registration().unwrap().state, RegistrationState::Draft);
    }

    #[test]
    fn test_update_config_without_active_registration_fails() {
        let mut m = machine();
        assert_eq!(
            m.update_config(ConfigKey::Grade, "G1"),
            Err(RegistrationError::NoActiveRegistration)
        );
    }

    #[test]
    fn test_reset_config_clears_schedule_and_form() {
        let mut m = machine();
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        complete_config(&mut m);
        m.set_schedule(schedule("Sat", "08:00")).unwrap();
        m.set_form_data(form()).unwrap();

        m.reset_config().unwrap();
        let reg = m.active_registration().unwrap();
        assert!(reg.schedule.is_none());
        assert!(reg.form_data.is_none());
        assert!(!reg.config.is_complete());
        assert_eq!(reg.state, RegistrationState::Draft);
    }

    // ── Scheduling ───────────────────────────────────────────────────

    #[test]
    fn test_set_schedule_advances_draft() {
        let mut m = machine();
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        m.set_schedule(schedule("Sat", "08:00")).unwrap();
        let reg = m.active_registration().unwrap();
        assert_eq!(reg.state, RegistrationState::ScheduleSelected);
        assert_eq!(reg.schedule.as_ref().unwrap().day, "Sat");
    }

    #[test]
    fn test_second_schedule_overwrites_first() {
        let mut m = machine();
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        m.set_schedule(schedule("Sat", "08:00")).unwrap();
        m.set_schedule(schedule("Mon", "14:00")).unwrap();
        let reg = m.active_registration().unwrap();
        let sched = reg.schedule.as_ref().unwrap();
        assert_eq!((sched.day.as_str(), sched.start_time.as_str()), ("Mon", "14:00"));
        assert_eq!(reg.state, RegistrationState::ScheduleSelected);
        assert_eq!(reg.transitions.len(), 1);
    }

    #[test]
    fn test_request_different_slot_returns_to_draft_and_keeps_schedule() {
        let mut m = machine();
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        m.set_schedule(schedule("Sat", "08:00")).unwrap();
        m.request_different_slot().unwrap();
        let reg = m.active_registration().unwrap();
        assert_eq!(reg.state, RegistrationState::Draft);
        assert!(reg.schedule.is_some());
    }

    #[test]
    fn test_schedule_change_emitted_after_state_change() {
        let mut m = machine();
        let order: Rc<RefCell<Vec<Topic>>> = Rc::default();
        for topic in [Topic::StateChange, Topic::ScheduleChange] {
            let sink = order.clone();
            let _ = m.subscribe(topic, move |_, e| sink.borrow_mut().push(e.topic()));
        }
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        m.set_schedule(schedule("Sat", "08:00")).unwrap();
        assert_eq!(*order.borrow(), vec![Topic::StateChange, Topic::ScheduleChange]);
    }

    // ── Submission ───────────────────────────────────────────────────

    #[test]
    fn test_submit_from_draft_fails_without_event() {
        let mut m = machine();
        let fired = Rc::new(Cell::new(0u32));
        let counter = fired.clone();
        let _sub = m.subscribe(Topic::RegistrationSubmitted, move |_, _| {
            counter.set(counter.get() + 1);
        });
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        assert_eq!(
            m.submit_registration(),
            Err(RegistrationError::NotReadyForSubmission {
                state: RegistrationState::Draft
            })
        );
        assert_eq!(fired.get(), 0);
        assert!(m.active_registration_id().is_some());
    }

    #[test]
    fn test_submit_without_active_registration_fails() {
        let mut m = machine();
        assert_eq!(
            m.submit_registration(),
            Err(RegistrationError::NoActiveRegistration)
        );
    }

    #[test]
    fn test_full_registration_scenario() {
        let mut m = machine();
        let submitted = Rc::new(Cell::new(0u32));
        let counter = submitted.clone();
        let _sub = m.subscribe(Topic::RegistrationSubmitted, move |_, _| {
            counter.set(counter.get() + 1);
        });

        let rid = m.set_active_subject(Some(&sid("Math"))).unwrap().unwrap();
        complete_config(&mut m);
        assert!(m.is_config_complete());

        m.set_schedule(schedule("Sat", "08:00")).unwrap();
        assert_eq!(
            m.get_registration(&rid).unwrap().state,
            RegistrationState::ScheduleSelected
        );

        let snapshot = m.submit_registration().unwrap();
        assert_eq!(snapshot.state, RegistrationState::Pending);
        assert!(snapshot.timestamp.is_some());
        assert!(m.active_registration_id().is_none());
        assert_eq!(submitted.get(), 1);

        let path: Vec<_> = snapshot.transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            path,
            vec![
                RegistrationState::ScheduleSelected,
                RegistrationState::Submitted,
                RegistrationState::Pending
            ]
        );
    }

    #[test]
    fn test_two_concurrent_registrations_for_same_subject() {
        let mut m = machine();
        let first = m.set_active_subject(Some(&sid("Physics"))).unwrap().unwrap();
        m.set_schedule(schedule("Sun", "10:00")).unwrap();
        let second = m.set_active_subject(Some(&sid("Physics"))).unwrap().unwrap();

        let physics = m.get_registrations_for_subject(&sid("Physics"));
        let numbers: Vec<_> = physics.iter().map(|r| (r.id.clone(), r.registration_number)).collect();
        assert_eq!(numbers, vec![(first.clone(), 1), (second, 2)]);

        let scheduled = m.get_subjects_by_state(RegistrationState::ScheduleSelected);
        assert!(scheduled.iter().any(|r| r.id == first));
    }

    #[test]
    fn test_submitted_registration_is_not_discarded_on_switch() {
        let mut m = machine();
        let rid = m.set_active_subject(Some(&sid("Math"))).unwrap().unwrap();
        m.set_schedule(schedule("Sat", "08:00")).unwrap();
        m.submit_registration().unwrap();
        m.set_active_subject(Some(&sid("Physics"))).unwrap();
        assert!(m.get_registration(&rid).is_some());
    }

    // ── Transitions ──────────────────────────────────────────────────

    #[test]
    fn test_strict_transition_rejects_illegal_edge() {
        let mut m = machine();
        let rid = m.create_registration(&sid("Math")).unwrap();
        assert_eq!(
            m.transition(&rid, RegistrationState::Accepted),
            Err(RegistrationError::InvalidTransition {
                from: RegistrationState::Draft,
                to: RegistrationState::Accepted
            })
        );
        assert_eq!(m.get_registration(&rid).unwrap().state, RegistrationState::Draft);
    }

    #[test]
    fn test_override_allows_any_target_while_in_flight() {
        let mut m = machine();
        let rid = m.create_registration(&sid("Math")).unwrap();
        m.apply_override(&rid, RegistrationState::Accepted).unwrap();
        let reg = m.get_registration(&rid).unwrap();
        assert_eq!(reg.state, RegistrationState::Accepted);
        assert!(reg.transitions[0].via_override);
    }

    #[test]
    fn test_override_from_rejected_follows_table() {
        let mut m = machine();
        let rid = m.create_registration(&sid("Math")).unwrap();
        m.apply_override(&rid, RegistrationState::Rejected).unwrap();
        assert!(m.apply_override(&rid, RegistrationState::Accepted).is_err());
        m.apply_override(&rid, RegistrationState::Draft).unwrap();
        assert_eq!(m.get_registration(&rid).unwrap().state, RegistrationState::Draft);
    }

    #[test]
    fn test_override_into_submitted_stamps_timestamp() {
        let mut m = machine();
        let rid = m.create_registration(&sid("Math")).unwrap();
        m.apply_override(&rid, RegistrationState::Submitted).unwrap();
        assert!(m.get_registration(&rid).unwrap().timestamp.is_some());
    }

    #[test]
    fn test_rejected_registration_can_return_to_draft() {
        let mut m = machine();
        let rid = m.set_active_subject(Some(&sid("Math"))).unwrap().unwrap();
        m.set_schedule(schedule("Sat", "08:00")).unwrap();
        m.submit_registration().unwrap();
        m.transition(&rid, RegistrationState::Rejected).unwrap();
        m.transition(&rid, RegistrationState::Draft).unwrap();
        assert_eq!(m.get_registration(&rid).unwrap().state, RegistrationState::Draft);
    }

    #[test]
    fn test_transition_unknown_registration() {
        let mut m = machine();
        let ghost = RegistrationId::new("ghost").unwrap();
        assert_eq!(
            m.transition(&ghost, RegistrationState::Pending),
            Err(RegistrationError::NotFound(ghost.clone()))
        );
        assert!(!m.can_transition(&ghost, RegistrationState::Pending));
    }

    #[test]
    fn test_failed_transition_emits_nothing() {
        let mut m = machine();
        let rid = m.create_registration(&sid("Math")).unwrap();
        let fired = Rc::new(Cell::new(0u32));
        let counter = fired.clone();
        let _sub = m.subscribe(Topic::StateChange, move |_, _| counter.set(counter.get() + 1));
        assert!(m.transition(&rid, RegistrationState::Pending).is_err());
        assert_eq!(fired.get(), 0);
    }

    proptest! {
        #[test]
        fn accepted_is_terminal_on_both_paths(target in prop::sample::select(RegistrationState::ALL.to_vec())) {
            let mut m = machine();
            let rid = m.create_registration(&sid("Math")).unwrap();
            m.apply_override(&rid, RegistrationState::Accepted).unwrap();
            prop_assert!(m.transition(&rid, target).is_err());
            prop_assert!(m.apply_override(&rid, target).is_err());
            prop_assert_eq!(m.get_registration(&rid).unwrap().state, RegistrationState::Accepted);
        }
    }

    // ── Events ───────────────────────────────────────────────────────

    #[test]
    fn test_listeners_run_in_subscription_order() {
        let mut m = machine();
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        for name in ["first", "second", "third"] {
            let sink = order.clone();
            let _ = m.subscribe(Topic::ActiveSubjectChange, move |_, _| sink.borrow_mut().push(name));
        }
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribed_listener_is_not_called() {
        let mut m = machine();
        let fired = Rc::new(Cell::new(0u32));
        let counter = fired.clone();
        let sub = m.subscribe(Topic::ActiveSubjectChange, move |_, _| counter.set(counter.get() + 1));
        m.set_active_subject(Some(&sid("Math"))).unwrap();
        assert!(m.unsubscribe(sub));
        m.set_active_subject(None).unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_reentrant_listener_is_resolved_depth_first() {
        let mut m = machine();
        let rid = m.set_active_subject(Some(&sid("Math"))).unwrap().unwrap();
        m.set_schedule(schedule("Sat", "08:00")).unwrap();

        let log: Rc<RefCell<Vec<(RegistrationState, RegistrationState)>>> = Rc::default();
        let sink = log.clone();
        let _recorder = m.subscribe(Topic::StateChange, move |_, event| {
            if let MachineEvent::StateChange { from, to, .. } = event {
                sink.borrow_mut().push((*from, *to));
            }
        });
        let _auto_approve = m.subscribe(Topic::StateChange, |machine, event| {
            if let MachineEvent::StateChange { registration_id, to: RegistrationState::Pending, .. } = event {
                machine
                    .apply_override(registration_id, RegistrationState::Accepted)
                    .unwrap();
            }
        });

        m.submit_registration().unwrap();

        use RegistrationState::*;
        assert_eq!(
            *log.borrow(),
            vec![(ScheduleSelected, Submitted), (Submitted, Pending), (Pending, Accepted)]
        );
        assert_eq!(m.get_registration(&rid).unwrap().state, Accepted);
    }

    #[test]
    fn test_listener_receives_events_it_raises() {
        let mut m = machine();
        let rid = m.set_active_subject(Some(&sid("Math"))).unwrap().unwrap();

        let seen: Rc<RefCell<Vec<(RegistrationState, RegistrationState)>>> = Rc::default();
        let sink = seen.clone();
        let _bounce = m.subscribe(Topic::StateChange, move |machine, event| {
            if let MachineEvent::StateChange { registration_id, from, to, .. } = event {
                sink.borrow_mut().push((*from, *to));
                if *to == RegistrationState::ScheduleSelected {
                    machine
                        .transition(registration_id, RegistrationState::Draft)
                        .unwrap();
                }
            }
        });
        let later: Rc<RefCell<Vec<RegistrationState>>> = Rc::default();
        let later_sink = later.clone();
        let _later = m.subscribe(Topic::StateChange, move |_, event| {
            if let MachineEvent::StateChange { to, .. } = event {
                later_sink.borrow_mut().push(*to);
            }
        });

        m.set_schedule(schedule("Sat", "08:00")).unwrap();

        use RegistrationState::*;
        assert_eq!(*seen.borrow(), vec![(Draft, ScheduleSelected), (ScheduleSelected, Draft)]);
        // Depth-first: the nested event reaches the later listener first.
        assert_eq!(*later.borrow(), vec![Draft, ScheduleSelected]);
        assert_eq!(m.get_registration(&rid).unwrap().state, Draft);
    }

    #[test]
    fn test_listener_may_unsubscribe_a_later_listener() {
        let mut m = machine();
        let fired = Rc::new(Cell::new(0u32));
        let victim_slot: Rc<Cell<Option<Subscription>>> = Rc::default();

        let slot = victim_slot.clone();
        let _killer = m.subscribe(Topic::ActiveSubjectChange, move |machine, _| {
            if let Some(sub) = slot.take() {
                machine.unsubscribe(sub);
            }
        });
        let counter = fired.clone();
        let victim = m.subscribe(Topic::ActiveSubjectChange, move |_, _| counter.set(counter.get() + 1));
        victim_slot.set(Some(victim));

        m.set_active_subject(Some(&sid("Math"))).unwrap();
        assert_eq!(fired.get(), 0);
    }

    // ── Rehydration support ──────────────────────────────────────────

    #[test]
    fn test_insert_rehydrated_bypasses_counter() {
        let mut m = machine();
        let subject = m.get_subject(&sid("Math")).unwrap().clone();
        let mut restored = Registration::new_draft(RegistrationId::new("65f00a").unwrap(), &subject, 3);
        restored.state = RegistrationState::Pending;
        assert!(m.insert_rehydrated(restored.clone()).is_none());

        let fresh = m.create_registration(&sid("Math")).unwrap();
        assert!(fresh.as_str().starts_with("reg_Math_1_"));
        assert_eq!(m.get_registration(&fresh).unwrap().registration_number, 2);

        restored.state = RegistrationState::Accepted;
        let replaced = m.insert_rehydrated(restored).unwrap();
        assert_eq!(replaced.state, RegistrationState::Pending);
        assert_eq!(m.all_registrations().len(), 2);
    }

    #[test]
    fn test_attach_server_id() {
        let mut m = machine();
        let rid = m.create_registration(&sid("Math")).unwrap();
        m.attach_server_id(&rid, RegistrationId::new("srv-1").unwrap()).unwrap();
        assert_eq!(
            m.get_registration(&rid).unwrap().server_id.as_ref().map(RegistrationId::as_str),
            Some("srv-1")
        );
    }
}

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::AppData;
use crate::error::{AppError, AppResult};
use crate::model::{EventStatus, Registration, RegistrationStatus, User};

impl AppData {
    /// Appends the registration and, in the same borrow, bumps the seat count
    /// of the event it references.
    pub fn add_registration(&mut self, registration: Registration) {
        if registration.is_active() {
            if let Some(event) = self
                .events
                .iter_mut()
                .find(|e| e.id == registration.event_id)
            {
                event.registered_count += 1;
            }
        }
        debug!(
            "registration {} for event {} ({})",
            registration.id, registration.event_id, registration.status
        );
        self.registrations.push(registration);
    }

    /// Moves the registration to `cancelled` and releases its seat. Returns
    /// false for unknown or already-cancelled registrations.
    pub fn cancel_registration(&mut self, id: &str) -> bool {
        let Some(registration) = self
            .registrations
            .iter_mut()
            .find(|r| r.id == id && r.is_active())
        else {
            return false;
        };
        registration.status = RegistrationStatus::Cancelled;

        if let Some(event) = self
            .events
            .iter_mut()
            .find(|e| e.id == registration.event_id)
        {
            event.registered_count = event.registered_count.saturating_sub(1);
        }
        debug!("cancelled registration {}", id);
        true
    }

    pub fn check_in(&mut self, id: &str, at: DateTime<Utc>) -> bool {
        match self
            .registrations
            .iter_mut()
            .find(|r| r.id == id && r.is_active())
        {
            Some(registration) => {
                registration.check_in_time = Some(at);
                true
            }
            None => false,
        }
    }

    /// Active registration of `user_id` for `event_id`, if any.
    pub fn registration_for(&self, event_id: &str, user_id: &str) -> Option<&Registration> {
        self.registrations
            .iter()
            .find(|r| r.event_id == event_id && r.user_id == user_id && r.is_active())
    }

    /// Checks availability and takes a seat for `user` in one step, so two
    /// attendees cannot both claim the last seat.
    pub fn register_attendee(
        &mut self,
        event_id: &str,
        user: &User,
        now: DateTime<Utc>,
    ) -> AppResult<Registration> {
        let event = self.event(event_id).ok_or(AppError::NotFound("Event"))?;
        if !self.settings.registrations_open || event.status != EventStatus::Published {
            return Err(AppError::RegistrationsClosed);
        }
        if self.registration_for(event_id, &user.id).is_some() {
            return Err(AppError::AlreadyRegistered);
        }
        if !event.has_capacity() {
            return Err(AppError::EventFull);
        }

        let registration = Registration {
            id: uuid::Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            registered_at: now,
            status: RegistrationStatus::Confirmed,
            check_in_time: None,
        };
        info!("{} registered for event {}", user.email, event_id);
        self.add_registration(registration.clone());
        Ok(registration)
    }
}

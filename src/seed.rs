//! Demo fixtures loaded at startup. Dates are laid out around `today` so the
//! dashboards always have upcoming, past and overdue items to show.

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::model::{
    Category, Event, EventStatus, Feedback, FeedbackCategories, Notification, NotificationType,
    Priority, Registration, RegistrationStatus, Role, Task, TaskStatus, User, VendorService,
};
use crate::store::AppData;

pub fn demo_users() -> Vec<User> {
    vec![
        User::new("1", "admin@ems.com", "System Administrator", Role::Admin),
        User::new("2", "organizer@ems.com", "Event Organizer", Role::Organizer),
        User::new("3", "vendor@ems.com", "Vendor Partner", Role::Vendor),
        User::new("4", "attendee@ems.com", "Event Attendee", Role::Attendee),
        User::new("5", "jordan.lee@example.com", "Jordan Lee", Role::Attendee),
        User::new("6", "priya.shah@example.com", "Priya Shah", Role::Attendee),
    ]
}

fn after(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_add_days(Days::new(days)).unwrap_or(today)
}

fn before(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_sub_days(Days::new(days)).unwrap_or(today)
}

#[allow(clippy::too_many_arguments)]
fn event(
    id: &str,
    title: &str,
    description: &str,
    date: NaiveDate,
    end_date: Option<NaiveDate>,
    time: &str,
    location: &str,
    capacity: u32,
    status: EventStatus,
    category: Category,
    tags: &[&str],
    now: DateTime<Utc>,
) -> Event {
    Event {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        date,
        end_date,
        time: time.to_string(),
        location: location.to_string(),
        capacity,
        registered_count: 0,
        organizer_id: "2".to_string(),
        organizer_name: "Event Organizer".to_string(),
        status,
        category,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image: None,
        created_at: now,
        updated_at: now,
    }
}

#[allow(clippy::too_many_arguments)]
fn task(
    id: &str,
    event_id: &str,
    title: &str,
    description: &str,
    assignee: &User,
    due_date: NaiveDate,
    status: TaskStatus,
    priority: Priority,
    created_by: &str,
    now: DateTime<Utc>,
) -> Task {
    Task {
        id: id.to_string(),
        event_id: event_id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        assigned_to: assignee.id.clone(),
        assigned_to_name: assignee.name.clone(),
        due_date,
        status,
        priority,
        created_by: created_by.to_string(),
        created_at: now,
        completed_at: (status == TaskStatus::Completed).then_some(now),
    }
}

fn registration(
    id: &str,
    event_id: &str,
    user: &User,
    status: RegistrationStatus,
    now: DateTime<Utc>,
) -> Registration {
    Registration {
        id: id.to_string(),
        event_id: event_id.to_string(),
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_email: user.email.clone(),
        registered_at: now,
        status,
        check_in_time: None,
    }
}

fn notification(
    id: &str,
    user_id: &str,
    title: &str,
    message: &str,
    kind: NotificationType,
    action_url: Option<&str>,
    now: DateTime<Utc>,
) -> Notification {
    Notification {
        id: id.to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        message: message.to_string(),
        kind,
        read: false,
        created_at: now,
        action_url: action_url.map(str::to_string),
    }
}

/// Builds the demo collections. Registrations go through the store so every
/// event's seat count starts consistent.
pub fn demo_data(users: &[User], now: DateTime<Utc>) -> AppData {
    let today = now.date_naive();
    let user = |id: &str| {
        users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .unwrap_or_else(|| {
                User::new(id, format!("{id}@ems.com"), "Unknown User", Role::Attendee)
            })
    };
    let vendor = user("3");
    let organizer = user("2");
    let attendee = user("4");
    let jordan = user("5");
    let priya = user("6");

    let mut data = AppData::new();

    data.add_event(event(
        "1",
        "Tech Conference 2025",
        "Two days of talks on systems programming, cloud infrastructure and developer tooling.",
        after(today, 21),
        Some(after(today, 22)),
        "09:00",
        "Convention Center, Hall A",
        500,
        EventStatus::Published,
        Category::Corporate,
        &["technology", "networking", "keynotes"],
        now,
    ));
    data.add_event(event(
        "2",
        "Community Food Drive",
        "Collecting and sorting donations for the neighbourhood food bank.",
        after(today, 7),
        None,
        "10:00",
        "Riverside Community Hall",
        10,
        EventStatus::Published,
        Category::Community,
        &["volunteering", "charity"],
        now,
    ));
    data.add_event(event(
        "3",
        "Graduate Research Symposium",
        "Poster sessions and short talks from this year's graduate cohort.",
        after(today, 45),
        None,
        "13:30",
        "University Library Auditorium",
        150,
        EventStatus::Draft,
        Category::Academic,
        &["research", "posters"],
        now,
    ));
    data.add_event(event(
        "4",
        "Summer Networking Mixer",
        "An evening of introductions, drinks and live music on the rooftop terrace.",
        before(today, 14),
        None,
        "18:00",
        "Skyline Rooftop",
        80,
        EventStatus::Completed,
        Category::Corporate,
        &["networking", "social"],
        now,
    ));

    data.add_task(task(
        "1",
        "1",
        "Confirm catering menu",
        "Finalise lunch options for both conference days, including vegetarian meals.",
        &vendor,
        after(today, 5),
        TaskStatus::Pending,
        Priority::High,
        "2",
        now,
    ));
    data.add_task(task(
        "2",
        "1",
        "Install AV equipment",
        "Projectors, microphones and stage lighting for Hall A.",
        &vendor,
        after(today, 2),
        TaskStatus::InProgress,
        Priority::Urgent,
        "2",
        now,
    ));
    data.add_task(task(
        "3",
        "2",
        "Book sorting tables",
        "Reserve twelve folding tables from the parks department.",
        &vendor,
        before(today, 3),
        TaskStatus::Pending,
        Priority::Medium,
        "2",
        now,
    ));
    data.add_task(task(
        "4",
        "4",
        "Print name badges",
        "Badges for all confirmed guests.",
        &organizer,
        before(today, 16),
        TaskStatus::Completed,
        Priority::Low,
        "1",
        now,
    ));

    data.add_registration(registration("1", "1", &attendee, RegistrationStatus::Confirmed, now));
    data.add_registration(registration("2", "4", &attendee, RegistrationStatus::Confirmed, now));
    data.add_registration(registration("3", "1", &jordan, RegistrationStatus::Confirmed, now));
    data.add_registration(registration("4", "2", &jordan, RegistrationStatus::Waitlist, now));
    data.add_registration(registration("5", "2", &priya, RegistrationStatus::Confirmed, now));
    data.add_registration(registration("6", "4", &priya, RegistrationStatus::Confirmed, now));
    data.check_in("2", now);
    data.check_in("6", now);

    data.add_feedback(Feedback {
        id: "1".to_string(),
        event_id: "4".to_string(),
        user_id: attendee.id.clone(),
        user_name: attendee.name.clone(),
        rating: 5,
        comment: "Great venue, and the band was excellent".to_string(),
        categories: FeedbackCategories {
            organization: 5,
            content: 4,
            venue: 5,
            catering: 4,
        },
        submitted_at: now,
    });
    data.add_feedback(Feedback {
        id: "2".to_string(),
        event_id: "4".to_string(),
        user_id: priya.id.clone(),
        user_name: priya.name.clone(),
        rating: 4,
        comment: "Good crowd, drinks ran out early".to_string(),
        categories: FeedbackCategories {
            organization: 4,
            content: 4,
            venue: 5,
            catering: 2,
        },
        submitted_at: now,
    });

    data.add_notification(notification(
        "1",
        "1",
        "Capacity alert",
        "Community Food Drive is approaching its capacity limit.",
        NotificationType::Warning,
        Some("/events/2"),
        now,
    ));
    data.add_notification(notification(
        "2",
        "2",
        "New registration",
        "Priya Shah registered for Community Food Drive.",
        NotificationType::Success,
        Some("/registrations"),
        now,
    ));
    data.add_notification(notification(
        "3",
        "3",
        "Task overdue",
        "Book sorting tables is past its due date.",
        NotificationType::Error,
        Some("/tasks"),
        now,
    ));
    data.add_notification(notification(
        "4",
        "4",
        "Registration confirmed",
        "You're registered for Tech Conference 2025.",
        NotificationType::Success,
        Some("/events/1"),
        now,
    ));
    data.add_notification(notification(
        "5",
        "4",
        "Share your feedback",
        "Tell us how the Summer Networking Mixer went.",
        NotificationType::Info,
        Some("/events/4"),
        now,
    ));

    data.add_service(VendorService {
        id: "1".to_string(),
        vendor_id: vendor.id.clone(),
        name: "Professional Catering Service".to_string(),
        description: "Full-service catering for corporate events, conferences and special events."
            .to_string(),
        category: "Catering".to_string(),
        price: 25.0,
        duration: "4-8 hours".to_string(),
        location: "On-site".to_string(),
        rating: 4.8,
        reviews: 127,
        available: true,
        features: vec![
            "Professional staff".to_string(),
            "Custom menus".to_string(),
            "Dietary accommodations".to_string(),
            "Setup & cleanup".to_string(),
        ],
    });
    data.add_service(VendorService {
        id: "2".to_string(),
        vendor_id: vendor.id.clone(),
        name: "Audio Visual Equipment Rental".to_string(),
        description: "Projectors, sound systems, microphones and lighting for events of all sizes."
            .to_string(),
        category: "Equipment".to_string(),
        price: 150.0,
        duration: "Full day".to_string(),
        location: "Delivery available".to_string(),
        rating: 4.6,
        reviews: 89,
        available: true,
        features: vec![
            "Professional equipment".to_string(),
            "Technical support".to_string(),
            "Setup included".to_string(),
        ],
    });

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_counts_match_active_registrations() {
        let data = demo_data(&demo_users(), Utc::now());

        for event in data.events() {
            let active = data
                .registrations()
                .iter()
                .filter(|r| r.event_id == event.id && r.is_active())
                .count() as u32;
            assert_eq!(event.registered_count, active, "event {}", event.id);
        }
    }

    #[test]
    fn seeded_emails_are_unique() {
        let users = demo_users();
        for user in &users {
            assert_eq!(users.iter().filter(|u| u.email == user.email).count(), 1);
        }
    }
}

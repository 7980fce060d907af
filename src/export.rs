//! One-way file exports: CSV reports, the plain-text receipt, the printable
//! ticket payload and the analytics JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::analytics::AnalyticsReport;
use crate::error::{AppError, AppResult};
use crate::model::{Event, Feedback, Registration, SiteSettings};
use crate::store::AppData;

pub const REGISTRATIONS_CSV: &str = "registrations.csv";
pub const FEEDBACK_CSV: &str = "feedback-report.csv";
pub const ANALYTICS_JSON: &str = "analytics-report.json";

/// A generated file ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

fn display_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

fn display_instant(at: DateTime<Utc>) -> String {
    display_date(at.date_naive())
}

/// Cells are never quoted; embedded commas become semicolons instead.
fn cell(raw: &str) -> String {
    raw.replace(',', ";").replace(['\n', '\r'], " ")
}

fn csv(header: &[&str], rows: Vec<Vec<String>>) -> String {
    std::iter::once(header.join(","))
        .chain(rows.into_iter().map(|row| row.join(",")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn registrations_csv(data: &AppData, registrations: &[&Registration]) -> Download {
    let rows = registrations
        .iter()
        .map(|r| {
            vec![
                cell(data.event(&r.event_id).map_or("Unknown", |e| e.title.as_str())),
                cell(&r.user_name),
                cell(&r.user_email),
                display_instant(r.registered_at),
                r.status.to_string(),
            ]
        })
        .collect();

    Download {
        filename: REGISTRATIONS_CSV.to_string(),
        content_type: "text/csv",
        body: csv(
            &["Event", "Attendee Name", "Email", "Registration Date", "Status"],
            rows,
        ),
    }
}

pub fn feedback_csv(data: &AppData, feedback: &[&Feedback]) -> Download {
    let rows = feedback
        .iter()
        .map(|f| {
            vec![
                cell(data.event(&f.event_id).map_or("Unknown", |e| e.title.as_str())),
                cell(&f.user_name),
                f.rating.to_string(),
                f.categories.organization.to_string(),
                f.categories.content.to_string(),
                f.categories.venue.to_string(),
                f.categories.catering.to_string(),
                cell(&f.comment),
                display_instant(f.submitted_at),
            ]
        })
        .collect();

    Download {
        filename: FEEDBACK_CSV.to_string(),
        content_type: "text/csv",
        body: csv(
            &[
                "Event",
                "Attendee",
                "Overall Rating",
                "Organization",
                "Content",
                "Venue",
                "Catering",
                "Comment",
                "Date",
            ],
            rows,
        ),
    }
}

/// Lowercased title with whitespace runs collapsed to `-`.
pub fn slug(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

pub fn receipt(event: &Event, registration: &Registration, settings: &SiteSettings) -> Download {
    let body = format!(
        "{site} - REGISTRATION RECEIPT
================================

Event: {title}
Registration ID: {id}
Transaction ID: TXN-{id}

Attendee Information:
Name: {name}
Email: {email}

Event Details:
Date: {date}
Time: {time}
Location: {location}

Registration Date: {registered}
Ticket Price: Free

Thank you for registering!
For support, contact: {support}

================================
This is an automatically generated receipt.
",
        site = settings.site_name.to_uppercase(),
        title = event.title,
        id = registration.id,
        name = registration.user_name,
        email = registration.user_email,
        date = display_date(event.date),
        time = event.time,
        location = event.location,
        registered = display_instant(registration.registered_at),
        support = settings.support_email,
    );

    Download {
        filename: format!("receipt-{}.txt", slug(&event.title)),
        content_type: "text/plain; charset=utf-8",
        body,
    }
}

/// Short code printed on the ticket and checked at the entrance.
pub fn ticket_code(registration: &Registration) -> String {
    let mut hasher = Sha256::new();
    hasher.update(registration.id.as_bytes());
    hasher.update(b":");
    hasher.update(registration.event_id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_uppercase()
}

/// Everything the ticket template prints.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub event: Event,
    pub registration: Registration,
    pub code: String,
    pub date: String,
    pub end_date: Option<String>,
    pub filename: String,
}

impl Ticket {
    pub fn new(event: &Event, registration: &Registration) -> Self {
        Self {
            code: ticket_code(registration),
            date: display_date(event.date),
            end_date: event.end_date.map(display_date),
            filename: format!("ticket-{}.html", slug(&event.title)),
            event: event.clone(),
            registration: registration.clone(),
        }
    }
}

pub fn analytics_json(report: &AnalyticsReport) -> AppResult<Download> {
    let body = serde_json::to_string_pretty(report)
        .map_err(|e| AppError::ExportFailure(e.to_string()))?;
    Ok(Download {
        filename: ANALYTICS_JSON.to_string(),
        content_type: "application/json",
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics;
    use crate::model::{EventStatus, FeedbackCategories, RegistrationStatus};
    use crate::store::tests::event;

    fn registration(event_id: &str, name: &str) -> Registration {
        Registration {
            id: "r1".into(),
            event_id: event_id.into(),
            user_id: "4".into(),
            user_name: name.into(),
            user_email: "attendee@ems.com".into(),
            registered_at: "2025-03-04T10:00:00Z".parse().unwrap(),
            status: RegistrationStatus::Confirmed,
            check_in_time: None,
        }
    }

    #[test]
    fn registrations_csv_neutralises_commas_and_orphans() {
        let mut data = AppData::new();
        data.add_event(event("1", EventStatus::Published, 10));
        let known = registration("1", "Lee, Jordan");
        let orphan = registration("gone", "Priya Shah");

        let export = registrations_csv(&data, &[&known, &orphan]);
        let lines: Vec<_> = export.body.lines().collect();

        assert_eq!(export.filename, "registrations.csv");
        assert_eq!(lines[0], "Event,Attendee Name,Email,Registration Date,Status");
        assert_eq!(lines[1], "Event 1,Lee; Jordan,attendee@ems.com,03/04/2025,confirmed");
        assert!(lines[2].starts_with("Unknown,Priya Shah"));
    }

    #[test]
    fn feedback_csv_has_one_column_per_category() {
        let mut data = AppData::new();
        data.add_event(event("1", EventStatus::Completed, 10));
        let fb = Feedback {
            id: "f1".into(),
            event_id: "1".into(),
            user_id: "4".into(),
            user_name: "Event Attendee".into(),
            rating: 4,
            comment: "Loved it, would return".into(),
            categories: FeedbackCategories {
                organization: 5,
                content: 4,
                venue: 3,
                catering: 2,
            },
            submitted_at: "2025-03-04T10:00:00Z".parse().unwrap(),
        };

        let export = feedback_csv(&data, &[&fb]);
        let row = export.body.lines().nth(1).unwrap();

        assert_eq!(row, "Event 1,Event Attendee,4,5,4,3,2,Loved it; would return,03/04/2025");
        assert_eq!(row.split(',').count(), 9);
    }

    #[test]
    fn slug_collapses_whitespace() {
        assert_eq!(slug("Tech  Conference 2025"), "tech-conference-2025");
    }

    #[test]
    fn receipt_names_the_transaction() {
        let e = event("1", EventStatus::Published, 10);
        let r = registration("1", "Event Attendee");
        let export = receipt(&e, &r, &SiteSettings::default());

        assert_eq!(export.filename, "receipt-event-1.txt");
        assert!(export.body.contains("Transaction ID: TXN-r1"));
        assert!(export.body.contains("For support, contact: support@eventms.com"));
    }

    #[test]
    fn ticket_code_is_stable_per_registration() {
        let a = registration("1", "Event Attendee");
        let mut b = a.clone();
        assert_eq!(ticket_code(&a), ticket_code(&b));
        assert_eq!(ticket_code(&a).len(), 12);

        b.event_id = "2".into();
        assert_ne!(ticket_code(&a), ticket_code(&b));
    }

    #[test]
    fn analytics_export_is_pretty_json() {
        let report = analytics::report(&AppData::new(), Some(30), Utc::now());
        let export = analytics_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&export.body).unwrap();

        assert_eq!(export.filename, "analytics-report.json");
        assert_eq!(value["range_days"], 30);
        assert_eq!(value["summary"]["total_events"], 0);
    }
}

//! Role capability sets.
//!
//! Every role-dependent decision (which pages exist in the sidebar, which
//! pages are reachable, which mutations are allowed and which rows are
//! visible) goes through the [`Capability`] implementation for the session
//! user's role. Handlers receive it bundled with the user as a [`Viewer`].

use chrono::NaiveDate;
use minijinja::Value;
use serde::Serialize;

use crate::analytics;
use crate::error::{AppError, AppResult};
use crate::model::{Event, EventStatus, Feedback, Notification, Registration, Role, Task, User};
use crate::store::AppData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Events,
    EventDetail,
    CreateEvent,
    Tasks,
    CreateTask,
    Registrations,
    Feedback,
    Notifications,
    Users,
    Analytics,
    Settings,
    Profile,
    Services,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    CreateEvent,
    CreateTask,
    RegisterForEvent,
    SubmitFeedback,
    ExportRegistrations,
    ExportFeedback,
    ExportAnalytics,
    ManageUsers,
    ManageSettings,
    ManageServices,
}

#[derive(Debug, Clone, Copy)]
pub struct NavItem {
    pub name: &'static str,
    pub href: &'static str,
}

const fn nav(name: &'static str, href: &'static str) -> NavItem {
    NavItem { name, href }
}

/// Sidebar entry rendered for the current request.
#[derive(Debug, Clone, Serialize)]
pub struct NavLink {
    pub name: &'static str,
    pub href: &'static str,
    pub current: bool,
}

/// Landing page for a role: which template to render and its figures.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub template: &'static str,
    pub stats: Value,
}

impl Dashboard {
    fn new(template: &'static str, stats: impl Serialize) -> Self {
        Self {
            template,
            stats: Value::from_serialize(&stats),
        }
    }
}

pub trait Capability: Send + Sync {
    fn role(&self) -> Role;

    fn dashboard(&self, viewer: &Viewer, data: &AppData, today: NaiveDate) -> Dashboard;

    fn navigation(&self) -> &'static [NavItem];

    fn reachable(&self) -> &'static [Page];

    fn permissions(&self) -> &'static [Permission];

    fn sees_event(&self, _user: &User, _event: &Event, _data: &AppData) -> bool {
        true
    }

    fn sees_task(&self, user: &User, task: &Task, data: &AppData) -> bool;

    fn sees_registration(&self, user: &User, registration: &Registration, data: &AppData) -> bool;

    fn sees_feedback(&self, _user: &User, _feedback: &Feedback, _data: &AppData) -> bool {
        false
    }

    fn can_edit_event(&self, _user: &User, _event: &Event) -> bool {
        false
    }

    /// Cancel on behalf of an attendee.
    fn can_cancel_registration(
        &self,
        user: &User,
        registration: &Registration,
        data: &AppData,
    ) -> bool {
        self.sees_registration(user, registration, data)
    }

    fn can_check_in(&self, _user: &User, _registration: &Registration, _data: &AppData) -> bool {
        false
    }
}

fn organizes(user: &User, event_id: &str, data: &AppData) -> bool {
    data.event(event_id)
        .is_some_and(|event| event.organizer_id == user.id)
}

const COMMON_NAV: [NavItem; 3] = [
    nav("Dashboard", "/"),
    nav("Events", "/events"),
    nav("Notifications", "/notifications"),
];

pub struct AdminCapability;

impl Capability for AdminCapability {
    fn role(&self) -> Role {
        Role::Admin
    }

    fn dashboard(&self, _viewer: &Viewer, data: &AppData, today: NaiveDate) -> Dashboard {
        Dashboard::new("dashboard_admin.html", analytics::admin_stats(data, today))
    }

    fn navigation(&self) -> &'static [NavItem] {
        const NAV: [NavItem; 6] = [
            COMMON_NAV[0],
            COMMON_NAV[1],
            COMMON_NAV[2],
            nav("Users", "/users"),
            nav("Analytics", "/analytics"),
            nav("Settings", "/settings"),
        ];
        &NAV
    }

    fn reachable(&self) -> &'static [Page] {
        &[
            Page::Dashboard,
            Page::Events,
            Page::EventDetail,
            Page::CreateEvent,
            Page::Tasks,
            Page::CreateTask,
            Page::Registrations,
            Page::Feedback,
            Page::Notifications,
            Page::Users,
            Page::Analytics,
            Page::Settings,
            Page::Profile,
        ]
    }

    fn permissions(&self) -> &'static [Permission] {
        &[
            Permission::CreateEvent,
            Permission::CreateTask,
            Permission::ExportRegistrations,
            Permission::ExportFeedback,
            Permission::ExportAnalytics,
            Permission::ManageUsers,
            Permission::ManageSettings,
        ]
    }

    fn sees_task(&self, _user: &User, _task: &Task, _data: &AppData) -> bool {
        true
    }

    fn sees_registration(&self, _user: &User, _reg: &Registration, _data: &AppData) -> bool {
        true
    }

    fn sees_feedback(&self, _user: &User, _feedback: &Feedback, _data: &AppData) -> bool {
        true
    }

    fn can_edit_event(&self, _user: &User, _event: &Event) -> bool {
        true
    }

    fn can_check_in(&self, _user: &User, _registration: &Registration, _data: &AppData) -> bool {
        true
    }
}

pub struct OrganizerCapability;

impl Capability for OrganizerCapability {
    fn role(&self) -> Role {
        Role::Organizer
    }

    fn dashboard(&self, viewer: &Viewer, data: &AppData, today: NaiveDate) -> Dashboard {
        let stats = analytics::organizer_stats(data, viewer, today);
        Dashboard::new("dashboard_organizer.html", stats)
    }

    fn navigation(&self) -> &'static [NavItem] {
        const NAV: [NavItem; 6] = [
            COMMON_NAV[0],
            COMMON_NAV[1],
            COMMON_NAV[2],
            nav("Tasks", "/tasks"),
            nav("Registrations", "/registrations"),
            nav("Feedback", "/feedback"),
        ];
        &NAV
    }

    fn reachable(&self) -> &'static [Page] {
        &[
            Page::Dashboard,
            Page::Events,
            Page::EventDetail,
            Page::CreateEvent,
            Page::Tasks,
            Page::CreateTask,
            Page::Registrations,
            Page::Feedback,
            Page::Notifications,
            Page::Profile,
        ]
    }

    fn permissions(&self) -> &'static [Permission] {
        &[
            Permission::CreateEvent,
            Permission::CreateTask,
            Permission::ExportRegistrations,
            Permission::ExportFeedback,
        ]
    }

    fn sees_task(&self, user: &User, task: &Task, data: &AppData) -> bool {
        task.created_by == user.id || organizes(user, &task.event_id, data)
    }

    fn sees_registration(&self, user: &User, registration: &Registration, data: &AppData) -> bool {
        organizes(user, &registration.event_id, data)
    }

    fn sees_feedback(&self, user: &User, feedback: &Feedback, data: &AppData) -> bool {
        organizes(user, &feedback.event_id, data)
    }

    fn can_edit_event(&self, user: &User, event: &Event) -> bool {
        event.organizer_id == user.id
    }

    fn can_check_in(&self, user: &User, registration: &Registration, data: &AppData) -> bool {
        organizes(user, &registration.event_id, data)
    }
}

pub struct VendorCapability;

impl Capability for VendorCapability {
    fn role(&self) -> Role {
        Role::Vendor
    }

    fn dashboard(&self, viewer: &Viewer, data: &AppData, today: NaiveDate) -> Dashboard {
        let stats = analytics::vendor_stats(&viewer.tasks(data), today);
        Dashboard::new("dashboard_vendor.html", stats)
    }

    fn navigation(&self) -> &'static [NavItem] {
        const NAV: [NavItem; 5] = [
            COMMON_NAV[0],
            COMMON_NAV[1],
            COMMON_NAV[2],
            nav("My Tasks", "/tasks"),
            nav("My Services", "/services"),
        ];
        &NAV
    }

    fn reachable(&self) -> &'static [Page] {
        &[
            Page::Dashboard,
            Page::Events,
            Page::EventDetail,
            Page::Tasks,
            Page::Notifications,
            Page::Profile,
            Page::Services,
        ]
    }

    fn permissions(&self) -> &'static [Permission] {
        &[Permission::ManageServices]
    }

    fn sees_task(&self, user: &User, task: &Task, _data: &AppData) -> bool {
        task.assigned_to == user.id
    }

    fn sees_registration(&self, _user: &User, _reg: &Registration, _data: &AppData) -> bool {
        false
    }
}

pub struct AttendeeCapability;

impl Capability for AttendeeCapability {
    fn role(&self) -> Role {
        Role::Attendee
    }

    fn dashboard(&self, viewer: &Viewer, data: &AppData, today: NaiveDate) -> Dashboard {
        let stats = analytics::attendee_stats(data, viewer, today);
        Dashboard::new("dashboard_attendee.html", stats)
    }

    fn navigation(&self) -> &'static [NavItem] {
        const NAV: [NavItem; 4] = [
            COMMON_NAV[0],
            COMMON_NAV[1],
            COMMON_NAV[2],
            nav("My Registrations", "/registrations"),
        ];
        &NAV
    }

    fn reachable(&self) -> &'static [Page] {
        &[
            Page::Dashboard,
            Page::Events,
            Page::EventDetail,
            Page::Registrations,
            Page::Notifications,
            Page::Profile,
        ]
    }

    fn permissions(&self) -> &'static [Permission] {
        &[Permission::RegisterForEvent, Permission::SubmitFeedback]
    }

    /// Published events, plus any event the attendee already holds a seat for.
    fn sees_event(&self, user: &User, event: &Event, data: &AppData) -> bool {
        event.status == EventStatus::Published
            || data.registration_for(&event.id, &user.id).is_some()
    }

    fn sees_task(&self, _user: &User, _task: &Task, _data: &AppData) -> bool {
        false
    }

    fn sees_registration(&self, user: &User, registration: &Registration, _data: &AppData) -> bool {
        registration.user_id == user.id
    }
}

pub fn capabilities(role: Role) -> &'static dyn Capability {
    match role {
        Role::Admin => &AdminCapability,
        Role::Organizer => &OrganizerCapability,
        Role::Vendor => &VendorCapability,
        Role::Attendee => &AttendeeCapability,
    }
}

/// The session user paired with their role's capability set. Re-derived on
/// every request, never cached.
#[derive(Clone)]
pub struct Viewer {
    pub user: User,
    caps: &'static dyn Capability,
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("user", &self.user.email)
            .field("role", &self.caps.role())
            .finish()
    }
}

impl Viewer {
    pub fn new(user: User) -> Self {
        let caps = capabilities(user.role);
        Self { user, caps }
    }

    pub fn role(&self) -> Role {
        self.caps.role()
    }

    pub fn dashboard(&self, data: &AppData, today: NaiveDate) -> Dashboard {
        self.caps.dashboard(self, data, today)
    }

    pub fn require(&self, page: Page) -> AppResult<()> {
        if self.caps.reachable().contains(&page) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn permits(&self, permission: Permission) -> bool {
        self.caps.permissions().contains(&permission)
    }

    pub fn require_permission(&self, permission: Permission) -> AppResult<()> {
        if self.permits(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn navigation(&self, path: &str) -> Vec<NavLink> {
        self.caps
            .navigation()
            .iter()
            .map(|item| NavLink {
                name: item.name,
                href: item.href,
                current: if item.href == "/" {
                    path == "/"
                } else {
                    path.starts_with(item.href)
                },
            })
            .collect()
    }

    pub fn events<'d>(&self, data: &'d AppData) -> Vec<&'d Event> {
        data.events()
            .iter()
            .filter(|e| self.caps.sees_event(&self.user, e, data))
            .collect()
    }

    /// Looks up one event, hiding those outside the viewer's scope.
    pub fn event<'d>(&self, data: &'d AppData, id: &str) -> AppResult<&'d Event> {
        data.event(id)
            .filter(|e| self.caps.sees_event(&self.user, e, data))
            .ok_or(AppError::NotFound("Event"))
    }

    pub fn tasks<'d>(&self, data: &'d AppData) -> Vec<&'d Task> {
        data.tasks()
            .iter()
            .filter(|t| self.caps.sees_task(&self.user, t, data))
            .collect()
    }

    pub fn registrations<'d>(&self, data: &'d AppData) -> Vec<&'d Registration> {
        data.registrations()
            .iter()
            .filter(|r| self.caps.sees_registration(&self.user, r, data))
            .collect()
    }

    pub fn feedback<'d>(&self, data: &'d AppData) -> Vec<&'d Feedback> {
        data.feedback()
            .iter()
            .filter(|f| self.caps.sees_feedback(&self.user, f, data))
            .collect()
    }

    pub fn notifications<'d>(&self, data: &'d AppData) -> Vec<&'d Notification> {
        data.notifications()
            .iter()
            .filter(|n| n.user_id == self.user.id)
            .collect()
    }

    pub fn can_edit_event(&self, event: &Event) -> bool {
        self.caps.can_edit_event(&self.user, event)
    }

    pub fn can_cancel_registration(&self, registration: &Registration, data: &AppData) -> bool {
        registration.is_active()
            && self.caps.can_cancel_registration(&self.user, registration, data)
    }

    pub fn can_check_in(&self, registration: &Registration, data: &AppData) -> bool {
        registration.is_active()
            && registration.check_in_time.is_none()
            && self.caps.can_check_in(&self.user, registration, data)
    }

    /// Only the assignee moves a task forward.
    pub fn can_advance_task(&self, task: &Task) -> bool {
        task.assigned_to == self.user.id && task.next_status().is_some()
    }

    /// Whether the register button applies: an attendee, not yet holding a
    /// seat, on a published event with room left.
    pub fn can_register(&self, event: &Event, data: &AppData) -> bool {
        self.permits(Permission::RegisterForEvent)
            && data.settings().registrations_open
            && event.status == EventStatus::Published
            && data.registration_for(&event.id, &self.user.id).is_none()
            && event.has_capacity()
    }

    pub fn can_leave_feedback(&self, event: &Event, data: &AppData) -> bool {
        self.permits(Permission::SubmitFeedback)
            && data.registration_for(&event.id, &self.user.id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::seed;
    use crate::store::tests::event;

    fn viewer(role: Role, id: &str) -> Viewer {
        Viewer::new(User::new(id, format!("{id}@ems.com"), "Someone", role))
    }

    fn draft_and_published() -> AppData {
        let mut data = AppData::new();
        data.add_event(event("draft", EventStatus::Draft, 10));
        data.add_event(event("live", EventStatus::Published, 10));
        data
    }

    #[test]
    fn attendees_see_only_published_events() {
        let data = draft_and_published();
        let ids: Vec<_> = viewer(Role::Attendee, "4")
            .events(&data)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["live"]);
    }

    #[test]
    fn organizers_see_drafts_too() {
        let data = draft_and_published();
        assert_eq!(viewer(Role::Organizer, "2").events(&data).len(), 2);
    }

    #[test]
    fn hidden_event_lookup_is_not_found() {
        let data = draft_and_published();
        let result = viewer(Role::Attendee, "4").event(&data, "draft");
        assert!(matches!(result, Err(AppError::NotFound("Event"))));
    }

    #[test]
    fn data_is_scoped_per_role() {
        let users = seed::demo_users();
        let data = seed::demo_data(&users, Utc::now());

        let admin = Viewer::new(users[0].clone());
        let organizer = Viewer::new(users[1].clone());
        let vendor = Viewer::new(users[2].clone());
        let attendee = Viewer::new(users[3].clone());

        assert_eq!(admin.tasks(&data).len(), data.tasks().len());
        assert_eq!(admin.registrations(&data).len(), data.registrations().len());

        assert!(vendor.tasks(&data).iter().all(|t| t.assigned_to == vendor.user.id));
        assert!(vendor.registrations(&data).is_empty());

        assert!(attendee.tasks(&data).is_empty());
        assert!(attendee.registrations(&data).iter().all(|r| r.user_id == attendee.user.id));
        assert!(attendee.feedback(&data).is_empty());

        assert!(organizer.registrations(&data).iter().all(|r| {
            data.event(&r.event_id).is_some_and(|e| e.organizer_id == organizer.user.id)
        }));
        assert!(attendee.notifications(&data).iter().all(|n| n.user_id == "4"));
    }

    #[test]
    fn pages_are_gated_by_role() {
        assert!(viewer(Role::Admin, "1").require(Page::Users).is_ok());
        assert!(viewer(Role::Organizer, "2").require(Page::Users).is_err());
        assert!(viewer(Role::Vendor, "3").require(Page::Services).is_ok());
        assert!(viewer(Role::Attendee, "4").require(Page::Tasks).is_err());
        assert!(viewer(Role::Attendee, "4").require(Page::Profile).is_ok());
    }

    #[test]
    fn navigation_marks_the_current_section() {
        let nav = viewer(Role::Vendor, "3").navigation("/events/1");
        let current: Vec<_> = nav.iter().filter(|l| l.current).map(|l| l.name).collect();
        assert_eq!(current, vec!["Events"]);
        assert!(nav.iter().any(|l| l.name == "My Services"));
    }

    #[test]
    fn organizers_edit_only_their_own_events() {
        let mut other = event("x", EventStatus::Draft, 5);
        other.organizer_id = "99".to_string();
        let own = event("y", EventStatus::Draft, 5);

        let organizer = viewer(Role::Organizer, "2");
        assert!(organizer.can_edit_event(&own));
        assert!(!organizer.can_edit_event(&other));
        assert!(viewer(Role::Admin, "1").can_edit_event(&other));
    }

    #[test]
    fn register_button_respects_capacity_and_existing_seats() {
        let mut data = AppData::new();
        let mut full = event("full", EventStatus::Published, 1);
        full.registered_count = 1;
        data.add_event(full);
        data.add_event(event("open", EventStatus::Published, 10));

        let attendee = viewer(Role::Attendee, "4");
        assert!(!attendee.can_register(data.event("full").unwrap(), &data));
        assert!(attendee.can_register(data.event("open").unwrap(), &data));
        assert!(!viewer(Role::Organizer, "2").can_register(data.event("open").unwrap(), &data));

        data.register_attendee("open", &attendee.user, Utc::now()).unwrap();
        assert!(!attendee.can_register(data.event("open").unwrap(), &data));
        assert!(attendee.can_leave_feedback(data.event("open").unwrap(), &data));
    }

    #[test]
    fn each_role_lands_on_its_own_dashboard() {
        let users = seed::demo_users();
        let data = seed::demo_data(&users, Utc::now());
        let today = Utc::now().date_naive();

        let templates: Vec<_> = users[..4]
            .iter()
            .map(|u| Viewer::new(u.clone()).dashboard(&data, today).template)
            .collect();
        assert_eq!(
            templates,
            [
                "dashboard_admin.html",
                "dashboard_organizer.html",
                "dashboard_vendor.html",
                "dashboard_attendee.html",
            ]
        );

        let vendor = Viewer::new(users[2].clone()).dashboard(&data, today);
        let total = vendor.stats.get_attr("total").ok().and_then(|v| v.as_usize());
        assert_eq!(total, Some(3));
    }
}

//! Client route surface.
//!
//! Every page the front end can navigate to. Role-prefixed families map to
//! the dashboards and tools of each role; the call page and auth pages are
//! shared. Unknown paths resolve to the login page.

use serde::{Serialize, Serializer};

use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    VideoCall,
    HelpSupport,
    AiAgentConsultation,
    LiveKitDemo,
    Patient(PatientPage),
    Doctor(DoctorPage),
    Nurse(NursePage),
    Admin(AdminPage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatientPage {
    Dashboard,
    BookAppointment,
    Prescriptions,
    MedicalRecords,
    Pharmacy,
    AiSymptomChecker,
    Payments,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DoctorPage {
    Dashboard,
    Calendar,
    Patients,
    PatientRecord(String),
    Prescriptions,
    WritePrescription,
    Consultations,
    AiTriage,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NursePage {
    Dashboard,
    Patients,
    Vitals,
    Medications,
    Notes,
    Schedule,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminPage {
    Dashboard,
    Users,
    UserDetails,
    Analytics,
    SystemHealth,
    DoctorVerification,
    Revenue,
    FraudDetection,
    SystemLogs,
    AiReports,
    Notifications,
    Settings,
    Setup,
}

const PATIENT_PAGES: &[(&str, PatientPage)] = &[
    ("dashboard", PatientPage::Dashboard),
    ("book-appointment", PatientPage::BookAppointment),
    ("prescriptions", PatientPage::Prescriptions),
    ("medical-records", PatientPage::MedicalRecords),
    ("pharmacy", PatientPage::Pharmacy),
    ("ai-symptom-checker", PatientPage::AiSymptomChecker),
    ("payments", PatientPage::Payments),
    ("settings", PatientPage::Settings),
];

const NURSE_PAGES: &[(&str, NursePage)] = &[
    ("dashboard", NursePage::Dashboard),
    ("patients", NursePage::Patients),
    ("vitals", NursePage::Vitals),
    ("medications", NursePage::Medications),
    ("notes", NursePage::Notes),
    ("schedule", NursePage::Schedule),
    ("settings", NursePage::Settings),
];

const ADMIN_PAGES: &[(&str, AdminPage)] = &[
    ("dashboard", AdminPage::Dashboard),
    ("users", AdminPage::Users),
    ("user-details", AdminPage::UserDetails),
    ("analytics", AdminPage::Analytics),
    ("system-health", AdminPage::SystemHealth),
    ("doctor-verification", AdminPage::DoctorVerification),
    ("revenue", AdminPage::Revenue),
    ("fraud-detection", AdminPage::FraudDetection),
    ("system-logs", AdminPage::SystemLogs),
    ("ai-reports", AdminPage::AiReports),
    ("notifications", AdminPage::Notifications),
    ("settings", AdminPage::Settings),
    ("setup", AdminPage::Setup),
];

fn lookup<T: Copy>(table: &[(&str, T)], slug: &str) -> Option<T> {
    table.iter().find(|(s, _)| *s == slug).map(|(_, page)| *page)
}

fn slug_of<T: PartialEq>(table: &[(&'static str, T)], page: &T) -> &'static str {
    table
        .iter()
        .find(|(_, p)| p == page)
        .map(|(s, _)| *s)
        .unwrap_or("dashboard")
}

impl Route {
    /// Resolve a path (query string and trailing slash ignored).
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            ["video-call"] => Some(Route::VideoCall),
            ["help-support"] => Some(Route::HelpSupport),
            ["ai-agent-consultation"] => Some(Route::AiAgentConsultation),
            ["livekit-demo"] => Some(Route::LiveKitDemo),
            ["patient", page] => lookup(PATIENT_PAGES, page).map(Route::Patient),
            ["nurse", page] => lookup(NURSE_PAGES, page).map(Route::Nurse),
            ["admin", page] => lookup(ADMIN_PAGES, page).map(Route::Admin),
            ["doctor", "patient-record", id] => {
                Some(Route::Doctor(DoctorPage::PatientRecord((*id).to_string())))
            }
            ["doctor", page] => DoctorPage::from_slug(page).map(Route::Doctor),
            _ => None,
        };

        route.unwrap_or(Route::Login)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".into(),
            Route::Register => "/register".into(),
            Route::VideoCall => "/video-call".into(),
            Route::HelpSupport => "/help-support".into(),
            Route::AiAgentConsultation => "/ai-agent-consultation".into(),
            Route::LiveKitDemo => "/livekit-demo".into(),
            Route::Patient(p) => format!("/patient/{}", slug_of(PATIENT_PAGES, p)),
            Route::Nurse(p) => format!("/nurse/{}", slug_of(NURSE_PAGES, p)),
            Route::Admin(p) => format!("/admin/{}", slug_of(ADMIN_PAGES, p)),
            Route::Doctor(DoctorPage::PatientRecord(id)) => {
                format!("/doctor/patient-record/{id}")
            }
            Route::Doctor(p) => format!("/doctor/{}", p.slug()),
        }
    }

    /// Role owning a role-prefixed route.
    pub fn role(&self) -> Option<Role> {
        match self {
            Route::Patient(_) => Some(Role::Patient),
            Route::Doctor(_) => Some(Role::Doctor),
            Route::Nurse(_) => Some(Role::Nurse),
            Route::Admin(_) => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn dashboard(role: Role) -> Self {
        match role {
            Role::Patient => Route::Patient(PatientPage::Dashboard),
            Role::Doctor => Route::Doctor(DoctorPage::Dashboard),
            Role::Nurse => Route::Nurse(NursePage::Dashboard),
            Role::Admin => Route::Admin(AdminPage::Dashboard),
        }
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

impl DoctorPage {
    fn from_slug(slug: &str) -> Option<Self> {
        Some(match slug {
            "dashboard" => DoctorPage::Dashboard,
            "calendar" => DoctorPage::Calendar,
            "patients" => DoctorPage::Patients,
            "prescriptions" => DoctorPage::Prescriptions,
            "write-prescription" => DoctorPage::WritePrescription,
            "consultations" => DoctorPage::Consultations,
            "ai-triage" => DoctorPage::AiTriage,
            "settings" => DoctorPage::Settings,
            _ => return None,
        })
    }

    fn slug(&self) -> &'static str {
        match self {
            DoctorPage::Dashboard => "dashboard",
            DoctorPage::Calendar => "calendar",
            DoctorPage::Patients => "patients",
            DoctorPage::PatientRecord(_) => "patient-record",
            DoctorPage::Prescriptions => "prescriptions",
            DoctorPage::WritePrescription => "write-prescription",
            DoctorPage::Consultations => "consultations",
            DoctorPage::AiTriage => "ai-triage",
            DoctorPage::Settings => "settings",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_pages() {
        assert_eq!(Route::parse("/nurse/vitals"), Route::Nurse(NursePage::Vitals));
        assert_eq!(Route::parse("/admin/fraud-detection/"), Route::Admin(AdminPage::FraudDetection));
        assert_eq!(
            Route::parse("/doctor/patient-record/p-17"),
            Route::Doctor(DoctorPage::PatientRecord("p-17".into()))
        );
    }

    #[test]
    fn test_video_call_ignores_query() {
        assert_eq!(Route::parse("/video-call?room=r&role=doctor"), Route::VideoCall);
    }

    #[test]
    fn test_unknown_and_root_redirect_to_login() {
        assert_eq!(Route::parse("/"), Route::Login);
        assert_eq!(Route::parse("/patient/nowhere"), Route::Login);
        assert_eq!(Route::parse("/billing"), Route::Login);
    }

    #[test]
    fn test_paths_render_back() {
        for path in [
            "/login",
            "/video-call",
            "/patient/book-appointment",
            "/doctor/ai-triage",
            "/doctor/patient-record/abc",
            "/nurse/notes",
            "/admin/setup",
        ] {
            assert_eq!(Route::parse(path).path(), path);
        }
    }

    #[test]
    fn test_dashboard_matches_role_route() {
        for role in [Role::Patient, Role::Doctor, Role::Nurse, Role::Admin] {
            let route = Route::dashboard(role);
            assert_eq!(route.path(), role.dashboard_route());
            assert_eq!(route.role(), Some(role));
        }
        assert_eq!(Route::VideoCall.role(), None);
    }
}

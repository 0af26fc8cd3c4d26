// ── Resource catalogue ──
//
// Every backend service and the resource types it owns. Paths are
// relative to the owning service's base URL.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A backend microservice with its own base URL.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Service {
    Students,
    Staff,
    Fees,
    Exams,
    Attendance,
    Homework,
    Timetable,
    Library,
    Transport,
    Communication,
    Analytics,
    Notifications,
}

/// A cacheable resource type.
///
/// The string form (`students`, `feePayments`, ...) is the resource-type
/// half of every cache key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum ResourceKind {
    Students,
    StudentStats,
    Staff,
    FeeStructures,
    FeePayments,
    Exams,
    ExamResults,
    Attendance,
    Homework,
    Timetable,
    LibraryBooks,
    TransportRoutes,
    Messages,
    Analytics,
    Notifications,
}

impl ResourceKind {
    /// The service that owns this resource type.
    pub fn service(self) -> Service {
        match self {
            Self::Students | Self::StudentStats => Service::Students,
            Self::Staff => Service::Staff,
            Self::FeeStructures | Self::FeePayments => Service::Fees,
            Self::Exams | Self::ExamResults => Service::Exams,
            Self::Attendance => Service::Attendance,
            Self::Homework => Service::Homework,
            Self::Timetable => Service::Timetable,
            Self::LibraryBooks => Service::Library,
            Self::TransportRoutes => Service::Transport,
            Self::Messages => Service::Communication,
            Self::Analytics => Service::Analytics,
            Self::Notifications => Service::Notifications,
        }
    }

    /// Collection path relative to the service base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Students => "api/v1/students",
            Self::StudentStats => "api/v1/students/stats",
            Self::Staff => "api/v1/staff",
            Self::FeeStructures => "api/v1/fees/structures",
            Self::FeePayments => "api/v1/fees/payments",
            Self::Exams => "api/v1/exams",
            Self::ExamResults => "api/v1/exams/results",
            Self::Attendance => "api/v1/attendance",
            Self::Homework => "api/v1/homework",
            Self::Timetable => "api/v1/timetable",
            Self::LibraryBooks => "api/v1/library/books",
            Self::TransportRoutes => "api/v1/transport/routes",
            Self::Messages => "api/v1/communication/messages",
            Self::Analytics => "api/v1/analytics",
            Self::Notifications => "api/v1/notifications",
        }
    }

    /// Field of the list response that holds the items,
    /// as in `{ "payments": [...], "total": 42 }`.
    pub fn envelope(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::StudentStats => "stats",
            Self::Staff => "staff",
            Self::FeeStructures => "structures",
            Self::FeePayments => "payments",
            Self::Exams => "exams",
            Self::ExamResults => "results",
            Self::Attendance => "records",
            Self::Homework => "homework",
            Self::Timetable => "entries",
            Self::LibraryBooks => "books",
            Self::TransportRoutes => "routes",
            Self::Messages => "messages",
            Self::Analytics => "reports",
            Self::Notifications => "notifications",
        }
    }

    /// Name used for this resource type in cache keys and on the CLI.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

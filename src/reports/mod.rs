//! Per-student reports reachable from the landing page links.

mod parser;
mod scraper;
mod types;

pub use parser::{parse_absences, parse_grades, parse_planning};
pub use scraper::planning_window;
pub use types::{
    Absence, AbsenceField, AbsenceReport, EventField, Grade, GradeField, GradeReport,
    PlanningEvent, PlanningReport, UserField, UserInfo,
};

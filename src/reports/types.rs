//! Grades, absences, schedule and identity containers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::MAIL_DOMAIN;
use crate::record::{field_enum, Record, Report};

field_enum! {
    pub enum GradeField {
        Date => "date",
        Code => "code",
        Label => "label",
        Grade => "grade",
        AbsenceReason => "absenceReason",
        Appraisal => "appraisal",
        Instructors => "instructors",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub date: String,
    pub code: String,
    pub label: String,
    pub grade: String,
    pub absence_reason: String,
    pub appraisal: String,
    pub instructors: String,
}

impl Record for Grade {
    type Field = GradeField;

    fn get(&self, field: GradeField) -> String {
        match field {
            GradeField::Date => self.date.clone(),
            GradeField::Code => self.code.clone(),
            GradeField::Label => self.label.clone(),
            GradeField::Grade => self.grade.clone(),
            GradeField::AbsenceReason => self.absence_reason.clone(),
            GradeField::Appraisal => self.appraisal.clone(),
            GradeField::Instructors => self.instructors.clone(),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Grade(date='{}', code='{}', label='{}', grade='{}')",
            self.date, self.code, self.label, self.grade
        )
    }
}

field_enum! {
    pub enum AbsenceField {
        Date => "date",
        Reason => "reason",
        Duration => "duration",
        Schedule => "schedule",
        Course => "course",
        Instructor => "instructor",
        Subject => "subject",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Absence {
    pub date: String,
    pub reason: String,
    pub duration: String,
    pub schedule: String,
    pub course: String,
    pub instructor: String,
    pub subject: String,
}

impl Record for Absence {
    type Field = AbsenceField;

    fn get(&self, field: AbsenceField) -> String {
        match field {
            AbsenceField::Date => self.date.clone(),
            AbsenceField::Reason => self.reason.clone(),
            AbsenceField::Duration => self.duration.clone(),
            AbsenceField::Schedule => self.schedule.clone(),
            AbsenceField::Course => self.course.clone(),
            AbsenceField::Instructor => self.instructor.clone(),
            AbsenceField::Subject => self.subject.clone(),
        }
    }
}

impl fmt::Display for Absence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Absence(date='{}', reason='{}', duration='{}', subject='{}')",
            self.date, self.reason, self.duration, self.subject
        )
    }
}

field_enum! {
    pub enum EventField {
        Id => "id",
        Title => "title",
        Start => "start",
        End => "end",
        AllDay => "allDay",
        ClassName => "className",
    }
}

/// Schedule event as served by the calendar widget. Timestamps are kept
/// as the server renders them (`2024-05-27T08:00:00+0200`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub class_name: String,
}

impl Record for PlanningEvent {
    type Field = EventField;

    fn get(&self, field: EventField) -> String {
        match field {
            EventField::Id => self.id.clone(),
            EventField::Title => self.title.clone(),
            EventField::Start => self.start.clone(),
            EventField::End => self.end.clone(),
            EventField::AllDay => self.all_day.to_string(),
            EventField::ClassName => self.class_name.clone(),
        }
    }
}

impl fmt::Display for PlanningEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlanningEvent(title='{}', start='{}', end='{}')",
            self.title, self.start, self.end
        )
    }
}

pub type GradeReport = Report<Grade>;
pub type AbsenceReport = Report<Absence>;
pub type PlanningReport = Report<PlanningEvent>;

field_enum! {
    pub enum UserField {
        FirstName => "firstName",
        LastName => "lastName",
        FullName => "fullName",
        Email => "email",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
}

impl UserInfo {
    /// Split a display name such as `DUPONT Jean-Pierre` into its parts.
    /// Upper-case words form the last name, capitalized ones the first name.
    pub fn from_display_name(display_name: &str) -> Self {
        let mut first = Vec::new();
        let mut last = Vec::new();
        for word in display_name.split_whitespace() {
            if word == word.to_uppercase() {
                last.push(word);
            } else if word.chars().next().is_some_and(char::is_uppercase) {
                first.push(word);
            }
        }

        let email = format!(
            "{}.{}@{MAIL_DOMAIN}",
            first.join("-").to_lowercase(),
            last.join("-").to_lowercase()
        );
        Self {
            first_name: first.join(" "),
            last_name: last.join(" "),
            full_name: display_name.trim().to_string(),
            email: strip_accents(&email),
        }
    }
}

fn strip_accents(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' | 'í' | 'ì' => 'i',
            'ô' | 'ö' | 'ó' | 'ò' | 'õ' => 'o',
            'ù' | 'û' | 'ü' | 'ú' => 'u',
            'ÿ' => 'y',
            'ç' => 'c',
            'ñ' => 'n',
            c => c,
        })
        .collect()
}

impl Record for UserInfo {
    type Field = UserField;

    fn get(&self, field: UserField) -> String {
        match field {
            UserField::FirstName => self.first_name.clone(),
            UserField::LastName => self.last_name.clone(),
            UserField::FullName => self.full_name.clone(),
            UserField::Email => self.email.clone(),
        }
    }
}

impl fmt::Display for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UserInfo(firstName='{}', lastName='{}', email='{}')",
            self.first_name, self.last_name, self.email
        )
    }
}

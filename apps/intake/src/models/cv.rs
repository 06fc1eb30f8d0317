use serde::{Deserialize, Serialize};

pub use crate::nic::Gender;

/// Grades accepted for any O/L or A/L subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Grade {
    #[default]
    #[serde(rename = "")]
    Unset,
    A,
    B,
    C,
    S,
    F,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlStream {
    #[default]
    #[serde(rename = "")]
    Unset,
    Science,
    Commerce,
    Arts,
    Technology,
}

/// The six compulsory O/L subjects, keyed by subject name on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CoreGrades {
    pub mathematics: Grade,
    pub science: Grade,
    pub english: Grade,
    pub sinhala: Grade,
    pub history: Grade,
    pub religion: Grade,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectGrade {
    pub subject: String,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Personal {
    pub full_name: String,
    pub email: String,
    pub nic: String,
    /// `YYYY-MM-DD`, either typed by the user or derived from the NIC.
    pub dob: String,
    pub gender: Gender,
    pub whatsapp: String,
    #[serde(rename = "phoneSameAsWA")]
    pub phone_same_as_wa: bool,
    pub phone: String,
    /// Profile photo as a `data:` URL.
    pub photo: Option<String>,
}

impl Default for Personal {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            nic: String::new(),
            dob: String::new(),
            gender: Gender::Unspecified,
            whatsapp: String::new(),
            phone_same_as_wa: true,
            phone: String::new(),
            photo: None,
        }
    }
}

impl Personal {
    /// Contact number, falling back to WhatsApp when the user marked them as the same.
    pub fn effective_phone(&self) -> &str {
        if self.phone_same_as_wa {
            &self.whatsapp
        } else {
            &self.phone
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OLevelAttempt {
    pub index: String,
    pub year: String,
    pub core: CoreGrades,
    pub category_subjects: Vec<SubjectGrade>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ALevel {
    pub completed: bool,
    pub index: String,
    pub school: String,
    pub year: String,
    pub stream: AlStream,
    pub subjects: Vec<SubjectGrade>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkEntry {
    pub title: String,
    pub company: String,
    pub from: String,
    pub to: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEntry {
    pub name: String,
    pub level: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationEntry {
    pub name: String,
    pub institution: String,
    pub year: String,
    pub duration: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraEntry {
    pub name: String,
    pub role: String,
    pub from: String,
    pub to: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
    pub name: String,
    pub workplace: String,
    pub position: String,
    pub phone: String,
}

/// Everything the intake wizard collects for one CV order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvDocument {
    pub personal: Personal,
    pub olevels: Vec<OLevelAttempt>,
    pub alevel: ALevel,
    pub work: Vec<WorkEntry>,
    pub skills: Vec<SkillEntry>,
    pub qualifications: Vec<QualificationEntry>,
    pub extras: Vec<ExtraEntry>,
    pub references: Vec<Reference>,
    pub profile: String,
}

impl Default for CvDocument {
    fn default() -> Self {
        Self {
            personal: Personal::default(),
            olevels: vec![OLevelAttempt::default()],
            alevel: ALevel::default(),
            work: Vec::new(),
            skills: Vec::new(),
            qualifications: Vec::new(),
            extras: Vec::new(),
            references: vec![Reference::default()],
            profile: String::new(),
        }
    }
}

/// Body sent to the backend: the whole document plus the ordered template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[serde(flatten)]
    pub document: CvDocument,
    pub template_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_document_shape() {
        let value = serde_json::to_value(CvDocument::default()).unwrap();
        assert_eq!(value["personal"]["fullName"], "");
        assert_eq!(value["personal"]["phoneSameAsWA"], true);
        assert_eq!(value["personal"]["photo"], serde_json::Value::Null);
        assert_eq!(value["olevels"].as_array().unwrap().len(), 1);
        assert_eq!(value["olevels"][0]["core"]["Mathematics"], "");
        assert_eq!(value["olevels"][0]["categorySubjects"], json!([]));
        assert_eq!(value["alevel"]["completed"], false);
        assert_eq!(value["references"][0]["workplace"], "");
        assert_eq!(value["profile"], "");
    }

    #[test]
    fn test_round_trip_default() {
        let doc = CvDocument::default();
        let text = serde_json::to_string(&doc).unwrap();
        let back: CvDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn test_grades_serialize_to_wire_names() {
        let grades = [
            Grade::Unset,
            Grade::A,
            Grade::B,
            Grade::C,
            Grade::S,
            Grade::F,
            Grade::Absent,
        ];
        let wire: Vec<String> = grades
            .iter()
            .map(|g| serde_json::to_value(g).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(wire, vec!["", "A", "B", "C", "S", "F", "Absent"]);
    }

    #[test]
    fn test_unknown_grade_is_rejected() {
        assert!(serde_json::from_value::<Grade>(json!("Z")).is_err());
    }

    #[test]
    fn test_core_grades_use_subject_names() {
        let core: CoreGrades = serde_json::from_value(json!({"History": "B"})).unwrap();
        assert_eq!(core.history, Grade::B);
        assert_eq!(core.mathematics, Grade::Unset);
        let value = serde_json::to_value(&core).unwrap();
        assert_eq!(value["Religion"], "");
    }

    #[test]
    fn test_effective_phone() {
        let mut p = Personal {
            whatsapp: "0771234567".into(),
            phone: "0112345678".into(),
            ..Personal::default()
        };
        assert_eq!(p.effective_phone(), "0771234567");
        p.phone_same_as_wa = false;
        assert_eq!(p.effective_phone(), "0112345678");
    }

    #[test]
    fn test_submission_payload_flattens_document() {
        let payload = SubmissionPayload {
            document: CvDocument::default(),
            template_id: "3".into(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["templateId"], "3");
        assert!(value.get("personal").is_some());
        assert!(value.get("document").is_none());
    }
}

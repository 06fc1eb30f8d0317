use serde::Serialize;

use crate::models::cv::CvDocument;

const NOT_PROVIDED: &str = "Not provided";
const SAME_AS_WHATSAPP: &str = "Same as WhatsApp";

/// What the final step shows before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    pub name: String,
    pub email: String,
    pub nic: String,
    pub date_of_birth: String,
    pub gender: String,
    pub whatsapp: String,
    pub phone: String,
    pub has_photo: bool,
    pub olevel_attempts: usize,
    pub alevel_completed: bool,
    pub qualifications: usize,
    pub work_experiences: usize,
    pub skills: usize,
    pub extracurricular_activities: usize,
    pub references: usize,
}

fn or_not_provided(value: &str) -> String {
    if value.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        value.to_string()
    }
}

impl ReviewSummary {
    pub fn of(document: &CvDocument) -> Self {
        let p = &document.personal;
        ReviewSummary {
            name: p.full_name.clone(),
            email: p.email.clone(),
            nic: or_not_provided(&p.nic),
            date_of_birth: or_not_provided(&p.dob),
            gender: or_not_provided(p.gender.as_str()),
            whatsapp: p.whatsapp.clone(),
            phone: if p.phone_same_as_wa {
                SAME_AS_WHATSAPP.to_string()
            } else {
                or_not_provided(p.effective_phone())
            },
            has_photo: p.photo.is_some(),
            olevel_attempts: document.olevels.len(),
            alevel_completed: document.alevel.completed,
            qualifications: document.qualifications.len(),
            work_experiences: document.work.len(),
            skills: document.skills.len(),
            extracurricular_activities: document.extras.len(),
            references: document.references.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cv::{Gender, SkillEntry};

    #[test]
    fn test_defaults_show_not_provided() {
        let summary = ReviewSummary::of(&CvDocument::default());
        assert_eq!(summary.nic, "Not provided");
        assert_eq!(summary.date_of_birth, "Not provided");
        assert_eq!(summary.gender, "Not provided");
        assert_eq!(summary.phone, "Same as WhatsApp");
        assert_eq!(summary.olevel_attempts, 1);
        assert_eq!(summary.references, 1);
        assert_eq!(summary.work_experiences, 0);
    }

    #[test]
    fn test_counts_and_separate_phone() {
        let mut doc = CvDocument::default();
        doc.personal.phone_same_as_wa = false;
        doc.personal.phone = "0112345678".into();
        doc.personal.gender = Gender::Female;
        doc.skills.push(SkillEntry::default());
        doc.skills.push(SkillEntry::default());
        doc.alevel.completed = true;

        let summary = ReviewSummary::of(&doc);
        assert_eq!(summary.phone, "0112345678");
        assert_eq!(summary.gender, "Female");
        assert_eq!(summary.skills, 2);
        assert!(summary.alevel_completed);

        doc.personal.phone.clear();
        assert_eq!(ReviewSummary::of(&doc).phone, "Not provided");
    }
}

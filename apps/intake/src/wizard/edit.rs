//! Document mutations.
//!
//! Dot-path operations (`personal.fullName`, `olevels.0.core.Mathematics`)
//! exist for the JSON API; Rust callers use the typed [`Entry`] and
//! [`ListSection`] helpers. Path operations only rebuild the top-level
//! section they address and leave the document untouched on error.
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::cv::{
    CvDocument, ExtraEntry, OLevelAttempt, QualificationEntry, Reference, SkillEntry, WorkEntry,
};

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Path is empty")]
    EmptyPath,

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("'{0}' is not a list")]
    NotAList(String),

    #[error("Invalid value for '{path}': {source}")]
    InvalidValue {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("At least one entry is required in '{0}'")]
    LastEntry(String),
}

/// Lists that always keep at least one entry.
const NON_EMPTY_LISTS: &[&str] = &["olevels", "references"];

/// Replaces the value at `path`. The target must already exist.
pub fn set_field(document: &mut CvDocument, path: &str, value: Value) -> Result<(), EditError> {
    apply(document, path, |target| {
        *target = value;
        Ok(())
    })
}

/// Appends `item` to the list at `path`.
pub fn append_item(document: &mut CvDocument, path: &str, item: Value) -> Result<(), EditError> {
    apply(document, path, |target| {
        let list = target
            .as_array_mut()
            .ok_or_else(|| EditError::NotAList(path.to_string()))?;
        list.push(item);
        Ok(())
    })
}

/// Removes the element at `index` from the list at `path`.
///
/// Returns `Ok(false)` when `index` is out of range.
pub fn remove_item(document: &mut CvDocument, path: &str, index: usize) -> Result<bool, EditError> {
    let mut removed = false;
    apply(document, path, |target| {
        let list = target
            .as_array_mut()
            .ok_or_else(|| EditError::NotAList(path.to_string()))?;
        if index >= list.len() {
            return Ok(());
        }
        list.remove(index);
        removed = true;
        Ok(())
    })?;
    Ok(removed)
}

fn apply(
    document: &mut CvDocument,
    path: &str,
    op: impl FnOnce(&mut Value) -> Result<(), EditError>,
) -> Result<(), EditError> {
    let mut segments = path.split('.');
    let section = match segments.next() {
        Some(s) if !s.is_empty() => s,
        _ => return Err(EditError::EmptyPath),
    };
    let rest: Vec<&str> = segments.collect();

    let op = |root: &mut Value| -> Result<(), EditError> {
        let target = navigate(root, &rest, path)?;
        op(target)?;
        if NON_EMPTY_LISTS.contains(&section) && root.as_array().is_some_and(Vec::is_empty) {
            return Err(EditError::LastEntry(section.to_string()));
        }
        Ok(())
    };

    match section {
        "personal" => patch(&mut document.personal, path, op),
        "olevels" => patch(&mut document.olevels, path, op),
        "alevel" => patch(&mut document.alevel, path, op),
        "work" => patch(&mut document.work, path, op),
        "skills" => patch(&mut document.skills, path, op),
        "qualifications" => patch(&mut document.qualifications, path, op),
        "extras" => patch(&mut document.extras, path, op),
        "references" => patch(&mut document.references, path, op),
        "profile" => patch(&mut document.profile, path, op),
        other => Err(EditError::UnknownField(other.to_string())),
    }
}

/// Round-trips one section through JSON, committing only if the edited value
/// still deserializes.
fn patch<T: Serialize + DeserializeOwned>(
    section: &mut T,
    path: &str,
    op: impl FnOnce(&mut Value) -> Result<(), EditError>,
) -> Result<(), EditError> {
    let invalid = |source| EditError::InvalidValue {
        path: path.to_string(),
        source,
    };
    let mut value = serde_json::to_value(&*section).map_err(invalid)?;
    op(&mut value)?;
    *section = serde_json::from_value(value).map_err(invalid)?;
    Ok(())
}

fn navigate<'a>(
    mut current: &'a mut Value,
    segments: &[&str],
    path: &str,
) -> Result<&'a mut Value, EditError> {
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get_mut(*segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(move |i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| EditError::UnknownField(path.to_string()))?;
    }
    Ok(current)
}

/// A new list entry for one of the repeatable sections.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    OLevel(OLevelAttempt),
    Work(WorkEntry),
    Skill(SkillEntry),
    Qualification(QualificationEntry),
    Extra(ExtraEntry),
    Reference(Reference),
}

/// Top-level repeatable sections, named as in the document JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListSection {
    OLevels,
    Work,
    Skills,
    Qualifications,
    Extras,
    References,
}

impl ListSection {
    pub fn key(self) -> &'static str {
        match self {
            ListSection::OLevels => "olevels",
            ListSection::Work => "work",
            ListSection::Skills => "skills",
            ListSection::Qualifications => "qualifications",
            ListSection::Extras => "extras",
            ListSection::References => "references",
        }
    }
}

impl Entry {
    /// Reads a JSON entry for `section`; missing fields take their defaults.
    pub fn from_json(section: ListSection, value: Value) -> Result<Entry, EditError> {
        let invalid = |source| EditError::InvalidValue {
            path: section.key().to_string(),
            source,
        };
        Ok(match section {
            ListSection::OLevels => Entry::OLevel(serde_json::from_value(value).map_err(invalid)?),
            ListSection::Work => Entry::Work(serde_json::from_value(value).map_err(invalid)?),
            ListSection::Skills => Entry::Skill(serde_json::from_value(value).map_err(invalid)?),
            ListSection::Qualifications => {
                Entry::Qualification(serde_json::from_value(value).map_err(invalid)?)
            }
            ListSection::Extras => Entry::Extra(serde_json::from_value(value).map_err(invalid)?),
            ListSection::References => {
                Entry::Reference(serde_json::from_value(value).map_err(invalid)?)
            }
        })
    }
}

pub fn append_entry(document: &mut CvDocument, entry: Entry) {
    match entry {
        Entry::OLevel(e) => document.olevels.push(e),
        Entry::Work(e) => document.work.push(e),
        Entry::Skill(e) => document.skills.push(e),
        Entry::Qualification(e) => document.qualifications.push(e),
        Entry::Extra(e) => document.extras.push(e),
        Entry::Reference(e) => document.references.push(e),
    }
}

pub fn remove_entry(
    document: &mut CvDocument,
    section: ListSection,
    index: usize,
) -> Result<bool, EditError> {
    fn remove_at<T>(list: &mut Vec<T>, index: usize, keep_one: Option<&str>) -> Result<bool, EditError> {
        if index >= list.len() {
            return Ok(false);
        }
        if let Some(key) = keep_one.filter(|_| list.len() == 1) {
            return Err(EditError::LastEntry(key.to_string()));
        }
        list.remove(index);
        Ok(true)
    }

    let key = section.key();
    let keep_one = NON_EMPTY_LISTS.contains(&key).then_some(key);
    match section {
        ListSection::OLevels => remove_at(&mut document.olevels, index, keep_one),
        ListSection::Work => remove_at(&mut document.work, index, keep_one),
        ListSection::Skills => remove_at(&mut document.skills, index, keep_one),
        ListSection::Qualifications => remove_at(&mut document.qualifications, index, keep_one),
        ListSection::Extras => remove_at(&mut document.extras, index, keep_one),
        ListSection::References => remove_at(&mut document.references, index, keep_one),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cv::{Gender, Grade};
    use serde_json::json;

    #[test]
    fn test_set_nested_field() {
        let mut doc = CvDocument::default();
        set_field(&mut doc, "personal.fullName", json!("Nimal Perera")).unwrap();
        assert_eq!(doc.personal.full_name, "Nimal Perera");
        assert_eq!(doc.personal, {
            let mut p = CvDocument::default().personal;
            p.full_name = "Nimal Perera".into();
            p
        });
    }

    #[test]
    fn test_set_through_array_index() {
        let mut doc = CvDocument::default();
        set_field(&mut doc, "olevels.0.core.Mathematics", json!("A")).unwrap();
        assert_eq!(doc.olevels[0].core.mathematics, Grade::A);
        assert_eq!(doc.olevels[0].core.science, Grade::Unset);
    }

    #[test]
    fn test_set_whole_section() {
        let mut doc = CvDocument::default();
        set_field(&mut doc, "profile", json!("Detail-oriented graduate")).unwrap();
        assert_eq!(doc.profile, "Detail-oriented graduate");
    }

    #[test]
    fn test_invalid_value_leaves_document_unchanged() {
        let mut doc = CvDocument::default();
        let before = doc.clone();
        let err = set_field(&mut doc, "personal.gender", json!("Robot")).unwrap_err();
        assert!(matches!(err, EditError::InvalidValue { .. }));
        assert_eq!(doc, before);

        set_field(&mut doc, "olevels.0.core.English", json!("Z")).unwrap_err();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_gender_accepts_wire_names() {
        let mut doc = CvDocument::default();
        set_field(&mut doc, "personal.gender", json!("Other")).unwrap();
        assert_eq!(doc.personal.gender, Gender::Other);
    }

    #[test]
    fn test_unknown_paths_are_rejected() {
        let mut doc = CvDocument::default();
        assert!(matches!(set_field(&mut doc, "", json!(1)), Err(EditError::EmptyPath)));
        assert!(matches!(
            set_field(&mut doc, "salary", json!(1)),
            Err(EditError::UnknownField(_))
        ));
        assert!(matches!(
            set_field(&mut doc, "personal.middleName", json!("x")),
            Err(EditError::UnknownField(_))
        ));
        assert!(matches!(
            set_field(&mut doc, "olevels.3.year", json!("2015")),
            Err(EditError::UnknownField(_))
        ));
    }

    #[test]
    fn test_append_preserves_other_sections() {
        let mut doc = CvDocument::default();
        doc.personal.full_name = "Nimal".into();
        doc.work.push(WorkEntry {
            title: "Clerk".into(),
            ..WorkEntry::default()
        });
        let before = doc.clone();

        append_item(&mut doc, "olevels", serde_json::to_value(OLevelAttempt::default()).unwrap())
            .unwrap();

        assert_eq!(doc.olevels.len(), before.olevels.len() + 1);
        assert_eq!(doc.olevels[0], before.olevels[0]);
        assert_eq!(doc.personal, before.personal);
        assert_eq!(doc.alevel, before.alevel);
        assert_eq!(doc.work, before.work);
        assert_eq!(doc.skills, before.skills);
        assert_eq!(doc.qualifications, before.qualifications);
        assert_eq!(doc.extras, before.extras);
        assert_eq!(doc.references, before.references);
        assert_eq!(doc.profile, before.profile);
    }

    #[test]
    fn test_append_nested_list_fills_defaults() {
        let mut doc = CvDocument::default();
        append_item(&mut doc, "olevels.0.categorySubjects", json!({"subject": "ICT"})).unwrap();
        assert_eq!(doc.olevels[0].category_subjects[0].subject, "ICT");
        assert_eq!(doc.olevels[0].category_subjects[0].grade, Grade::Unset);
    }

    #[test]
    fn test_append_to_non_list() {
        let mut doc = CvDocument::default();
        assert!(matches!(
            append_item(&mut doc, "profile", json!("x")),
            Err(EditError::NotAList(_))
        ));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut doc = CvDocument::default();
        for title in ["A", "B", "C"] {
            append_entry(
                &mut doc,
                Entry::Work(WorkEntry {
                    title: title.into(),
                    ..WorkEntry::default()
                }),
            );
        }
        assert!(remove_item(&mut doc, "work", 1).unwrap());
        let titles: Vec<_> = doc.work.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut doc = CvDocument::default();
        let before = doc.clone();
        assert!(!remove_item(&mut doc, "work", 0).unwrap());
        assert!(!remove_item(&mut doc, "references", 5).unwrap());
        assert!(!remove_entry(&mut doc, ListSection::Skills, 2).unwrap());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_last_olevel_and_reference_are_kept() {
        let mut doc = CvDocument::default();
        assert!(matches!(
            remove_item(&mut doc, "olevels", 0),
            Err(EditError::LastEntry(_))
        ));
        assert!(matches!(
            remove_entry(&mut doc, ListSection::References, 0),
            Err(EditError::LastEntry(_))
        ));
        assert_eq!(doc.olevels.len(), 1);
        assert_eq!(doc.references.len(), 1);

        append_entry(&mut doc, Entry::Reference(Reference::default()));
        assert!(remove_entry(&mut doc, ListSection::References, 1).unwrap());
    }

    #[test]
    fn test_replacing_required_list_with_empty_is_rejected() {
        let mut doc = CvDocument::default();
        let before = doc.clone();
        assert!(matches!(
            set_field(&mut doc, "olevels", json!([])),
            Err(EditError::LastEntry(_))
        ));
        assert!(matches!(
            set_field(&mut doc, "references", json!([])),
            Err(EditError::LastEntry(_))
        ));
        assert_eq!(doc, before);

        set_field(&mut doc, "work", json!([])).unwrap();
        set_field(&mut doc, "references", json!([{"name": "Kamal"}])).unwrap();
        assert_eq!(doc.references[0].name, "Kamal");
    }

    #[test]
    fn test_entry_from_json() {
        let section: ListSection = serde_json::from_value(json!("qualifications")).unwrap();
        assert_eq!(section, ListSection::Qualifications);

        let entry = Entry::from_json(section, json!({"name": "NVQ 4", "year": "2021"})).unwrap();
        let mut doc = CvDocument::default();
        append_entry(&mut doc, entry);
        assert_eq!(doc.qualifications[0].name, "NVQ 4");
        assert_eq!(doc.qualifications[0].institution, "");

        assert!(matches!(
            Entry::from_json(ListSection::Work, json!("Clerk")),
            Err(EditError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_nested_lists_may_become_empty() {
        let mut doc = CvDocument::default();
        append_item(&mut doc, "alevel.subjects", json!({"subject": "Physics", "grade": "B"})).unwrap();
        assert!(remove_item(&mut doc, "alevel.subjects", 0).unwrap());
        assert!(doc.alevel.subjects.is_empty());
    }
}

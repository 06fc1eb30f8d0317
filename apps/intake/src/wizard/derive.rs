use crate::models::cv::{CvDocument, Gender};
use crate::nic::decode_nic;

/// Shortest NIC worth decoding while the user is still typing.
const MIN_NIC_LEN: usize = 9;

/// Fields to overwrite after a NIC edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicDerivation {
    pub dob: String,
    pub gender: Gender,
}

/// Date of birth and gender implied by the document's NIC, if it decodes.
///
/// Partial or malformed input yields `None`; the user is not warned while typing.
pub fn derive_from_nic(document: &CvDocument) -> Option<NicDerivation> {
    let nic = &document.personal.nic;
    if nic.chars().count() < MIN_NIC_LEN {
        return None;
    }
    let info = decode_nic(nic).ok()?;
    Some(NicDerivation {
        dob: info.dob_string(),
        gender: info.gender,
    })
}

impl NicDerivation {
    pub fn apply(self, document: &mut CvDocument) {
        document.personal.dob = self.dob;
        document.personal.gender = self.gender;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_nic(nic: &str) -> CvDocument {
        let mut doc = CvDocument::default();
        doc.personal.nic = nic.into();
        doc
    }

    #[test]
    fn test_derives_from_valid_nic() {
        let derived = derive_from_nic(&with_nic("200755700479")).unwrap();
        assert_eq!(derived.dob, "2007-02-26");
        assert_eq!(derived.gender, Gender::Female);
    }

    #[test]
    fn test_short_input_is_skipped() {
        assert_eq!(derive_from_nic(&with_nic("97123")), None);
        assert_eq!(derive_from_nic(&with_nic("")), None);
    }

    #[test]
    fn test_undecodable_input_is_skipped() {
        assert_eq!(derive_from_nic(&with_nic("9712345678")), None);
        assert_eq!(derive_from_nic(&with_nic("850001234V")), None);
    }

    #[test]
    fn test_apply_overwrites_only_dob_and_gender() {
        let mut doc = with_nic("971234567V");
        doc.personal.dob = "2001-01-01".into();
        doc.personal.full_name = "Kamal".into();
        derive_from_nic(&doc).unwrap().apply(&mut doc);
        assert_eq!(doc.personal.dob, "1997-05-03");
        assert_eq!(doc.personal.gender, Gender::Male);
        assert_eq!(doc.personal.full_name, "Kamal");
    }
}

/// Sri Lankan National Identity Card decoding.
///
/// Two card formats are in circulation:
/// - old: `YYDDDSSSSV` (9 digits followed by `V` or `X`)
/// - new: `YYYYDDDSSSSS` (12 digits)
///
/// `DDD` is the day of the birth year, offset by 500 for women.
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const FEMALE_DAY_OFFSET: u32 = 500;
const MAX_DAY_OF_YEAR: u32 = 366;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NicError {
    #[error("NIC required")]
    Required,

    #[error("NIC format not recognized")]
    FormatNotRecognized,

    #[error("NIC day-of-year invalid")]
    DayOfYearInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Unspecified => "",
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

/// Fields derived from a successfully decoded NIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NicInfo {
    pub dob: NaiveDate,
    pub gender: Gender,
}

impl NicInfo {
    /// Date of birth formatted as `YYYY-MM-DD`.
    pub fn dob_string(&self) -> String {
        self.dob.format("%Y-%m-%d").to_string()
    }
}

/// JSON view of a decode attempt, as returned to the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicParseResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl From<Result<NicInfo, NicError>> for NicParseResult {
    fn from(result: Result<NicInfo, NicError>) -> Self {
        match result {
            Ok(info) => NicParseResult {
                ok: true,
                dob: Some(info.dob_string()),
                gender: Some(info.gender.as_str().to_string()),
                msg: None,
            },
            Err(e) => NicParseResult {
                ok: false,
                dob: None,
                gender: None,
                msg: Some(e.to_string()),
            },
        }
    }
}

fn old_format() -> &'static Regex {
    static OLD_FORMAT: OnceLock<Regex> = OnceLock::new();
    OLD_FORMAT.get_or_init(|| Regex::new(r"^([0-9]{9})[VX]$").expect("valid NIC regex"))
}

/// Decodes a raw NIC string into date of birth and gender.
///
/// Input is trimmed and uppercased. When the old `#########V` shape does not
/// match, every non-digit is stripped and the remaining digit count decides
/// the format.
pub fn decode_nic(raw: &str) -> Result<NicInfo, NicError> {
    if raw.is_empty() {
        return Err(NicError::Required);
    }

    let nic = raw.trim().to_uppercase();
    let digits: String = match old_format().captures(&nic) {
        Some(caps) => caps[1].to_string(),
        None => nic.chars().filter(|c| c.is_ascii_digit()).collect(),
    };

    let (year, day_code) = match digits.len() {
        9 => (1900 + parse_digits(&digits[0..2])?, parse_digits(&digits[2..5])?),
        12 => (parse_digits(&digits[0..4])?, parse_digits(&digits[4..7])?),
        _ => return Err(NicError::FormatNotRecognized),
    };

    let (gender, day) = if day_code > FEMALE_DAY_OFFSET {
        (Gender::Female, day_code - FEMALE_DAY_OFFSET)
    } else {
        (Gender::Male, day_code)
    };

    if !(1..=MAX_DAY_OF_YEAR).contains(&day) {
        return Err(NicError::DayOfYearInvalid);
    }

    // Day 366 only exists in leap years.
    let year = i32::try_from(year).map_err(|_| NicError::FormatNotRecognized)?;
    let dob = NaiveDate::from_yo_opt(year, day).ok_or(NicError::DayOfYearInvalid)?;

    Ok(NicInfo { dob, gender })
}

fn parse_digits(s: &str) -> Result<u32, NicError> {
    s.parse::<u32>().map_err(|_| NicError::FormatNotRecognized)
}

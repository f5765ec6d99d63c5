//! Field decoding for raw card payloads.
//!
//! All offsets are in characters of the decoded payload, which equal byte
//! offsets on the card (see [`crate::tis620`]).

use crate::error::DecodeError;
use crate::types::{AddressParts, Gender, PersonName};

/// Offset between the Buddhist Era and the Gregorian calendar.
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

const NAME_FIELD_LEN: usize = 100;
const BIRTH_DATE_START: usize = 2 * NAME_FIELD_LEN;
const GENDER_POS: usize = BIRTH_DATE_START + 8;

/// Personal information block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalInfo {
    pub name_th: PersonName,
    pub name_en: PersonName,
    pub birthday: String,
    pub gender: Gender,
}

/// Address in both forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub parts: AddressParts,
    pub joined: String,
}

/// Characters `[start, end)` of `raw`, or `TooShort` if `raw` ends first.
fn slice_chars(raw: &str, start: usize, end: usize, field: &'static str) -> Result<String, DecodeError> {
    let actual = raw.chars().count();
    if actual < end {
        return Err(DecodeError::TooShort {
            field,
            needed: end,
            actual,
        });
    }
    Ok(raw.chars().skip(start).take(end - start).collect())
}

/// Convert a Buddhist Era `YYYYMMDD` date to Gregorian `YYYY-MM-DD`.
///
/// Month and day are copied verbatim. The year must parse as an integer,
/// otherwise the date is `InvalidDate`.
pub fn decode_date(raw: &str, field: &'static str) -> Result<String, DecodeError> {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() < 8 {
        return Err(DecodeError::TooShort {
            field,
            needed: 8,
            actual: chars.len(),
        });
    }

    let year: String = chars[0..4].iter().collect();
    let month: String = chars[4..6].iter().collect();
    let day: String = chars[6..8].iter().collect();

    let year: i32 = year
        .parse()
        .map_err(|_| DecodeError::InvalidDate {
            field,
            value: raw.to_string(),
        })?;

    Ok(format!("{}-{}-{}", year - BUDDHIST_ERA_OFFSET, month, day))
}

/// Split a `#`-delimited name into its four slots.
pub fn decode_name(raw: &str) -> PersonName {
    let mut slots = raw.trim().split('#').map(|slot| slot.trim().to_string());
    PersonName {
        title: slots.next().unwrap_or_default(),
        first: slots.next().unwrap_or_default(),
        middle: slots.next().unwrap_or_default(),
        last: slots.next().unwrap_or_default(),
    }
}

pub fn decode_gender(flag: Option<char>) -> Gender {
    match flag {
        Some('1') => Gender::Male,
        Some('2') => Gender::Female,
        _ => Gender::Other,
    }
}

/// Decode the personal information block: Thai name, English name,
/// birth date and gender flag.
pub fn decode_personal_info(raw: &str) -> Result<PersonalInfo, DecodeError> {
    let thai = slice_chars(raw, 0, NAME_FIELD_LEN, "personal_info")?;
    let english = slice_chars(raw, NAME_FIELD_LEN, BIRTH_DATE_START, "personal_info")?;
    let birth = slice_chars(raw, BIRTH_DATE_START, GENDER_POS, "personal_info")?;

    Ok(PersonalInfo {
        name_th: decode_name(&thai),
        name_en: decode_name(&english),
        birthday: decode_date(&birth, "birthday")?,
        gender: decode_gender(raw.chars().nth(GENDER_POS)),
    })
}

/// Decode a `#`-delimited address.
///
/// Slot 4 is left out of the structured parts but kept in the joined
/// string when it is not empty.
pub fn decode_address(raw: &str) -> Address {
    let slots: Vec<&str> = raw.split('#').map(str::trim).collect();
    let slot = |i: usize| slots.get(i).copied().unwrap_or_default().to_string();

    let parts = AddressParts {
        house_no: slot(0),
        village_no: slot(1),
        lane: slot(2),
        road: slot(3),
        sub_district: slot(5),
        district: slot(6),
        province: slot(7),
    };

    let joined = slots
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    Address { parts, joined }
}

/// Decode the issue and expiry dates.
pub fn decode_issue_expire(raw: &str) -> Result<(String, String), DecodeError> {
    let issue = slice_chars(raw, 0, 8, "issue_expire")?;
    let expire = slice_chars(raw, 8, 16, "issue_expire")?;
    Ok((decode_date(&issue, "issue")?, decode_date(&expire, "expire")?))
}

//! Maps loosely formatted client labels to the codes stored on `child_info`.
//!
//! Nothing here rejects input: a label that cannot be classified is kept as
//! a display name with null codes.

use serde_json::Value;

/// Separates the stage from the grade in labels such as `"小学·二年级"`.
pub const STAGE_SEPARATOR: char = '·';

const PRESCHOOL_KEYWORD: &str = "幼儿园";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Unknown,
    Male,
    Female,
}

impl Gender {
    pub fn code(self) -> i16 {
        match self {
            Gender::Unknown => -1,
            Gender::Male => 0,
            Gender::Female => 1,
        }
    }
}

/// Gender from `"男"`/`"女"`, `"0"`/`"1"` or `0`/`1`.
///
/// Absent, `null`, `""` and `false` give [`Gender::Unknown`]. Anything else
/// that is not recognised as female is stored as male.
pub fn normalize_gender(value: Option<&Value>) -> Gender {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Gender::Unknown,
        Some(Value::String(s)) if s.is_empty() => Gender::Unknown,
        Some(Value::String(s)) if s == "女" || s == "1" => Gender::Female,
        Some(Value::Number(n)) if n.as_f64() == Some(1.0) => Gender::Female,
        Some(_) => Gender::Male,
    }
}

/// The `(grade_type, grade_code, grade_name)` columns. All three are null
/// together for absent input; only `grade_name` is set for unmatched input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradeInfo {
    pub grade_type: Option<i16>,
    pub grade_code: Option<String>,
    pub grade_name: Option<String>,
}

struct GradeEntry {
    label: &'static str,
    grade_type: i16,
    code: &'static str,
    name: &'static str,
}

impl From<&GradeEntry> for GradeInfo {
    fn from(entry: &GradeEntry) -> Self {
        GradeInfo {
            grade_type: Some(entry.grade_type),
            grade_code: Some(entry.code.to_string()),
            grade_name: Some(entry.name.to_string()),
        }
    }
}

const fn grade(label: &'static str, grade_type: i16, code: &'static str, name: &'static str) -> GradeEntry {
    GradeEntry { label, grade_type, code, name }
}

const PRESCHOOL_ENTRIES: usize = 3;

// Matching walks this table in order and the first contained label wins.
static GRADE_TABLE: [GradeEntry; 15] = [
    grade("小班", 1, "YK_XB", "幼儿园小班"),
    grade("中班", 1, "YK_ZB", "幼儿园中班"),
    grade("大班", 1, "YK_DB", "幼儿园大班"),
    grade("一年级", 2, "XX_01", "小学一年级"),
    grade("二年级", 2, "XX_02", "小学二年级"),
    grade("三年级", 2, "XX_03", "小学三年级"),
    grade("四年级", 2, "XX_04", "小学四年级"),
    grade("五年级", 2, "XX_05", "小学五年级"),
    grade("六年级", 2, "XX_06", "小学六年级"),
    grade("初一", 3, "CZ_01", "初中一年级"),
    grade("初二", 3, "CZ_02", "初中二年级"),
    grade("初三", 3, "CZ_03", "初中三年级"),
    grade("高一", 4, "GZ_01", "高中一年级"),
    grade("高二", 4, "GZ_02", "高中二年级"),
    grade("高三", 4, "GZ_03", "高中三年级"),
];

/// Classifies a grade label such as `"二年级"` or `"小学·二年级"`.
pub fn normalize_grade(label: Option<&str>) -> GradeInfo {
    let Some(raw) = label.map(str::trim).filter(|s| !s.is_empty()) else {
        return GradeInfo::default();
    };

    let grade_name = raw.rsplit(STAGE_SEPARATOR).next().unwrap_or(raw).trim();
    if let Some(entry) = GRADE_TABLE.iter().find(|e| grade_name.contains(e.label)) {
        return entry.into();
    }

    // "幼儿园小班·..." style labels where the sub-label sits before the separator
    if raw.contains(PRESCHOOL_KEYWORD) {
        if let Some(entry) = GRADE_TABLE[..PRESCHOOL_ENTRIES]
            .iter()
            .find(|e| raw.contains(e.label))
        {
            return entry.into();
        }
    }

    GradeInfo {
        grade_type: None,
        grade_code: None,
        grade_name: Some(raw.to_string()),
    }
}

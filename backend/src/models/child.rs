use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Relation type stored when the caller does not supply one (father).
pub const DEFAULT_RELATION_TYPE: i16 = 1;

pub const RELATION_ACTIVE: i16 = 1;
pub const RELATION_REVOKED: i16 = 0;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Child {
    pub id: i64,
    pub child_name: String,
    /// -1 unknown, 0 male, 1 female
    pub gender: i16,
    pub age: Option<i32>,
    pub grade_type: Option<i16>,
    pub grade_code: Option<String>,
    pub grade_name: Option<String>,
    pub avatar: Option<String>,
    pub remark: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// A child as listed for a parent, with the relation that makes it visible.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChildWithRelation {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub child: Child,
    pub relation_type: i16,
    pub relation_status: i16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateChildRequest {
    pub child_name: Option<String>,
    /// "男" / "女", "0" / "1" or 0 / 1
    pub gender: Option<Value>,
    pub age: Option<i32>,
    /// "二年级" or "小学·二年级"
    pub grade: Option<String>,
    pub avatar: Option<String>,
    pub remark: Option<String>,
    pub relation_type: Option<i16>,
}

impl CreateChildRequest {
    /// The relation type to store, falling back to the default for absent or zero.
    pub fn relation_type(&self) -> i16 {
        self.relation_type
            .filter(|&t| t != 0)
            .unwrap_or(DEFAULT_RELATION_TYPE)
    }
}

/// Partial update. The outer `Option` tells whether the field was sent at
/// all; the inner one carries an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChildRequest {
    #[serde(default, deserialize_with = "present")]
    pub child_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub gender: Option<Option<Value>>,
    #[serde(default, deserialize_with = "present")]
    pub age: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub grade: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub avatar: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub remark: Option<Option<String>>,
}

impl UpdateChildRequest {
    pub fn is_empty(&self) -> bool {
        self.child_name.is_none()
            && self.gender.is_none()
            && self.age.is_none()
            && self.grade.is_none()
            && self.avatar.is_none()
            && self.remark.is_none()
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Empty strings are stored as NULL.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Zero ages are stored as NULL.
pub fn non_zero(age: Option<i32>) -> Option<i32> {
    age.filter(|&a| a != 0)
}

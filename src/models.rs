use serde::{Deserialize, Serialize};

/// One way of reaching a contact. `type` is an open label (手机号码, 邮箱地址,
/// or anything the caller sends), not a closed enum.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ContactMethod {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub notes: String,
    pub bookmarked: bool,
    pub created_at: String,
    pub updated_at: String,
    pub methods: Vec<ContactMethod>,
}

/// Request body for create/update and one row of a bulk import.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ContactInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub bookmarked: bool,
    #[serde(default)]
    pub methods: Vec<MethodInput>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MethodInput {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

/// Outcome of a bulk import. Row failures are soft: the batch still commits.
#[derive(Debug, Serialize, Clone, Default)]
pub struct ImportReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

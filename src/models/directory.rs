//! Directory users and org-chart nodes

use serde::{Deserialize, Serialize};

/// User as returned by the directory API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    pub id: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub job_title: Option<String>,

    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub mail: Option<String>,

    #[serde(default)]
    pub user_principal_name: Option<String>,

    /// Present only when the request expands `manager`
    #[serde(default)]
    pub manager: Option<ManagerRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManagerRef {
    pub id: String,
}

/// Flattened directory user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,

    pub display_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
}

impl From<GraphUser> for DirectoryUser {
    fn from(user: GraphUser) -> Self {
        Self {
            display_name: user.display_name.unwrap_or_default(),
            email: user.mail.or(user.user_principal_name),
            manager_id: user.manager.map(|m| m.id),
            id: user.id,
            job_title: user.job_title,
            department: user.department,
        }
    }
}

/// One node of the org chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgNode {
    pub id: String,
    pub display_name: String,
    pub job_title: String,
    pub department: String,
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    pub children: Vec<OrgNode>,
}

impl From<&DirectoryUser> for OrgNode {
    fn from(user: &DirectoryUser) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            job_title: user.job_title.clone().unwrap_or_default(),
            department: user.department.clone().unwrap_or_default(),
            email: user.email.clone().unwrap_or_default(),
            photo_url: None,
            children: Vec::new(),
        }
    }
}

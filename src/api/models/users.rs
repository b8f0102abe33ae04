use super::common::{FileUpload, NOT_ASSIGNED};
use super::companies::CompanyRecord;
use super::roles::RoleRecord;
use crate::api::transport::MultipartForm;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A console user as returned by `/users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub dni: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn role_name(&self) -> &str {
        self.role.as_ref().map_or(NOT_ASSIGNED, |role| role.name.as_str())
    }

    pub fn company_name(&self) -> &str {
        self.company
            .as_ref()
            .map_or(NOT_ASSIGNED, |company| company.company_name.as_str())
    }
}

/// User form as filled in by an operator
///
/// Serializes as [`UserPayload`]: the selected role goes out by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "UserPayload")]
pub struct UserForm {
    pub dni: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<RoleRecord>,
    pub company_id: Option<i64>,
}

/// Outgoing body of user create/update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPayload {
    pub dni: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<String>,
}

impl UserPayload {
    /// New accounts start with their DNI as password
    pub fn with_initial_password(mut self) -> Self {
        self.password = Some(self.dni.clone());
        self.password_confirmation = Some(self.dni.clone());
        self
    }
}

impl From<UserForm> for UserPayload {
    fn from(form: UserForm) -> Self {
        Self {
            dni: form.dni,
            name: form.name,
            email: form.email,
            phone: form.phone,
            role: form.role.map(|role| role.name),
            company_id: form.company_id,
            password: None,
            password_confirmation: None,
        }
    }
}

/// One row of a bulk user upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub dni: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
    pub password_confirmation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Multipart profile update sent to `PUT /users/{id}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<FileUpload>,
}

impl ProfileUpdate {
    pub fn into_form(self) -> MultipartForm {
        let mut form = MultipartForm::new();
        let fields = [
            ("name", self.name),
            ("email", self.email),
            ("phone", self.phone),
            ("password", self.password),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }
        if let Some(avatar) = self.avatar {
            form = form.file("avatar", avatar.file_name, avatar.bytes);
        }
        form
    }
}

use super::common::FileUpload;
use crate::api::transport::MultipartForm;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: i64,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outgoing body of company create/update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyPayload {
    pub company_name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Multipart logo replacement sent to `PUT /companies/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct LogoUpdate {
    pub logo: FileUpload,
    pub company_name: Option<String>,
}

impl LogoUpdate {
    pub fn into_form(self) -> MultipartForm {
        let mut form = MultipartForm::new();
        if let Some(name) = self.company_name {
            form = form.text("company_name", name);
        }
        form.file("logo", self.logo.file_name, self.logo.bytes)
    }
}

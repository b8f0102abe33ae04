//! Combo-box projections
//!
//! Computed from `collection` on every read and never cached.

use crate::api::models::{CategoryRecord, CompanyRecord, ProviderRecord, RoleRecord, UnitRecord};
use crate::store::entity::{EntityStore, Resource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `{label, value}` choice of a selection widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboOption {
    pub label: String,
    pub value: Value,
}

pub trait ComboSource {
    fn combo_option(&self) -> ComboOption;
}

impl ComboSource for CategoryRecord {
    fn combo_option(&self) -> ComboOption {
        ComboOption {
            label: self.name.clone(),
            value: Value::from(self.id),
        }
    }
}

impl ComboSource for UnitRecord {
    fn combo_option(&self) -> ComboOption {
        ComboOption {
            label: self.symbol.to_uppercase(),
            value: Value::from(self.id),
        }
    }
}

impl ComboSource for ProviderRecord {
    fn combo_option(&self) -> ComboOption {
        ComboOption {
            label: self.name.clone(),
            value: Value::from(self.id),
        }
    }
}

// Roles are assigned by name
impl ComboSource for RoleRecord {
    fn combo_option(&self) -> ComboOption {
        ComboOption {
            label: self.name.to_uppercase(),
            value: Value::from(self.name.clone()),
        }
    }
}

impl ComboSource for CompanyRecord {
    fn combo_option(&self) -> ComboOption {
        ComboOption {
            label: self.company_name.clone(),
            value: Value::from(self.id),
        }
    }
}

/// `None` while the collection itself is unknown
pub fn combo_options<T: ComboSource>(collection: Option<&[T]>) -> Option<Vec<ComboOption>> {
    collection.map(|records| records.iter().map(ComboSource::combo_option).collect())
}

impl<R> EntityStore<R>
where
    R: Resource,
    R::Record: ComboSource,
{
    pub fn options(&self) -> Option<Vec<ComboOption>> {
        let state = self.state().read().unwrap_or_else(|e| e.into_inner());
        combo_options(state.collection.as_deref())
    }
}

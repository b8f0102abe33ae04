//! Backend resources and their resource-specific operations

use crate::api::models::{
    CategoryPayload, CategoryRecord, CategoryRow, CompanyPayload, CompanyRecord, LogoUpdate,
    ProductForm, ProductRecord, ProductRow, ProviderRecord, RoleAssignment, RoleRecord,
    StockMovementPayload, StockMovementRecord, UnitPayload, UnitRecord, UnitRow, UserForm,
    UserPayload, UserRecord, UserRow,
};
use crate::api::{Ack, Envelope};
use crate::core::error::ApiResult;
use crate::store::entity::{to_body, Capabilities, CollectionSync, EntityStore, Resource};
use crate::store::normalize::{optional_id, optional_string, require_id, require_string};
use crate::store::state::{Current, Message};
use serde_json::Value;
use tracing::info;

pub struct Users;

impl Resource for Users {
    type Record = UserRecord;
    type Payload = UserForm;
    type UploadRow = UserRow;

    const NAME: &'static str = "users";
    const COLLECTION_KEY: &'static str = "users";
    const RECORD_KEY: &'static str = "user";
    const PATH: &'static str = "/users";
    const CAPABILITIES: Capabilities = Capabilities::ALL;
    const DEFAULT_SYNC: CollectionSync = CollectionSync::InPlace;

    fn id(record: &UserRecord) -> i64 {
        record.id
    }

    fn create_body(payload: &UserForm) -> ApiResult<Value> {
        to_body(&UserPayload::from(payload.clone()).with_initial_password())
    }

    fn upload_row(row: &Value) -> ApiResult<UserRow> {
        let dni = require_string(row, "dni")?;
        Ok(UserRow {
            name: require_string(row, "name")?,
            phone: optional_string(row, "phone"),
            email: optional_string(row, "email"),
            password: dni.clone(),
            password_confirmation: dni.clone(),
            role: optional_string(row, "role"),
            dni,
        })
    }
}

pub struct Roles;

impl Resource for Roles {
    type Record = RoleRecord;
    type Payload = Value;
    type UploadRow = ();

    const NAME: &'static str = "roles";
    const COLLECTION_KEY: &'static str = "roles";
    const RECORD_KEY: &'static str = "role";
    const PATH: &'static str = "/roles";
    const CAPABILITIES: Capabilities = Capabilities::LIST_ONLY;

    fn id(record: &RoleRecord) -> i64 {
        record.id
    }
}

pub struct Companies;

impl Resource for Companies {
    type Record = CompanyRecord;
    type Payload = CompanyPayload;
    type UploadRow = ();

    const NAME: &'static str = "companies";
    const COLLECTION_KEY: &'static str = "companies";
    const RECORD_KEY: &'static str = "company";
    const PATH: &'static str = "/companies";
    const CAPABILITIES: Capabilities = Capabilities {
        upload: false,
        ..Capabilities::ALL
    };

    fn id(record: &CompanyRecord) -> i64 {
        record.id
    }
}

pub struct Products;

impl Resource for Products {
    type Record = ProductRecord;
    type Payload = ProductForm;
    type UploadRow = ProductRow;

    const NAME: &'static str = "products";
    const COLLECTION_KEY: &'static str = "products";
    const RECORD_KEY: &'static str = "product";
    const PATH: &'static str = "/products";
    const CAPABILITIES: Capabilities = Capabilities::ALL;

    fn id(record: &ProductRecord) -> i64 {
        record.id
    }

    fn upload_row(row: &Value) -> ApiResult<ProductRow> {
        Ok(ProductRow {
            code: require_string(row, "code")?,
            name: require_string(row, "name")?,
            description: optional_string(row, "description"),
            category_id: require_id(row, "category_id")?,
            unit_id: require_id(row, "unit_id")?,
            user_id: optional_id(row, "user_id")?,
        })
    }
}

pub struct Categories;

impl Resource for Categories {
    type Record = CategoryRecord;
    type Payload = CategoryPayload;
    type UploadRow = CategoryRow;

    const NAME: &'static str = "categories";
    const COLLECTION_KEY: &'static str = "categories";
    const RECORD_KEY: &'static str = "category";
    const PATH: &'static str = "/categories";
    const CAPABILITIES: Capabilities = Capabilities::ALL;

    fn id(record: &CategoryRecord) -> i64 {
        record.id
    }

    fn upload_row(row: &Value) -> ApiResult<CategoryRow> {
        Ok(CategoryRow {
            name: require_string(row, "name")?,
            description: optional_string(row, "description"),
        })
    }
}

pub struct Units;

impl Resource for Units {
    type Record = UnitRecord;
    type Payload = UnitPayload;
    type UploadRow = UnitRow;

    const NAME: &'static str = "units";
    const COLLECTION_KEY: &'static str = "units";
    const RECORD_KEY: &'static str = "unit";
    const PATH: &'static str = "/units";
    const CAPABILITIES: Capabilities = Capabilities::ALL;

    fn id(record: &UnitRecord) -> i64 {
        record.id
    }

    fn upload_row(row: &Value) -> ApiResult<UnitRow> {
        Ok(UnitRow {
            name: require_string(row, "name")?,
            symbol: require_string(row, "symbol")?,
        })
    }
}

pub struct Providers;

impl Resource for Providers {
    type Record = ProviderRecord;
    type Payload = Value;
    type UploadRow = ();

    const NAME: &'static str = "providers";
    const COLLECTION_KEY: &'static str = "providers";
    const RECORD_KEY: &'static str = "provider";
    const PATH: &'static str = "/providers";
    const CAPABILITIES: Capabilities = Capabilities::LIST_ONLY;

    fn id(record: &ProviderRecord) -> i64 {
        record.id
    }
}

pub struct StockMovements;

impl Resource for StockMovements {
    type Record = StockMovementRecord;
    type Payload = StockMovementPayload;
    type UploadRow = ();

    const NAME: &'static str = "stock_movements";
    const COLLECTION_KEY: &'static str = "stockMovements";
    const RECORD_KEY: &'static str = "stockMovement";
    const PATH: &'static str = "/stock-movements";
    const CAPABILITIES: Capabilities = Capabilities {
        list: true,
        create: true,
        ..Capabilities::LIST_ONLY
    };
    // The create response is the stored movement; there is no GET by id
    const REFETCH_CREATED: bool = false;
    const DEFAULT_SYNC: CollectionSync = CollectionSync::InPlace;

    fn id(record: &StockMovementRecord) -> i64 {
        record.id
    }
}

pub type UserStore = EntityStore<Users>;
pub type RoleStore = EntityStore<Roles>;
pub type CompanyStore = EntityStore<Companies>;
pub type ProductStore = EntityStore<Products>;
pub type CategoryStore = EntityStore<Categories>;
pub type UnitStore = EntityStore<Units>;
pub type ProviderStore = EntityStore<Providers>;
pub type StockMovementStore = EntityStore<StockMovements>;

const ROLE_USER_PATH: &str = "/roles/user";

impl EntityStore<Roles> {
    /// Give `role` to a user (`PUT /roles/user`)
    pub async fn assign(&self, user_id: i64, role: &str) -> ApiResult<Ack> {
        let body = RoleAssignment {
            user_id,
            role: role.to_string(),
        };

        let ack = self
            .orchestrator()
            .execute(self.state(), None, Message::<Ack>::new(), || async {
                self.api().put_json::<_, Ack>(ROLE_USER_PATH, &body).await
            })
            .await?;

        info!(user_id, role, "Role assigned");
        Ok(ack)
    }

    /// Take `role` away from a user (`DELETE /roles/user`)
    pub async fn remove(&self, user_id: i64, role: &str) -> ApiResult<Ack> {
        let body = RoleAssignment {
            user_id,
            role: role.to_string(),
        };

        let ack = self
            .orchestrator()
            .execute(self.state(), None, Message::<Ack>::new(), || async {
                self.api().delete_json::<_, Ack>(ROLE_USER_PATH, &body).await
            })
            .await?;

        info!(user_id, role, "Role removed");
        Ok(ack)
    }
}

impl EntityStore<Companies> {
    /// Replace a company's logo with a multipart `PUT /companies/{id}`
    pub async fn update_logo(&self, id: i64, update: LogoUpdate) -> ApiResult<CompanyRecord> {
        let record = self
            .orchestrator()
            .execute(
                self.state(),
                Some(Companies::RECORD_KEY),
                Current,
                || async move {
                    self.api()
                        .put_multipart::<Envelope<CompanyRecord>>(&Self::record_path(id), update.into_form())
                        .await?
                        .into_data()
                },
            )
            .await?;

        self.follow_mutation(&record).await;
        Ok(record)
    }
}

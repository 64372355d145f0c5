use std::sync::Arc;
use std::time::Duration;

use smartfarm_api::types::{
    ListParams, Page, Supplier, SupplierCreate, SupplierOrder, SupplierProduct, SupplierProductInput,
    SupplierStats, SupplierUpdate,
};

use super::unexpected;
use crate::command::{Command, CommandResult};
use crate::error::CoreError;
use crate::keys;
use crate::query::QueryKey;
use crate::resource::{Resource, ResourceClient, ResourceSpec, StatsResource};

pub struct Suppliers;

impl Resource for Suppliers {
    type Item = Supplier;
    type List = Page<Supplier>;
    type Create = SupplierCreate;
    type Update = SupplierUpdate;

    const SPEC: ResourceSpec = ResourceSpec {
        tag: keys::SUPPLIERS,
        stats_tag: Some(keys::SUPPLIER_STATS),
        path: "suppliers",
        label: "Supplier",
        noun: "supplier",
        list_stale: Duration::ZERO,
        item_stale: Duration::ZERO,
        keep_previous_data: true,
    };

    fn validate_create(body: &SupplierCreate) -> Result<(), CoreError> {
        if body.name.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "supplier name is required".into(),
            });
        }
        if !body.email.contains('@') {
            return Err(CoreError::Validation {
                message: format!("invalid email address: {}", body.email),
            });
        }
        Ok(())
    }
}

impl StatsResource for Suppliers {
    type Stats = SupplierStats;
    const STATS_STALE: Duration = Duration::ZERO;
}

impl ResourceClient<Suppliers> {
    pub async fn search(&self, query: &str) -> Result<Option<Arc<Vec<Supplier>>>, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }
        let key = QueryKey::new(keys::SUPPLIERS).with("search").with(query);
        self.ctx
            .query_with(key, Duration::ZERO, "suppliers/search".into(), [("q", query.to_owned())])
            .await
            .map(Some)
    }

    fn products_key(supplier_id: &str) -> QueryKey {
        QueryKey::new(keys::SUPPLIERS).with(supplier_id).with(keys::PRODUCTS)
    }

    /// Product catalogue of one supplier; `Ok(None)` for an empty id.
    pub async fn products(&self, supplier_id: &str) -> Result<Option<Arc<Vec<SupplierProduct>>>, CoreError> {
        if supplier_id.is_empty() {
            return Ok(None);
        }
        self.ctx
            .query(
                Self::products_key(supplier_id),
                Duration::ZERO,
                format!("suppliers/{supplier_id}/products"),
            )
            .await
            .map(Some)
    }

    pub async fn add_product(&self, supplier_id: &str, product: SupplierProductInput) -> Result<SupplierProduct, CoreError> {
        let cmd = Command::AddSupplierProduct {
            supplier_id: supplier_id.to_owned(),
            product,
        };
        match self.ctx.execute(cmd).await? {
            CommandResult::Product(p) => Ok(p),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn update_product(
        &self,
        supplier_id: &str,
        product_id: &str,
        product: SupplierProductInput,
    ) -> Result<SupplierProduct, CoreError> {
        let cmd = Command::UpdateSupplierProduct {
            supplier_id: supplier_id.to_owned(),
            product_id: product_id.to_owned(),
            product,
        };
        match self.ctx.execute(cmd).await? {
            CommandResult::Product(p) => Ok(p),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn remove_product(&self, supplier_id: &str, product_id: &str) -> Result<(), CoreError> {
        let cmd = Command::RemoveSupplierProduct {
            supplier_id: supplier_id.to_owned(),
            product_id: product_id.to_owned(),
        };
        self.ctx.execute(cmd).await.map(|_| ())
    }

    pub async fn orders(
        &self,
        supplier_id: &str,
        params: &ListParams,
    ) -> Result<Option<Arc<Page<SupplierOrder>>>, CoreError> {
        if supplier_id.is_empty() {
            return Ok(None);
        }
        let key = QueryKey::new(keys::SUPPLIERS)
            .with(supplier_id)
            .with(keys::ORDERS)
            .with(params);
        self.ctx
            .query_with(key, Duration::ZERO, format!("suppliers/{supplier_id}/orders"), params.clone())
            .await
            .map(Some)
    }
}

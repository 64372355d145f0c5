// ── Command API ──
//
// Writes that are not plain create/update/delete flow through a typed
// `Command` enum. Each variant knows its cache effects and messages;
// `route_command` maps it onto the REST call.

use smartfarm_api::ApiClient;
use smartfarm_api::types::{
    Crop, CropStatusChange, FarmerCreate, FarmerImportResult, GenerateRecommendationsRequest,
    GenerateRecommendationsResponse, GenerateReportRequest, GenerateReportResponse, HarvestRecord,
    Recommendation, RecommendationStatusChange, SupplierProduct, SupplierProductInput,
};

use crate::error::CoreError;
use crate::keys;
use crate::mutation::CacheEffects;
use crate::query::QueryKey;

/// Domain write operations beyond plain CRUD.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Crops ────────────────────────────────────────────────────────
    UpdateCropStatus {
        crop_id: String,
        change: CropStatusChange,
    },
    RecordHarvest {
        crop_id: String,
        record: HarvestRecord,
    },

    // ── Supplier catalogue ───────────────────────────────────────────
    AddSupplierProduct {
        supplier_id: String,
        product: SupplierProductInput,
    },
    UpdateSupplierProduct {
        supplier_id: String,
        product_id: String,
        product: SupplierProductInput,
    },
    RemoveSupplierProduct {
        supplier_id: String,
        product_id: String,
    },

    // ── Reports ──────────────────────────────────────────────────────
    GenerateReport {
        template_id: String,
        request: GenerateReportRequest,
    },

    // ── Recommendations ──────────────────────────────────────────────
    UpdateRecommendationStatus {
        recommendation_id: String,
        change: RecommendationStatusChange,
    },
    GenerateRecommendations {
        request: GenerateRecommendationsRequest,
    },

    // ── Dashboard ────────────────────────────────────────────────────
    MarkAlertRead {
        alert_id: String,
    },

    // ── Farmers ──────────────────────────────────────────────────────
    ImportFarmers {
        farmers: Vec<FarmerCreate>,
    },
}

/// Payload returned by a routed command.
#[derive(Debug, Clone)]
pub enum CommandResult {
    Ok,
    Crop(Box<Crop>),
    Product(SupplierProduct),
    ReportStarted(GenerateReportResponse),
    Recommendation(Box<Recommendation>),
    Generated(GenerateRecommendationsResponse),
    Imported(FarmerImportResult),
}

impl Command {
    /// Keys made stale (or dropped) once the command succeeds.
    pub fn effects(&self) -> CacheEffects {
        match self {
            Self::UpdateCropStatus { crop_id, .. } | Self::RecordHarvest { crop_id, .. } => {
                CacheEffects::new()
                    .invalidate(QueryKey::new(keys::CROPS))
                    .invalidate(QueryKey::new(keys::CROPS).with(crop_id))
                    .invalidate(QueryKey::new(keys::CROP_STATS))
            }
            Self::AddSupplierProduct { supplier_id, .. }
            | Self::UpdateSupplierProduct { supplier_id, .. }
            | Self::RemoveSupplierProduct { supplier_id, .. } => CacheEffects::new().invalidate(
                QueryKey::new(keys::SUPPLIERS)
                    .with(supplier_id)
                    .with(keys::PRODUCTS),
            ),
            Self::GenerateReport { .. } => {
                CacheEffects::new().invalidate(QueryKey::new(keys::REPORT_HISTORY))
            }
            Self::UpdateRecommendationStatus {
                recommendation_id, ..
            } => CacheEffects::new()
                .invalidate(QueryKey::new(keys::RECOMMENDATIONS))
                .invalidate(QueryKey::new(keys::RECOMMENDATIONS).with(recommendation_id))
                .invalidate(QueryKey::new(keys::RECOMMENDATION_STATS)),
            Self::GenerateRecommendations { .. } => CacheEffects::new()
                .invalidate(QueryKey::new(keys::RECOMMENDATIONS))
                .invalidate(QueryKey::new(keys::RECOMMENDATION_STATS)),
            Self::MarkAlertRead { .. } => CacheEffects::new()
                .invalidate(QueryKey::new(keys::ALERTS))
                .invalidate(QueryKey::new(keys::DASHBOARD_DATA)),
            Self::ImportFarmers { .. } => CacheEffects::new()
                .invalidate(QueryKey::new(keys::FARMERS))
                .invalidate(QueryKey::new(keys::FARMER_STATS)),
        }
    }

    pub fn success_message(&self) -> String {
        match self {
            Self::UpdateCropStatus { .. } => "Crop status updated successfully",
            Self::RecordHarvest { .. } => "Harvest recorded successfully",
            Self::AddSupplierProduct { .. } => "Product added to supplier successfully",
            Self::UpdateSupplierProduct { .. } => "Product updated successfully",
            Self::RemoveSupplierProduct { .. } => "Product removed from supplier successfully",
            Self::GenerateReport { .. } => {
                "Report generation started. You will be notified when it's ready."
            }
            Self::UpdateRecommendationStatus { .. } => "Recommendation status updated",
            Self::GenerateRecommendations { .. } => "Recommendations generated successfully",
            Self::MarkAlertRead { .. } => "Alert marked as read",
            Self::ImportFarmers { farmers } => {
                return format!("Imported {} farmers", farmers.len());
            }
        }
        .to_owned()
    }

    /// Prefix of the failure notification; the server message follows.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::UpdateCropStatus { .. } => "Failed to update crop status",
            Self::RecordHarvest { .. } => "Failed to record harvest",
            Self::AddSupplierProduct { .. } => "Failed to add product",
            Self::UpdateSupplierProduct { .. } => "Failed to update product",
            Self::RemoveSupplierProduct { .. } => "Failed to remove product",
            Self::GenerateReport { .. } => "Failed to generate report",
            Self::UpdateRecommendationStatus { .. } => "Failed to update status",
            Self::GenerateRecommendations { .. } => "Failed to generate recommendations",
            Self::MarkAlertRead { .. } => "Failed to mark alert as read",
            Self::ImportFarmers { .. } => "Failed to import farmers",
        }
    }

    /// Ids interpolated into the request path, with their names.
    fn path_ids(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::UpdateCropStatus { crop_id, .. } | Self::RecordHarvest { crop_id, .. } => {
                vec![("crop id", crop_id.as_str())]
            }
            Self::AddSupplierProduct { supplier_id, .. } => vec![("supplier id", supplier_id.as_str())],
            Self::UpdateSupplierProduct {
                supplier_id,
                product_id,
                ..
            }
            | Self::RemoveSupplierProduct {
                supplier_id,
                product_id,
            } => vec![
                ("supplier id", supplier_id.as_str()),
                ("product id", product_id.as_str()),
            ],
            Self::GenerateReport { template_id, .. } => vec![("template id", template_id.as_str())],
            Self::UpdateRecommendationStatus {
                recommendation_id, ..
            } => vec![("recommendation id", recommendation_id.as_str())],
            Self::MarkAlertRead { alert_id } => vec![("alert id", alert_id.as_str())],
            Self::GenerateRecommendations { .. } | Self::ImportFarmers { .. } => Vec::new(),
        }
    }

    /// Local checks that block the request.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some((name, _)) = self.path_ids().into_iter().find(|(_, id)| id.is_empty()) {
            return Err(validation(&format!("{name} is required")));
        }
        match self {
            Self::RecordHarvest { record, .. }
                if !record.actual_yield.is_finite() || record.actual_yield < 0.0 =>
            {
                Err(validation("actual yield must be a non-negative number"))
            }
            Self::AddSupplierProduct { product, .. }
                if product.name.as_deref().is_none_or(str::is_empty) =>
            {
                Err(validation("product name is required"))
            }
            Self::AddSupplierProduct { product, .. } if product.price.is_none() => {
                Err(validation("product price is required"))
            }
            Self::ImportFarmers { farmers } if farmers.is_empty() => {
                Err(validation("nothing to import"))
            }
            _ => Ok(()),
        }
    }
}

fn validation(message: &str) -> CoreError {
    CoreError::Validation {
        message: message.to_owned(),
    }
}

// ── Routing ──────────────────────────────────────────────────────────

pub(crate) async fn route_command(
    api: &ApiClient,
    cmd: Command,
) -> Result<CommandResult, smartfarm_api::Error> {
    match cmd {
        Command::UpdateCropStatus { crop_id, change } => {
            let crop: Crop = api.patch(&format!("crops/{crop_id}/status"), &change).await?;
            Ok(CommandResult::Crop(Box::new(crop)))
        }
        Command::RecordHarvest { crop_id, record } => {
            let crop: Crop = api.post(&format!("crops/{crop_id}/harvest"), &record).await?;
            Ok(CommandResult::Crop(Box::new(crop)))
        }
        Command::AddSupplierProduct {
            supplier_id,
            product,
        } => {
            let created = api
                .post(&format!("suppliers/{supplier_id}/products"), &product)
                .await?;
            Ok(CommandResult::Product(created))
        }
        Command::UpdateSupplierProduct {
            supplier_id,
            product_id,
            product,
        } => {
            let updated = api
                .put(&format!("suppliers/{supplier_id}/products/{product_id}"), &product)
                .await?;
            Ok(CommandResult::Product(updated))
        }
        Command::RemoveSupplierProduct {
            supplier_id,
            product_id,
        } => {
            api.delete(&format!("suppliers/{supplier_id}/products/{product_id}"))
                .await?;
            Ok(CommandResult::Ok)
        }
        Command::GenerateReport {
            template_id,
            request,
        } => {
            let started = api
                .post(&format!("reports/generate/{template_id}"), &request)
                .await?;
            Ok(CommandResult::ReportStarted(started))
        }
        Command::UpdateRecommendationStatus {
            recommendation_id,
            change,
        } => {
            let rec: Recommendation = api
                .patch(&format!("recommendations/{recommendation_id}/status"), &change)
                .await?;
            Ok(CommandResult::Recommendation(Box::new(rec)))
        }
        Command::GenerateRecommendations { request } => {
            let generated = api.post("recommendations/generate", &request).await?;
            Ok(CommandResult::Generated(generated))
        }
        Command::MarkAlertRead { alert_id } => {
            api.patch_empty(&format!("dashboard/alerts/{alert_id}/read"))
                .await?;
            Ok(CommandResult::Ok)
        }
        Command::ImportFarmers { farmers } => {
            let body = serde_json::json!({ "farmers": farmers });
            let result = api.post("farmers/import", &body).await?;
            Ok(CommandResult::Imported(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use smartfarm_api::types::{CropStatus, RecommendationStatus};

    use super::*;

    #[test]
    fn crop_commands_touch_list_item_and_stats() {
        let cmd = Command::UpdateCropStatus {
            crop_id: "c-7".into(),
            change: CropStatusChange {
                status: CropStatus::Harvested,
                notes: None,
            },
        };
        let effects = cmd.effects();
        assert_eq!(
            effects.invalidate,
            vec![
                QueryKey::new("crops"),
                QueryKey::new("crops").with("c-7"),
                QueryKey::new("crop-stats"),
            ]
        );
        assert!(effects.remove.is_empty());
        assert_eq!(cmd.success_message(), "Crop status updated successfully");
    }

    #[test]
    fn product_commands_scope_to_supplier_products() {
        let cmd = Command::RemoveSupplierProduct {
            supplier_id: "S1".into(),
            product_id: "p-1".into(),
        };
        assert_eq!(
            cmd.effects().invalidate,
            vec![QueryKey::new("suppliers").with("S1").with("products")]
        );
        assert_eq!(cmd.failure_message(), "Failed to remove product");
    }

    #[test]
    fn negative_harvest_is_rejected_locally() {
        let cmd = Command::RecordHarvest {
            crop_id: "c-1".into(),
            record: HarvestRecord {
                actual_yield: -1.0,
                notes: None,
            },
        };
        assert!(matches!(cmd.validate(), Err(CoreError::Validation { .. })));
    }

    #[test]
    fn product_without_name_is_rejected_locally() {
        let cmd = Command::AddSupplierProduct {
            supplier_id: "S1".into(),
            product: SupplierProductInput {
                price: Some(4.5),
                ..SupplierProductInput::default()
            },
        };
        assert!(matches!(cmd.validate(), Err(CoreError::Validation { .. })));
    }

    #[test]
    fn empty_path_ids_are_rejected_locally() {
        let status = Command::UpdateCropStatus {
            crop_id: String::new(),
            change: CropStatusChange {
                status: CropStatus::Growing,
                notes: None,
            },
        };
        let product = Command::UpdateSupplierProduct {
            supplier_id: "S1".into(),
            product_id: String::new(),
            product: SupplierProductInput::default(),
        };
        let removal = Command::RemoveSupplierProduct {
            supplier_id: String::new(),
            product_id: "p-1".into(),
        };

        for (cmd, expected) in [
            (status, "crop id is required"),
            (product, "product id is required"),
            (removal, "supplier id is required"),
        ] {
            match cmd.validate() {
                Err(CoreError::Validation { message }) => assert_eq!(message, expected),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn harvest_and_new_product_need_their_parent_id() {
        let harvest = Command::RecordHarvest {
            crop_id: String::new(),
            record: HarvestRecord {
                actual_yield: 3.0,
                notes: None,
            },
        };
        let added = Command::AddSupplierProduct {
            supplier_id: String::new(),
            product: SupplierProductInput {
                name: Some("Urea".into()),
                price: Some(4.5),
                ..SupplierProductInput::default()
            },
        };
        assert!(matches!(harvest.validate(), Err(CoreError::Validation { .. })));
        assert!(matches!(added.validate(), Err(CoreError::Validation { .. })));
    }

    #[test]
    fn recommendation_status_touches_list_item_and_stats() {
        let cmd = Command::UpdateRecommendationStatus {
            recommendation_id: "r-3".into(),
            change: RecommendationStatusChange {
                status: RecommendationStatus::Completed,
                notes: Some("sprayed".into()),
            },
        };
        assert_eq!(
            cmd.effects().invalidate,
            vec![
                QueryKey::new("recommendations"),
                QueryKey::new("recommendations").with("r-3"),
                QueryKey::new("recommendation-stats"),
            ]
        );
        assert_eq!(cmd.success_message(), "Recommendation status updated");
        assert_eq!(cmd.failure_message(), "Failed to update status");
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn generating_recommendations_refreshes_lists_and_stats() {
        let cmd = Command::GenerateRecommendations {
            request: GenerateRecommendationsRequest::default(),
        };
        assert_eq!(
            cmd.effects().invalidate,
            vec![QueryKey::new("recommendations"), QueryKey::new("recommendation-stats")]
        );
        assert!(cmd.validate().is_ok());
    }
}

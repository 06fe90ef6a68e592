//! Package catalogue handler

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use dramapass_types::Package;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PackageResponse {
    pub id: &'static str,
    pub label: &'static str,
    pub days: u32,
    pub price: u64,
}

impl From<Package> for PackageResponse {
    fn from(package: Package) -> Self {
        Self {
            id: package.id(),
            label: package.label(),
            days: package.days(),
            price: package.price(),
        }
    }
}

/// GET /api/v1/packages
///
/// Catalogue cheapest first, as shown in the purchase menu.
pub async fn list_packages(State(state): State<AppState>) -> Json<Vec<PackageResponse>> {
    Json(
        state
            .billing
            .pricing
            .list_packages()
            .iter()
            .copied()
            .map(PackageResponse::from)
            .collect(),
    )
}

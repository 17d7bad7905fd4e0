use std::sync::Arc;

use super::{bare_or_enveloped, read_json};
use crate::client::{AuthClient, RequestOptions};
use crate::error::ApiError;
use crate::models::Facility;

pub struct FacilitiesApi {
    client: Arc<AuthClient>,
}

impl FacilitiesApi {
    pub fn new(client: Arc<AuthClient>) -> Self {
        FacilitiesApi { client }
    }

    /// All facilities a patient can grant consent to.
    pub async fn list(&self) -> Result<Vec<Facility>, ApiError> {
        let response = self.client.request("/facilities", RequestOptions::get()).await?;
        let status = response.status().as_u16();
        bare_or_enveloped(read_json(response).await?, status)
    }
}

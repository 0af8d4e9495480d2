// Location endpoints.

use crate::client::{Endpoint, MultitekClient, decode_list};
use crate::error::Error;
use crate::models::Location;

impl MultitekClient {
    /// List the account's locations with their door units and rooms.
    pub async fn get_locations(&self) -> Result<Vec<Location>, Error> {
        let reply = self
            .post(Endpoint::GetUserLocations, serde_json::Map::new())
            .await?;
        Ok(decode_list(Endpoint::GetUserLocations, reply))
    }
}

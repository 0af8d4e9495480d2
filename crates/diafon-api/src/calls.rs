// Call endpoints: history, active-call probe, and the two door-open paths.

use serde_json::{Value, json};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::client::{Endpoint, MultitekClient, decode_list, object};
use crate::error::Error;
use crate::models::{CallRecord, CurrentCall, NewCall};

/// Seconds the vendor app reports for a door call; reporting the duration
/// is what makes the door unit release the latch.
const DOOR_CALL_DURATION: &str = "6";

impl MultitekClient {
    /// Full call history of the account.
    pub async fn get_call_records(&self) -> Result<Vec<CallRecord>, Error> {
        let reply = self
            .post(Endpoint::GetCallAllRecords, serde_json::Map::new())
            .await?;
        Ok(decode_list(Endpoint::GetCallAllRecords, reply))
    }

    /// Probe for a call in progress. Never fails: errors, non-object
    /// replies and a `call_id` of `"-1"` or empty all mean "no call".
    pub async fn ask_current_call(&self) -> Option<CurrentCall> {
        let reply = match self
            .post(Endpoint::AskCurrentCall, serde_json::Map::new())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                debug!(error = %e, "no active call");
                return None;
            }
        };

        let Some(value @ Value::Object(_)) = reply.into_json() else {
            return None;
        };

        let call: CurrentCall = serde_json::from_value(value).ok()?;
        if call.call_id.is_empty() || call.call_id == "-1" {
            return None;
        }

        info!(call_id = %call.call_id, "active call found");
        Some(call)
    }

    /// Open the door by placing a synthetic outgoing call to the door unit.
    ///
    /// Step one registers the call with `addCall`; step two reports its
    /// duration with `setCallDuration`. Both must answer with the success
    /// marker; any other reply yields `Ok(false)`. A missing account SIP is
    /// an error.
    pub async fn open_door(&self, device_sip: &str, location_id: &str) -> Result<bool, Error> {
        let user_sip = self.resolve_user_sip().await?;
        let call_id = Uuid::new_v4().simple().to_string();
        let now_ms = chrono::Utc::now().timestamp_millis();

        info!(
            from = %user_sip,
            to = device_sip,
            location_id,
            call_id = %call_id,
            "opening door via addCall"
        );

        let call = NewCall::outgoing(&call_id, &user_sip, device_sip, location_id, now_ms);
        let reply = self
            .post(Endpoint::AddCall, object(json!({ "call_model": call })))
            .await?;
        if !reply.is_success() {
            error!(%reply, "addCall failed");
            return Ok(false);
        }

        let reply = self
            .post(
                Endpoint::SetCallDuration,
                object(json!({
                    "call_id": call_id,
                    "call_duration": DOOR_CALL_DURATION,
                })),
            )
            .await?;
        if !reply.is_success() {
            error!(call_id = %call_id, %reply, "setCallDuration failed");
            return Ok(false);
        }

        info!(call_id = %call_id, "door opened");
        Ok(true)
    }

    /// Open the door for a call that is currently ringing.
    pub async fn open_door_with_call(&self, call_id: &str) -> Result<bool, Error> {
        info!(call_id, "opening door via controlCurrentCall");

        let reply = self
            .post(
                Endpoint::ControlCurrentCall,
                object(json!({ "call_id": call_id })),
            )
            .await?;

        let success = reply.is_success();
        if !success {
            warn!(call_id, %reply, "controlCurrentCall failed");
        }
        Ok(success)
    }

    /// Cached SIP, or fetch the account to learn it.
    async fn resolve_user_sip(&self) -> Result<String, Error> {
        if let Some(sip) = self.user_sip() {
            return Ok(sip);
        }

        let account = self.get_account().await?;
        let sip = account.sip().map(str::to_owned).ok_or(Error::MissingSip)?;
        self.cache_user_sip(Some(sip.clone()));
        Ok(sip)
    }
}

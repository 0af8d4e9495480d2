// Vendor API response types
//
// The DiafonBox cloud is loose about field types: identifiers and epoch
// timestamps arrive as strings on some firmware and as numbers on others,
// and optional collections are sometimes `null`. Fields therefore use
// `#[serde(default)]` and the lenient deserializers below, and anything not
// modelled lands in `extra`.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Lenient field decoding ───────────────────────────────────────────

pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// String-or-number (or bool) as an optional string; `null` is `None`.
    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(other) => Some(other.to_string()),
        })
    }

    /// String-or-number as a string; `null` is the empty string.
    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(opt_string(deserializer)?.unwrap_or_default())
    }

    /// A list that may be `null`.
    pub fn vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }
}

// ── Call records ─────────────────────────────────────────────────────

/// State of a call record. Anything the vendor sends besides `Missed`
/// and `Outgoing` is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallState {
    /// A doorbell ring nobody answered; the only state that counts as a ring.
    Missed,
    Outgoing,
    Other(String),
}

impl Default for CallState {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl CallState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Missed => "Missed",
            Self::Outgoing => "Outgoing",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for CallState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Missed" => Self::Missed,
            "Outgoing" => Self::Outgoing,
            _ => Self::Other(s),
        }
    }
}

impl From<CallState> for String {
    fn from(state: CallState) -> Self {
        match state {
            CallState::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry from `getCallAllRecords`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub call_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub call_from: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub call_to: String,
    #[serde(default, deserialize_with = "deserialize_call_state")]
    pub call_state: CallState,
    /// Epoch milliseconds, as a string.
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub location_id: String,
    /// Server path of the snapshot taken at ring time.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub path: Option<String>,
    /// Catch-all for `duration`, `call_type` and other vendor fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn deserialize_call_state<'de, D>(deserializer: D) -> Result<CallState, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::opt_string(deserializer)?
        .map(CallState::from)
        .unwrap_or_default())
}

impl CallRecord {
    /// `date` as epoch milliseconds; unparsable dates are `0`.
    pub fn timestamp_ms(&self) -> i64 {
        self.date.trim().parse().unwrap_or(0)
    }

    pub fn is_missed(&self) -> bool {
        self.call_state == CallState::Missed
    }

    /// Snapshot path, if the record has a non-empty one.
    pub fn snapshot_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }
}

// ── Locations ────────────────────────────────────────────────────────

/// A door unit, addressed by its SIP-like identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default, deserialize_with = "lenient::string")]
    pub sip: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub mac: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default, deserialize_with = "lenient::string")]
    pub block_num: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub room_num: String,
}

impl Room {
    /// Room identifier as dialled by the door unit: block followed by room.
    pub fn room_id(&self) -> String {
        format!("{}{}", self.block_num, self.room_num)
    }
}

/// One entry from `getUserLocations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "lenient::string")]
    pub location_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub location_name: String,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub location_devices: Vec<Device>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub location_rooms: Vec<Room>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Location {
    /// The door unit of this location (the first device).
    pub fn device(&self) -> Option<&Device> {
        self.location_devices.first()
    }

    /// The resident's room (the first room).
    pub fn room(&self) -> Option<&Room> {
        self.location_rooms.first()
    }
}

// ── Account ──────────────────────────────────────────────────────────

/// A phone registered on the account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Phone {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub info: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Response of `getAccount`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub sip: Option<String>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub phone_list: Vec<Phone>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user_surname: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Account {
    /// `"{user_name} {user_surname}"`, or `None` when both are blank.
    pub fn display_name(&self) -> Option<String> {
        let name = format!(
            "{} {}",
            self.user_name.as_deref().unwrap_or_default(),
            self.user_surname.as_deref().unwrap_or_default()
        );
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_owned())
    }

    /// Non-empty SIP address.
    pub fn sip(&self) -> Option<&str> {
        self.sip.as_deref().filter(|s| !s.is_empty())
    }
}

// ── Active call ──────────────────────────────────────────────────────

/// Response of `askCurrentCall` when a call is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCall {
    #[serde(deserialize_with = "lenient::string")]
    pub call_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// ── Outgoing call model ──────────────────────────────────────────────

/// Call type the vendor app uses when dialling the gate unit.
pub const CALL_TYPE_GATEWAY_DOOR: &str = "DEVICE_TYPE_GATEWAY_DOOR";

/// `call_model` body of `addCall`, shaped exactly like the mobile app's.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewCall<'a> {
    pub call_id: &'a str,
    pub call_from: &'a str,
    pub call_to: &'a str,
    pub date: String,
    pub call_state: &'static str,
    pub data: &'static str,
    pub path: &'static str,
    pub location_id: &'a str,
    pub duration: &'static str,
    pub notification_id: u32,
    pub extra_data: &'static str,
    pub call_type: &'static str,
    pub selected: bool,
    #[serde(rename = "isRead")]
    pub is_read: bool,
}

impl<'a> NewCall<'a> {
    pub fn outgoing(
        call_id: &'a str,
        call_from: &'a str,
        call_to: &'a str,
        location_id: &'a str,
        now_ms: i64,
    ) -> Self {
        Self {
            call_id,
            call_from,
            call_to,
            date: now_ms.to_string(),
            call_state: "Outgoing",
            data: "New call",
            path: "",
            location_id,
            duration: "0",
            notification_id: 0,
            extra_data: "",
            call_type: CALL_TYPE_GATEWAY_DOOR,
            selected: false,
            is_read: false,
        }
    }
}

// ── Push credentials ─────────────────────────────────────────────────

/// Pushy device token plus the app auth key.
#[derive(Debug, Clone)]
pub struct PushCredentials {
    pub token: String,
    pub auth: SecretString,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn call_record_accepts_numeric_fields() {
        let record: CallRecord = serde_json::from_value(json!({
            "call_id": 42,
            "call_from": "1001",
            "call_to": 101,
            "call_state": "Missed",
            "date": 1_700_000_000_000_i64,
            "location_id": "L1",
            "path": "/img/a.jpg",
            "duration": "0"
        }))
        .unwrap();

        assert_eq!(record.call_id, "42");
        assert_eq!(record.call_to, "101");
        assert_eq!(record.timestamp_ms(), 1_700_000_000_000);
        assert!(record.is_missed());
        assert_eq!(record.snapshot_path(), Some("/img/a.jpg"));
        assert_eq!(record.extra.get("duration"), Some(&json!("0")));
    }

    #[test]
    fn unparsable_date_is_zero() {
        let record: CallRecord =
            serde_json::from_value(json!({"call_id": "a", "date": "yesterday"})).unwrap();
        assert_eq!(record.timestamp_ms(), 0);

        let missing: CallRecord = serde_json::from_value(json!({"call_id": "b"})).unwrap();
        assert_eq!(missing.timestamp_ms(), 0);
        assert_eq!(missing.call_state, CallState::default());
    }

    #[test]
    fn empty_path_is_no_snapshot() {
        let record: CallRecord =
            serde_json::from_value(json!({"call_id": "a", "path": ""})).unwrap();
        assert_eq!(record.snapshot_path(), None);
    }

    #[test]
    fn unknown_call_state_is_preserved() {
        let state: CallState = serde_json::from_value(json!("Answered")).unwrap();
        assert_eq!(state, CallState::Other("Answered".into()));
        assert_eq!(serde_json::to_value(&state).unwrap(), json!("Answered"));
        assert_eq!(serde_json::to_value(CallState::Missed).unwrap(), json!("Missed"));
    }

    #[test]
    fn location_with_null_collections() {
        let location: Location = serde_json::from_value(json!({
            "location_id": 7,
            "location_name": "Home",
            "location_devices": null,
            "location_rooms": [{"block_num": 1, "room_num": "01"}]
        }))
        .unwrap();

        assert_eq!(location.location_id, "7");
        assert!(location.device().is_none());
        assert_eq!(location.room().unwrap().room_id(), "101");
    }

    #[test]
    fn account_display_name() {
        let account: Account = serde_json::from_value(json!({
            "email": "a@b.c",
            "user_name": "Ada",
            "user_surname": ""
        }))
        .unwrap();
        assert_eq!(account.display_name().as_deref(), Some("Ada"));

        let blank = Account::default();
        assert_eq!(blank.display_name(), None);
    }

    #[test]
    fn new_call_serializes_vendor_shape() {
        let call = NewCall::outgoing("abc", "1001", "D1", "L1", 1234);
        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(
            value,
            json!({
                "call_id": "abc",
                "call_from": "1001",
                "call_to": "D1",
                "date": "1234",
                "call_state": "Outgoing",
                "data": "New call",
                "path": "",
                "location_id": "L1",
                "duration": "0",
                "notification_id": 0,
                "extra_data": "",
                "call_type": "DEVICE_TYPE_GATEWAY_DOOR",
                "selected": false,
                "isRead": false
            })
        );
    }
}

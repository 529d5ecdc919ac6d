//! Operation types for the offline queue.
//!
//! A queued operation is a deferred register mutation. In memory it is a
//! typed [`Mutation`]; on disk it keeps the JSON shape the mobile app has
//! always written:
//!
//! ```json
//! { "id": "...", "timestamp": "...", "retries": 0,
//!   "type": "UPDATE_REGISTER", "registroId": 42, "data": { ... } }
//! ```
//!
//! File attachments never survive queueing: only their metadata is kept
//! under `data._filesMetadata`, the file contents are lost.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Mutation kinds the executor knows how to replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Create a field register
    CreateRegister,
    /// Update an existing field register
    UpdateRegister,
}

impl OperationType {
    /// Wire tag stored in the `type` field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateRegister => "CREATE_REGISTER",
            Self::UpdateRegister => "UPDATE_REGISTER",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::CreateRegister => "Create Register",
            Self::UpdateRegister => "Update Register",
        }
    }

    /// Parse a wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CREATE_REGISTER" => Some(Self::CreateRegister),
            "UPDATE_REGISTER" => Some(Self::UpdateRegister),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A photo or document attached to a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// Device-local URI of the file.
    pub uri: String,
    /// Original file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// MIME type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Field register data sent to the create/update endpoints.
///
/// Every field defaults when absent so partially filled forms deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterPayload {
    #[serde(deserialize_with = "string_or_number")]
    pub imovel_numero: String,
    pub imovel_lado: String,
    pub imovel_categoria_da_localidade: String,
    pub imovel_tipo: String,
    pub imovel_status: String,
    #[serde(
        deserialize_with = "optional_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub area_de_visita_id: Option<i64>,

    // Deposit counts by category
    #[serde(deserialize_with = "count")]
    pub a1: u32,
    #[serde(deserialize_with = "count")]
    pub a2: u32,
    #[serde(deserialize_with = "count")]
    pub b: u32,
    #[serde(deserialize_with = "count")]
    pub c: u32,
    #[serde(deserialize_with = "count")]
    pub d1: u32,
    #[serde(deserialize_with = "count")]
    pub d2: u32,
    #[serde(deserialize_with = "count")]
    pub e: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub imovel_complemento: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formulario_tipo: Option<String>,

    // Activities performed
    pub li: bool,
    pub pe: bool,
    pub t: bool,
    pub df: bool,
    pub pve: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_da_amostra: Option<String>,
    #[serde(
        deserialize_with = "optional_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantiade_tubitos: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub larvicidas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adulticidas: Option<String>,

    /// Attachments for a direct API call. Never persisted.
    #[serde(skip_serializing)]
    pub files: Vec<FileAttachment>,

    /// Metadata of attachments dropped when the operation was queued.
    #[serde(rename = "_filesMetadata", skip_serializing_if = "Vec::is_empty")]
    pub files_metadata: Vec<FileAttachment>,

    /// Fields this crate does not model, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegisterPayload {
    /// Move attachments out of the payload, keeping only their metadata.
    ///
    /// Returns the number of attachments stripped.
    pub fn strip_files(&mut self) -> usize {
        let stripped = self.files.len();
        self.files_metadata.append(&mut self.files);
        stripped
    }
}

/// A deferred register mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// `registersApi.createRegister(payload)`
    CreateRegister(RegisterPayload),
    /// `registersApi.updateRegister(registro_id, payload)`
    UpdateRegister {
        registro_id: i64,
        payload: RegisterPayload,
    },
    /// Stored entry that does not map to a known mutation.
    ///
    /// Kept verbatim so saving the queue never rewrites it; executing it
    /// fails with [`crate::QueueError::UnknownOperation`].
    Unrecognized {
        kind: String,
        registro_id: Option<Value>,
        data: Value,
        reason: String,
    },
}

impl Mutation {
    /// Create a register.
    #[must_use]
    pub const fn create_register(payload: RegisterPayload) -> Self {
        Self::CreateRegister(payload)
    }

    /// Update the register with the given id.
    #[must_use]
    pub const fn update_register(registro_id: i64, payload: RegisterPayload) -> Self {
        Self::UpdateRegister {
            registro_id,
            payload,
        }
    }

    /// Wire tag of this mutation.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::CreateRegister(_) => OperationType::CreateRegister.as_str(),
            Self::UpdateRegister { .. } => OperationType::UpdateRegister.as_str(),
            Self::Unrecognized { kind, .. } => kind,
        }
    }

    /// Known operation type, if any.
    #[must_use]
    pub const fn operation_type(&self) -> Option<OperationType> {
        match self {
            Self::CreateRegister(_) => Some(OperationType::CreateRegister),
            Self::UpdateRegister { .. } => Some(OperationType::UpdateRegister),
            Self::Unrecognized { .. } => None,
        }
    }

    /// Target register for update-shaped mutations.
    #[must_use]
    pub fn registro_id(&self) -> Option<i64> {
        match self {
            Self::CreateRegister(_) => None,
            Self::UpdateRegister { registro_id, .. } => Some(*registro_id),
            Self::Unrecognized { registro_id, .. } => registro_id.as_ref().and_then(parse_id),
        }
    }

    /// Typed payload, if this mutation is known.
    #[must_use]
    pub const fn payload(&self) -> Option<&RegisterPayload> {
        match self {
            Self::CreateRegister(payload) | Self::UpdateRegister { payload, .. } => Some(payload),
            Self::Unrecognized { .. } => None,
        }
    }

    fn payload_mut(&mut self) -> Option<&mut RegisterPayload> {
        match self {
            Self::CreateRegister(payload) | Self::UpdateRegister { payload, .. } => Some(payload),
            Self::Unrecognized { .. } => None,
        }
    }

    fn from_wire(kind: String, registro_id: Option<Value>, data: Value) -> Self {
        match Self::typed(&kind, registro_id.as_ref(), &data) {
            Ok(mutation) => mutation,
            Err(reason) => Self::Unrecognized {
                kind,
                registro_id,
                data,
                reason,
            },
        }
    }

    fn typed(kind: &str, registro_id: Option<&Value>, data: &Value) -> Result<Self, String> {
        let operation_type =
            OperationType::from_tag(kind).ok_or_else(|| "unsupported operation type".to_string())?;

        let payload: RegisterPayload = serde_json::from_value(data.clone())
            .map_err(|e| format!("invalid register data: {e}"))?;

        match operation_type {
            OperationType::CreateRegister => Ok(Self::CreateRegister(payload)),
            OperationType::UpdateRegister => {
                let registro_id = registro_id
                    .and_then(parse_id)
                    .ok_or_else(|| "missing or invalid registroId".to_string())?;
                Ok(Self::UpdateRegister {
                    registro_id,
                    payload,
                })
            },
        }
    }
}

/// An entry of the offline queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireOperation", into = "WireOperation")]
pub struct QueuedOperation {
    /// Unique id assigned at enqueue time
    pub id: String,
    /// When the operation was queued (display only); `None` if the stored
    /// entry has no readable timestamp
    pub timestamp: Option<DateTime<Utc>>,
    /// Failed replay attempts so far
    pub retries: u32,
    /// The deferred mutation
    pub mutation: Mutation,
}

impl QueuedOperation {
    /// Prepare a mutation for queueing.
    ///
    /// Assigns a fresh id and timestamp and strips file attachments, which
    /// cannot be persisted.
    #[must_use]
    pub fn new(mut mutation: Mutation) -> Self {
        let id = generate_id();

        if let Some(payload) = mutation.payload_mut() {
            let stripped = payload.strip_files();
            if stripped > 0 {
                tracing::info!(
                    id = %id,
                    files = stripped,
                    "file attachments dropped from queued operation"
                );
            }
        }

        Self {
            id,
            timestamp: Some(Utc::now()),
            retries: 0,
            mutation,
        }
    }

    /// Summary for status display.
    #[must_use]
    pub fn summary(&self) -> OperationSummary {
        OperationSummary {
            id: self.id.clone(),
            kind: self.mutation.kind().to_string(),
            timestamp: self.timestamp,
            retries: self.retries,
        }
    }
}

/// Diagnostic view of one queued operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub retries: u32,
}

/// Snapshot of the whole queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Number of queued operations
    pub count: usize,
    /// Operations in replay order
    pub operations: Vec<OperationSummary>,
}

impl QueueStatus {
    /// Build a status from a loaded queue.
    #[must_use]
    pub fn from_queue(queue: &[QueuedOperation]) -> Self {
        Self {
            count: queue.len(),
            operations: queue.iter().map(QueuedOperation::summary).collect(),
        }
    }

    /// Timestamp of the oldest queued operation.
    #[must_use]
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.operations.iter().filter_map(|op| op.timestamp).min()
    }
}

/// Generate an operation id: epoch milliseconds plus a random suffix.
#[must_use]
pub fn generate_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}{suffix}", Utc::now().timestamp_millis())
}

/// Id of a stored queue entry, as a string.
///
/// Older app versions may have written numeric ids.
#[must_use]
pub(crate) fn entry_id(entry: &Value) -> Option<String> {
    id_string(entry.get("id")?)
}

fn id_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// On-disk shape of a queued operation.
///
/// Every field except `id` is read leniently so entries written by older
/// app versions stay replayable.
#[derive(Serialize, Deserialize)]
struct WireOperation {
    #[serde(default)]
    id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<Value>,
    #[serde(default)]
    retries: Option<Value>,
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    #[serde(rename = "registroId", default, skip_serializing_if = "Option::is_none")]
    registro_id: Option<Value>,
    #[serde(default)]
    data: Value,
}

impl TryFrom<WireOperation> for QueuedOperation {
    type Error = String;

    fn try_from(wire: WireOperation) -> Result<Self, Self::Error> {
        let id = id_string(&wire.id).ok_or_else(|| "entry has no usable id".to_string())?;

        let timestamp = wire.timestamp.as_ref().and_then(|value| match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        });

        let retries = wire
            .retries
            .as_ref()
            .and_then(parse_id)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);

        let kind = match wire.kind {
            Some(Value::String(kind)) => kind,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        Ok(Self {
            id,
            timestamp,
            retries,
            mutation: Mutation::from_wire(kind, wire.registro_id, wire.data),
        })
    }
}

impl From<QueuedOperation> for WireOperation {
    fn from(op: QueuedOperation) -> Self {
        let (kind, registro_id, data) = match op.mutation {
            Mutation::CreateRegister(payload) => (
                OperationType::CreateRegister.as_str().to_string(),
                None,
                serde_json::to_value(&payload).unwrap_or_default(),
            ),
            Mutation::UpdateRegister {
                registro_id,
                payload,
            } => (
                OperationType::UpdateRegister.as_str().to_string(),
                Some(Value::from(registro_id)),
                serde_json::to_value(&payload).unwrap_or_default(),
            ),
            Mutation::Unrecognized {
                kind,
                registro_id,
                data,
                ..
            } => (kind, registro_id, data),
        };

        Self {
            id: Value::String(op.id),
            timestamp: op
                .timestamp
                .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true))),
            retries: Some(Value::from(op.retries)),
            kind: Some(Value::String(kind)),
            registro_id,
            data,
        }
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// Form inputs reach the queue as strings or numbers depending on the screen
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        other => parse_id(&other)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid count {other}"))),
    }
}

fn optional_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        other => parse_id(&other)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid integer {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(numero: &str) -> RegisterPayload {
        RegisterPayload {
            imovel_numero: numero.to_string(),
            ..RegisterPayload::default()
        }
    }

    #[test]
    fn test_operation_type_tags() {
        assert_eq!(OperationType::CreateRegister.as_str(), "CREATE_REGISTER");
        assert_eq!(
            OperationType::from_tag("UPDATE_REGISTER"),
            Some(OperationType::UpdateRegister)
        );
        assert_eq!(OperationType::from_tag("DELETE_REGISTER"), None);
        assert_eq!(OperationType::UpdateRegister.display_name(), "Update Register");
    }

    #[test]
    fn test_new_operation_defaults() {
        let op = QueuedOperation::new(Mutation::create_register(payload("12")));

        assert_eq!(op.retries, 0);
        assert_eq!(op.mutation.kind(), "CREATE_REGISTER");
        assert!(op.mutation.registro_id().is_none());
        assert!(!op.id.is_empty());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: std::collections::HashSet<String> = (0..1000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_new_strips_files() {
        let mut data = payload("12");
        data.files.push(FileAttachment {
            uri: "file:///photos/1.jpg".to_string(),
            name: Some("1.jpg".to_string()),
            mime_type: Some("image/jpeg".to_string()),
        });

        let op = QueuedOperation::new(Mutation::create_register(data));
        let stored = op.mutation.payload().unwrap();

        assert!(stored.files.is_empty());
        assert_eq!(stored.files_metadata.len(), 1);
        assert_eq!(stored.files_metadata[0].uri, "file:///photos/1.jpg");
    }

    #[test]
    fn test_wire_shape_for_update() {
        let op = QueuedOperation::new(Mutation::update_register(42, payload("7")));
        let value = serde_json::to_value(&op).unwrap();

        assert_eq!(value["type"], "UPDATE_REGISTER");
        assert_eq!(value["registroId"], 42);
        assert_eq!(value["retries"], 0);
        assert_eq!(value["data"]["imovel_numero"], "7");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_create_has_no_registro_id() {
        let op = QueuedOperation::new(Mutation::create_register(payload("1")));
        let value = serde_json::to_value(&op).unwrap();
        assert!(value.get("registroId").is_none());
    }

    #[test]
    fn test_files_never_serialized() {
        let mut data = payload("12");
        data.files.push(FileAttachment {
            uri: "file:///a.png".to_string(),
            name: None,
            mime_type: None,
        });

        let value = serde_json::to_value(&data).unwrap();
        assert!(value.get("files").is_none());
        assert!(value.get("_filesMetadata").is_none());
    }

    #[test]
    fn test_legacy_entry_defaults() {
        let raw = json!({
            "id": "1700000000000abcdefghi",
            "type": "CREATE_REGISTER",
            "data": { "imovel_numero": 12, "a1": "3", "area_de_visita_id": "5" }
        });

        let op: QueuedOperation = serde_json::from_value(raw).unwrap();
        let data = op.mutation.payload().unwrap();

        assert_eq!(op.retries, 0);
        assert!(op.timestamp.is_none());
        assert_eq!(data.imovel_numero, "12");
        assert_eq!(data.a1, 3);
        assert_eq!(data.area_de_visita_id, Some(5));
    }

    #[test]
    fn test_entry_ids() {
        let numeric: QueuedOperation =
            serde_json::from_value(json!({"id": 17, "type": "CREATE_REGISTER", "data": {}}))
                .unwrap();
        assert_eq!(numeric.id, "17");
        assert_eq!(entry_id(&json!({"id": 17})).as_deref(), Some("17"));

        for entry in [json!({"type": "CREATE_REGISTER"}), json!({"id": ""}), json!({"id": null})] {
            assert!(entry_id(&entry).is_none());
            assert!(serde_json::from_value::<QueuedOperation>(entry).is_err());
        }
    }

    #[test]
    fn test_string_registro_id_accepted() {
        let raw = json!({
            "id": "x",
            "timestamp": "2024-03-01T12:00:00.000Z",
            "retries": 1,
            "type": "UPDATE_REGISTER",
            "registroId": "42",
            "data": {}
        });

        let op: QueuedOperation = serde_json::from_value(raw).unwrap();
        assert_eq!(op.mutation.registro_id(), Some(42));
        assert_eq!(op.retries, 1);
        assert_eq!(
            op.timestamp.unwrap().to_rfc3339(),
            "2024-03-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_unknown_type_preserved_verbatim() {
        let raw = json!({
            "id": "x",
            "timestamp": "2024-03-01T12:00:00.000Z",
            "retries": 2,
            "type": "DELETE_REGISTER",
            "registroId": 9,
            "data": { "reason": "duplicate" }
        });

        let op: QueuedOperation = serde_json::from_value(raw.clone()).unwrap();
        assert!(op.mutation.operation_type().is_none());
        assert_eq!(op.mutation.kind(), "DELETE_REGISTER");

        let back = serde_json::to_value(&op).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_update_without_registro_id_is_unrecognized() {
        let raw = json!({ "id": "x", "type": "UPDATE_REGISTER", "data": {} });

        let op: QueuedOperation = serde_json::from_value(raw).unwrap();
        match op.mutation {
            Mutation::Unrecognized { reason, .. } => assert!(reason.contains("registroId")),
            other => panic!("expected unrecognized, got {other:?}"),
        }
    }

    #[test]
    fn test_unmodelled_fields_kept() {
        let raw = json!({ "imovel_numero": "3", "latitude": -9.66 });

        let data: RegisterPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(data.extra.get("latitude"), Some(&json!(-9.66)));

        let back = serde_json::to_value(&data).unwrap();
        assert_eq!(back["latitude"], json!(-9.66));
    }

    #[test]
    fn test_queue_status_from_queue() {
        let first = QueuedOperation::new(Mutation::create_register(payload("1")));
        let second = QueuedOperation::new(Mutation::update_register(8, payload("2")));

        let status = QueueStatus::from_queue(&[first.clone(), second]);

        assert_eq!(status.count, 2);
        assert_eq!(status.operations[0].id, first.id);
        assert_eq!(status.operations[1].kind, "UPDATE_REGISTER");
        assert_eq!(status.oldest(), first.timestamp);
    }
}

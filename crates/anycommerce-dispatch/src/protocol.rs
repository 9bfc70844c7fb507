//! # Command Envelope
//!
//! Request, batch and response types exchanged with the commerce backend.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Command Envelope                                   │
//! │                                                                         │
//! │  REQUEST (one object per command)                                      │
//! │  ───────                                                               │
//! │  { "_cmd": "cartItemAppend", "cartId": "...", "sku": "...", "qty": 2,  │
//! │    "_tag": { "datapointer": "cartDetail|...", "callback": "..." } }    │
//! │                                                                         │
//! │  BATCH (one outbound call)                                             │
//! │  ─────                                                                 │
//! │  [ request, request, ... ]                                             │
//! │                                                                         │
//! │  RESPONSE                                                              │
//! │  ────────                                                              │
//! │  [ result, ... ]   or   { "results": [ result, ... ], "messages": [] } │
//! │  result = { "_rcmd": "...", "_rtag": {...}, "messages": [...], ... }   │
//! │                                                                         │
//! │  CORRELATION                                                           │
//! │  ───────────                                                           │
//! │  1. result._rtag.datapointer → first unmatched entry with that pointer │
//! │  2. remaining results → remaining entries, by position                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Command Classes
//! | command           | default class |
//! |-------------------|---------------|
//! | `appProductGet`   | mutable       |
//! | `appCategoryList` | mutable       |
//! | `appPublicSearch` | mutable       |
//! | `cartDetail`      | mutable       |
//! | `appCartCreate`   | immutable     |
//! | `cartItemAppend`  | immutable     |
//! | `cartItemUpdate`  | immutable     |
//! | `cartItemRemove`  | immutable     |
//! | `cartCouponAdd`   | immutable     |

use std::fmt;

use anycommerce_core::validation::{
    normalize_coupon_code, validate_product_id, validate_sku,
};
use anycommerce_core::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DispatchError, DispatchResult};

// =============================================================================
// Queue Class
// =============================================================================

/// Consistency class of a queued request.
///
/// ```text
/// Mutable   - best effort; abortable; superseded by newer requests with
///             the same data pointer
/// Immutable - exactly once, in order, one batch in flight at a time
/// Passive   - fire-and-forget; never aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueClass {
    Mutable,
    Immutable,
    Passive,
}

impl QueueClass {
    pub const ALL: [QueueClass; 3] = [
        QueueClass::Mutable,
        QueueClass::Immutable,
        QueueClass::Passive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueClass::Mutable => "mutable",
            QueueClass::Immutable => "immutable",
            QueueClass::Passive => "passive",
        }
    }
}

impl fmt::Display for QueueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Returned by `enqueue`; identifies one request inside the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestHandle(u64);

impl RequestHandle {
    pub(crate) fn new(value: u64) -> Self {
        RequestHandle(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Identifies a drained batch. Carries the class it was drained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId {
    class: QueueClass,
    seq: u64,
}

impl BatchId {
    pub(crate) fn new(class: QueueClass, seq: u64) -> Self {
        BatchId { class, seq }
    }

    pub fn class(&self) -> QueueClass {
        self.class
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.class, self.seq)
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Every backend command this crate knows, with its typed payload.
///
/// Serializes internally tagged: `{ "_cmd": "cartDetail", "cartId": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_cmd", rename_all = "camelCase")]
pub enum Command {
    /// Product definition by product id.
    AppProductGet { pid: String },

    /// Start a server-side cart.
    AppCartCreate,

    CartDetail {
        #[serde(rename = "cartId")]
        cart_id: String,
    },

    CartItemAppend {
        #[serde(rename = "cartId")]
        cart_id: String,
        sku: String,
        qty: i64,
    },

    CartItemUpdate {
        #[serde(rename = "cartId")]
        cart_id: String,
        sku: String,
        qty: i64,
    },

    CartItemRemove {
        #[serde(rename = "cartId")]
        cart_id: String,
        sku: String,
    },

    /// Category tree, optionally rooted at a navigation category.
    AppCategoryList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        navcat: Option<String>,
    },

    /// Search; the query is passed to the backend untouched.
    AppPublicSearch { query: Value },

    CartCouponAdd {
        #[serde(rename = "cartId")]
        cart_id: String,
        code: String,
    },
}

impl Command {
    /// Wire names of all known commands.
    pub const NAMES: [&'static str; 9] = [
        "appProductGet",
        "appCartCreate",
        "cartDetail",
        "cartItemAppend",
        "cartItemUpdate",
        "cartItemRemove",
        "appCategoryList",
        "appPublicSearch",
        "cartCouponAdd",
    ];

    /// The `_cmd` wire name.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AppProductGet { .. } => "appProductGet",
            Command::AppCartCreate => "appCartCreate",
            Command::CartDetail { .. } => "cartDetail",
            Command::CartItemAppend { .. } => "cartItemAppend",
            Command::CartItemUpdate { .. } => "cartItemUpdate",
            Command::CartItemRemove { .. } => "cartItemRemove",
            Command::AppCategoryList { .. } => "appCategoryList",
            Command::AppPublicSearch { .. } => "appPublicSearch",
            Command::CartCouponAdd { .. } => "cartCouponAdd",
        }
    }

    /// The queue a command belongs in: cart mutations are immutable,
    /// reads and searches are mutable.
    pub fn default_class(&self) -> QueueClass {
        match self {
            Command::AppCartCreate
            | Command::CartItemAppend { .. }
            | Command::CartItemUpdate { .. }
            | Command::CartItemRemove { .. }
            | Command::CartCouponAdd { .. } => QueueClass::Immutable,
            Command::AppProductGet { .. }
            | Command::CartDetail { .. }
            | Command::AppCategoryList { .. }
            | Command::AppPublicSearch { .. } => QueueClass::Mutable,
        }
    }

    /// Checks identifiers and quantities in the payload.
    pub fn validate(&self) -> DispatchResult<()> {
        match self {
            Command::AppProductGet { pid } => validate_product_id(pid)?,
            Command::AppCartCreate
            | Command::AppCategoryList { .. }
            | Command::AppPublicSearch { .. } => {}
            Command::CartDetail { cart_id } => require_cart_id(cart_id)?,
            Command::CartItemAppend { cart_id, sku, qty } => {
                require_cart_id(cart_id)?;
                validate_sku(sku)?;
                if *qty <= 0 {
                    return Err(ValidationError::OutOfRange {
                        field: "qty".to_string(),
                        min: 1,
                        max: i64::MAX,
                    }
                    .into());
                }
            }
            Command::CartItemUpdate { cart_id, sku, qty } => {
                require_cart_id(cart_id)?;
                validate_sku(sku)?;
                if *qty < 0 {
                    return Err(ValidationError::Negative {
                        field: "qty".to_string(),
                    }
                    .into());
                }
            }
            Command::CartItemRemove { cart_id, sku } => {
                require_cart_id(cart_id)?;
                validate_sku(sku)?;
            }
            Command::CartCouponAdd { cart_id, code } => {
                require_cart_id(cart_id)?;
                normalize_coupon_code(code)?;
            }
        }
        Ok(())
    }
}

fn require_cart_id(cart_id: &str) -> Result<(), ValidationError> {
    if cart_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "cartId".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Request
// =============================================================================

/// Correlation tag echoed back by the backend as `_rtag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTag {
    /// Where the host stores the response; also the supersede key for
    /// mutable requests.
    pub datapointer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl RequestTag {
    pub fn new(datapointer: impl Into<String>) -> Self {
        RequestTag {
            datapointer: datapointer.into(),
            callback: None,
            extension: None,
        }
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

/// One outbound command. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(flatten)]
    pub command: Command,

    #[serde(rename = "_tag", default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<RequestTag>,
}

impl Request {
    pub fn new(command: Command) -> Self {
        Request { command, tag: None }
    }

    pub fn with_tag(mut self, tag: RequestTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Parses a request object received from the host.
    ///
    /// ## Errors
    /// - `MalformedRequest` when the value is not an object or `_cmd` is
    ///   missing or not a string
    /// - `UnknownCommand` when `_cmd` is not a known command
    /// - `Serialization` when the payload does not match the command
    /// - `Validation` when an identifier or quantity is invalid
    pub fn from_value(value: Value) -> DispatchResult<Request> {
        let Some(object) = value.as_object() else {
            return Err(DispatchError::MalformedRequest(
                "request must be a JSON object".to_string(),
            ));
        };

        let name = match object.get("_cmd") {
            Some(Value::String(name)) => name,
            Some(_) => {
                return Err(DispatchError::MalformedRequest(
                    "_cmd must be a string".to_string(),
                ))
            }
            None => return Err(DispatchError::MalformedRequest("missing _cmd".to_string())),
        };

        if !Command::NAMES.contains(&name.as_str()) {
            return Err(DispatchError::UnknownCommand { name: name.clone() });
        }

        let request: Request = serde_json::from_value(value)?;
        request.command.validate()?;
        Ok(request)
    }

    /// The wire object for this request.
    pub fn to_value(&self) -> DispatchResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn command_name(&self) -> &'static str {
        self.command.name()
    }

    /// Command fields as a plain map, without `_cmd` and `_tag`.
    pub fn params(&self) -> Map<String, Value> {
        match serde_json::to_value(&self.command) {
            Ok(Value::Object(mut map)) => {
                map.remove("_cmd");
                map
            }
            _ => Map::new(),
        }
    }

    pub fn data_pointer(&self) -> Option<&str> {
        self.tag.as_ref().map(|t| t.datapointer.as_str())
    }
}

impl From<Command> for Request {
    fn from(command: Command) -> Self {
        Request::new(command)
    }
}

// =============================================================================
// Batch
// =============================================================================

/// A request as it sat in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub handle: RequestHandle,
    pub request: Request,
}

/// Requests drained together, destined for one transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    id: BatchId,
    entries: Vec<BatchEntry>,
}

impl Batch {
    pub(crate) fn new(id: BatchId, entries: Vec<BatchEntry>) -> Self {
        Batch { id, entries }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn class(&self) -> QueueClass {
        self.id.class()
    }

    /// Entries in arrival order.
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.entries.iter().map(|e| &e.request)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The JSON array sent as one outbound call.
    pub fn to_wire(&self) -> DispatchResult<Value> {
        let requests: Vec<&Request> = self.requests().collect();
        Ok(serde_json::to_value(requests)?)
    }
}

// =============================================================================
// Response
// =============================================================================

/// A backend message; passed through uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Backend error or info code (string or number, as sent).
    #[serde(default)]
    pub code: Value,

    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub text: String,
}

/// The result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    #[serde(rename = "_rcmd", default, skip_serializing_if = "Option::is_none")]
    pub rcmd: Option<String>,

    #[serde(rename = "_rtag", default, skip_serializing_if = "Option::is_none")]
    pub rtag: Option<RequestTag>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ResponseMessage>,

    /// Everything else the backend returned.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

/// Results of one outbound call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub results: Vec<CommandResult>,

    /// Call-level messages.
    #[serde(default)]
    pub messages: Vec<ResponseMessage>,
}

impl BatchResponse {
    /// Parses a bare result array or a `{ results, messages }` object.
    pub fn from_value(value: Value) -> DispatchResult<BatchResponse> {
        if value.is_array() {
            return Ok(BatchResponse {
                results: serde_json::from_value(value)?,
                messages: Vec::new(),
            });
        }

        if value.get("results").is_some_and(Value::is_array) {
            return Ok(serde_json::from_value(value)?);
        }

        Err(DispatchError::MalformedResponse(
            "expected an array of results or an object with a results array".to_string(),
        ))
    }

    /// Pairs every batch entry with its result.
    ///
    /// Results echoing `_rtag.datapointer` match the first unmatched entry
    /// with that pointer; the remaining results fill the remaining entries in
    /// order. Entries left over get `None`.
    pub fn correlate<'a, 'b>(
        &'a self,
        batch: &'b Batch,
    ) -> Vec<(&'b BatchEntry, Option<&'a CommandResult>)> {
        let entries = batch.entries();
        let mut assigned: Vec<Option<usize>> = vec![None; entries.len()];
        let mut used = vec![false; self.results.len()];

        for (r, result) in self.results.iter().enumerate() {
            let Some(pointer) = result.rtag.as_ref().map(|t| t.datapointer.as_str()) else {
                continue;
            };
            let slot = (0..entries.len()).find(|&e| {
                assigned[e].is_none() && entries[e].request.data_pointer() == Some(pointer)
            });
            if let Some(e) = slot {
                assigned[e] = Some(r);
                used[r] = true;
            }
        }

        let mut leftovers = (0..self.results.len()).filter(|&r| !used[r]);
        for slot in assigned.iter_mut().filter(|slot| slot.is_none()) {
            match leftovers.next() {
                Some(r) => *slot = Some(r),
                None => break,
            }
        }

        entries
            .iter()
            .zip(assigned)
            .map(|(entry, r)| (entry, r.map(|r| &self.results[r])))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(handle: u64, request: Request) -> BatchEntry {
        BatchEntry {
            handle: RequestHandle::new(handle),
            request,
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let request = Request::new(Command::CartItemAppend {
            cart_id: "c1".to_string(),
            sku: "APP4DOG-blue".to_string(),
            qty: 2,
        })
        .with_tag(RequestTag::new("cartDetail|c1").with_callback("updateCart"));

        assert_eq!(
            request.to_value().unwrap(),
            json!({
                "_cmd": "cartItemAppend",
                "cartId": "c1",
                "sku": "APP4DOG-blue",
                "qty": 2,
                "_tag": { "datapointer": "cartDetail|c1", "callback": "updateCart" }
            })
        );

        let create = Request::new(Command::AppCartCreate);
        assert_eq!(create.to_value().unwrap(), json!({ "_cmd": "appCartCreate" }));
    }

    #[test]
    fn test_request_from_value() {
        let request = Request::from_value(json!({
            "_cmd": "appProductGet",
            "pid": "APP4DOG",
            "_tag": { "datapointer": "appProductGet|APP4DOG" }
        }))
        .unwrap();

        assert_eq!(
            request.command,
            Command::AppProductGet {
                pid: "APP4DOG".to_string()
            }
        );
        assert_eq!(request.data_pointer(), Some("appProductGet|APP4DOG"));
        assert_eq!(request.command_name(), "appProductGet");
        assert_eq!(request.params().get("pid"), Some(&json!("APP4DOG")));
        assert!(!request.params().contains_key("_cmd"));
    }

    #[test]
    fn test_request_from_value_rejections() {
        assert!(matches!(
            Request::from_value(json!({ "pid": "X" })),
            Err(DispatchError::MalformedRequest(_))
        ));
        assert!(matches!(
            Request::from_value(json!([1, 2])),
            Err(DispatchError::MalformedRequest(_))
        ));
        assert!(matches!(
            Request::from_value(json!({ "_cmd": "appTeleport" })),
            Err(DispatchError::UnknownCommand { name }) if name == "appTeleport"
        ));
        assert!(matches!(
            Request::from_value(json!({ "_cmd": "cartDetail" })),
            Err(DispatchError::Serialization(_))
        ));
        assert!(matches!(
            Request::from_value(json!({
                "_cmd": "cartItemAppend", "cartId": "c1", "sku": "A", "qty": -1
            })),
            Err(DispatchError::Validation(_))
        ));
    }

    #[test]
    fn test_command_names_and_classes() {
        let commands = [
            Command::AppProductGet { pid: "P".into() },
            Command::AppCartCreate,
            Command::CartDetail { cart_id: "c".into() },
            Command::CartItemAppend {
                cart_id: "c".into(),
                sku: "S".into(),
                qty: 1,
            },
            Command::CartItemUpdate {
                cart_id: "c".into(),
                sku: "S".into(),
                qty: 0,
            },
            Command::CartItemRemove {
                cart_id: "c".into(),
                sku: "S".into(),
            },
            Command::AppCategoryList { navcat: None },
            Command::AppPublicSearch {
                query: json!({ "match": { "prod_name": "dog" } }),
            },
            Command::CartCouponAdd {
                cart_id: "c".into(),
                code: "SAVE10".into(),
            },
        ];

        for (command, name) in commands.iter().zip(Command::NAMES) {
            assert_eq!(command.name(), name);
            let value = serde_json::to_value(command).unwrap();
            assert_eq!(value["_cmd"], name);
            assert!(command.validate().is_ok());
        }

        assert_eq!(commands[1].default_class(), QueueClass::Immutable);
        assert_eq!(commands[3].default_class(), QueueClass::Immutable);
        assert_eq!(commands[8].default_class(), QueueClass::Immutable);
        assert_eq!(commands[0].default_class(), QueueClass::Mutable);
        assert_eq!(commands[2].default_class(), QueueClass::Mutable);
        assert_eq!(commands[7].default_class(), QueueClass::Mutable);
    }

    #[test]
    fn test_batch_to_wire() {
        let batch = Batch::new(
            BatchId::new(QueueClass::Mutable, 0),
            vec![
                entry(1, Request::new(Command::AppCategoryList { navcat: None })),
                entry(2, Request::new(Command::AppProductGet { pid: "A".into() })),
            ],
        );

        assert_eq!(
            batch.to_wire().unwrap(),
            json!([
                { "_cmd": "appCategoryList" },
                { "_cmd": "appProductGet", "pid": "A" }
            ])
        );
        assert_eq!(batch.id().to_string(), "mutable-0");
    }

    #[test]
    fn test_batch_response_forms() {
        let bare = BatchResponse::from_value(json!([
            { "_rcmd": "appProductGet", "pid": "A", "%attribs": {} }
        ]))
        .unwrap();
        assert_eq!(bare.results.len(), 1);
        assert_eq!(bare.results[0].rcmd.as_deref(), Some("appProductGet"));
        assert!(bare.results[0].body.contains_key("%attribs"));

        let wrapped = BatchResponse::from_value(json!({
            "results": [
                { "messages": [ { "code": 8001, "type": "error", "text": "Out of stock" } ] }
            ],
            "messages": [ { "code": "WARN", "type": "warn", "text": "Slow" } ]
        }))
        .unwrap();
        assert_eq!(wrapped.messages[0].kind, "warn");
        assert_eq!(wrapped.results[0].messages[0].code, json!(8001));
        assert_eq!(wrapped.results[0].messages[0].text, "Out of stock");

        assert!(matches!(
            BatchResponse::from_value(json!({ "oops": true })),
            Err(DispatchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_correlate_by_tag_then_position() {
        let tagged = |pointer: &str| {
            Request::new(Command::AppProductGet { pid: "A".into() })
                .with_tag(RequestTag::new(pointer))
        };
        let batch = Batch::new(
            BatchId::new(QueueClass::Mutable, 3),
            vec![
                entry(1, tagged("p1")),
                entry(2, Request::new(Command::AppCategoryList { navcat: None })),
                entry(3, tagged("p3")),
            ],
        );

        let response = BatchResponse::from_value(json!([
            { "_rtag": { "datapointer": "p3" }, "n": 3 },
            { "n": 1 }
        ]))
        .unwrap();

        let pairs = response.correlate(&batch);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].1.map(|r| r.body["n"].clone()), Some(json!(1)));
        assert!(pairs[1].1.is_none());
        assert_eq!(pairs[2].1.map(|r| r.body["n"].clone()), Some(json!(3)));
    }
}

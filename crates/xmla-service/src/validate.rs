//! Request validation: transport headers and the JSON batch payload.
//!
//! Both routines are pure. Nothing here touches the network, so a request
//! that fails validation never reaches the connection stage.

use serde::Deserialize;
use validator::ValidateEmail;

use crate::error::ValidationError;
use crate::types::{
    ConnectionCoordinates, ImpersonationIdentity, QueryBatchRequest, QueryItem, SerializerSettings,
};

pub const TENANT_ID_HEADER: &str = "x-pbi-tenant-id";
pub const CLIENT_ID_HEADER: &str = "x-pbi-client-id";
pub const CLIENT_SECRET_HEADER: &str = "x-pbi-client-secret";
pub const ENDPOINT_HEADER: &str = "x-pbi-xmla-endpoint";
pub const DATASET_HEADER: &str = "x-pbi-dataset-name";

/// Required headers, in the order they are checked.
pub const REQUIRED_HEADERS: [&str; 5] = [
    TENANT_ID_HEADER,
    CLIENT_ID_HEADER,
    CLIENT_SECRET_HEADER,
    ENDPOINT_HEADER,
    DATASET_HEADER,
];

/// Reads the connection coordinates through `lookup`, which returns the
/// raw header bytes.
///
/// Stops at the first required header that is absent, blank, or not UTF-8,
/// in [`REQUIRED_HEADERS`] order.
pub fn coordinates_from_headers<'a, F>(lookup: F) -> Result<ConnectionCoordinates, ValidationError>
where
    F: Fn(&'static str) -> Option<&'a [u8]>,
{
    let [tenant_id, client_id, client_secret, endpoint, dataset] =
        REQUIRED_HEADERS.map(|name| (name, lookup(name)));

    let require = |(name, value): (&'static str, Option<&'a [u8]>)| {
        let raw = value.ok_or(ValidationError::MissingHeader(name))?;
        let text = std::str::from_utf8(raw)
            .map_err(|_| ValidationError::InvalidHeader(name))?
            .trim();
        if text.is_empty() {
            return Err(ValidationError::MissingHeader(name));
        }
        Ok(text.to_owned())
    };

    Ok(ConnectionCoordinates {
        tenant_id: require(tenant_id)?,
        client_id: require(client_id)?,
        client_secret: require(client_secret)?,
        endpoint: require(endpoint)?,
        dataset: require(dataset)?,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBatchRequest {
    #[serde(default)]
    queries: Option<Vec<RawQueryItem>>,
    #[serde(default)]
    impersonated_user_name: Option<String>,
    #[serde(default)]
    serializer_settings: Option<SerializerSettings>,
}

#[derive(Deserialize)]
struct RawQueryItem {
    #[serde(default)]
    query: Option<String>,
}

/// Parses and validates the request body.
///
/// Every query is checked for blank text; offending indexes are reported
/// together in one detail message.
pub fn parse_batch(body: &[u8]) -> Result<QueryBatchRequest, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::body("request body is required"));
    }

    let raw: RawBatchRequest = serde_json::from_slice(body)
        .map_err(|e| ValidationError::body(format!("request body is not a valid query batch: {e}")))?;

    let items = raw.queries.unwrap_or_default();
    if items.is_empty() {
        return Err(ValidationError::body(
            "queries must contain at least one item",
        ));
    }

    let blank: Vec<String> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.query.as_deref().is_none_or(|q| q.trim().is_empty()))
        .map(|(idx, _)| format!("queries[{idx}].query must not be blank"))
        .collect();
    if !blank.is_empty() {
        return Err(ValidationError::body(blank.join("; ")));
    }

    let user = raw
        .impersonated_user_name
        .map(|u| u.trim().to_owned())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ValidationError::body("impersonatedUserName is required"))?;
    if !user.validate_email() {
        return Err(ValidationError::body(
            "impersonatedUserName must be an email address",
        ));
    }

    Ok(QueryBatchRequest {
        queries: items
            .into_iter()
            .map(|item| QueryItem {
                query: item.query.unwrap_or_default(),
            })
            .collect(),
        impersonated_user_name: ImpersonationIdentity::new(user),
        serializer_settings: raw.serializer_settings.unwrap_or_default(),
    })
}

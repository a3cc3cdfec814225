//! Endpoint URL resolution.
//!
//! `powerbi://` and `asazure://` data sources are XMLA over HTTPS; the
//! scheme is swapped and the rest of the address kept byte for byte.

use url::Url;

use crate::error::XmlaError;

const HTTPS_SCHEMES: [&str; 2] = ["powerbi", "asazure"];

/// Resolves a data source to the HTTP URL that receives SOAP requests.
pub fn resolve(data_source: &str) -> Result<Url, XmlaError> {
    let trimmed = data_source.trim();
    let invalid = |reason: String| XmlaError::Endpoint(format!("invalid XMLA endpoint '{trimmed}': {reason}"));

    let (scheme, rest) = trimmed
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme".into()))?;

    let address = match scheme.to_ascii_lowercase().as_str() {
        "http" | "https" => trimmed.to_owned(),
        s if HTTPS_SCHEMES.contains(&s) => format!("https://{rest}"),
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    };

    let url = Url::parse(&address).map_err(|e| invalid(e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".into()));
    }
    Ok(url)
}

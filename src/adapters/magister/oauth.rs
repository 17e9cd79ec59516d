//! OIDC implicit-flow helpers: tenant client ids, authorize URL, token extraction from redirects.

use crate::domain::DomainError;
use url::Url;

/// Scopes requested for the access token.
pub const SCOPES: &str = "openid profile grades.read grades.manage calendar.user";

/// First host label of the school URL ("https://lyceum.magister.net" -> "lyceum").
pub fn school_subdomain(school_url: &str) -> Result<String, DomainError> {
    let url = Url::parse(school_url)
        .map_err(|e| DomainError::Config(format!("invalid school URL '{}': {}", school_url, e)))?;
    url.host_str()
        .and_then(|h| h.split('.').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DomainError::Config(format!("school URL has no host: {}", school_url)))
}

/// Query parameters for `/connect/authorize` for the given tenant.
pub fn authorize_params(subdomain: &str) -> Vec<(&'static str, String)> {
    vec![
        ("client_id", format!("M6-{}.magister.net", subdomain)),
        (
            "redirect_uri",
            format!("https://{}.magister.net/oidc/redirect_callback.html", subdomain),
        ),
        ("response_type", "id_token token".to_string()),
        ("scope", SCOPES.to_string()),
        ("state", "123".to_string()),
        ("nonce", "456".to_string()),
    ]
}

/// `access_token` from a redirect URL, looking at the query first and then the fragment.
pub fn extract_access_token(redirect: &str) -> Option<String> {
    let url = Url::parse(redirect).ok()?;
    let from_query = url
        .query_pairs()
        .find(|(k, _)| k == "access_token")
        .map(|(_, v)| v.into_owned());
    from_query.or_else(|| {
        url.fragment().and_then(|frag| {
            url::form_urlencoded::parse(frag.as_bytes())
                .find(|(k, _)| k == "access_token")
                .map(|(_, v)| v.into_owned())
        })
    })
}

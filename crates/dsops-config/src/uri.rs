use std::collections::HashMap;

use dsops_domain::Reference;

use crate::error::ConfigError;

/// Percent-decode a URI component. Unpaired `%` sequences pass through
/// unchanged rather than erroring — malformed escapes in a hand-written
/// config file should surface as a lookup failure downstream, not a parse
/// failure here.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse `a=b&c=d` query strings into a map, percent-decoding values.
fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((key.to_string(), percent_decode(value)))
        })
        .collect()
}

/// Parse a `store://` or `svc://` reference URI (§6).
///
/// The store form's `#<field>` and `?version=<v>` components can appear in
/// either order in the wild despite the spec's canonical ordering, so both
/// are located independently rather than assumed to come in RFC 3986 order
/// (which would put the query before the fragment).
pub fn parse_reference_uri(uri: &str) -> Result<Reference, ConfigError> {
    if let Some(rest) = uri.strip_prefix("store://") {
        parse_store_uri(rest)
    } else if let Some(rest) = uri.strip_prefix("svc://") {
        parse_svc_uri(rest)
    } else {
        Err(ConfigError::Conversion {
            field: "from".to_string(),
            message: format!("unrecognized reference URI scheme: {uri}"),
        })
    }
}

fn parse_store_uri(rest: &str) -> Result<Reference, ConfigError> {
    let slash = rest.find('/').ok_or_else(|| ConfigError::Conversion {
        field: "from".to_string(),
        message: format!("store:// reference missing path: store://{rest}"),
    })?;
    let store = rest[..slash].to_string();
    let after_store = &rest[slash + 1..];

    let hash_pos = after_store.find('#');
    let question_pos = after_store.find('?');

    let path_end = match (hash_pos, question_pos) {
        (Some(h), Some(q)) => h.min(q),
        (Some(h), None) => h,
        (None, Some(q)) => q,
        (None, None) => after_store.len(),
    };
    let path = percent_decode(&after_store[..path_end]);

    let mut field = None;
    let mut version = None;

    if let Some(h) = hash_pos {
        let after_hash = &after_store[h + 1..];
        let (frag, query) = match after_hash.find('?') {
            Some(q) => (&after_hash[..q], Some(&after_hash[q + 1..])),
            None => (after_hash, None),
        };
        field = Some(frag.to_string());
        if let Some(q) = query {
            version = parse_query(q).remove("version");
        }
    } else if let Some(q) = question_pos {
        version = parse_query(&after_store[q + 1..]).remove("version");
    }

    Ok(Reference::Store { store, path, field, version })
}

fn parse_svc_uri(rest: &str) -> Result<Reference, ConfigError> {
    let slash = rest.find('/').ok_or_else(|| ConfigError::Conversion {
        field: "from".to_string(),
        message: format!("svc:// reference missing id: svc://{rest}"),
    })?;
    let service_type = rest[..slash].to_string();
    let after_type = &rest[slash + 1..];

    let (id_part, params) = match after_type.find('?') {
        Some(q) => (&after_type[..q], parse_query(&after_type[q + 1..])),
        None => (after_type, HashMap::new()),
    };

    Ok(Reference::Service { service_type, id: percent_decode(id_part), params })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_uri_with_field_and_version() {
        let r = parse_reference_uri("store://vault/db/creds#password?version=3").unwrap();
        match r {
            Reference::Store { store, path, field, version } => {
                assert_eq!(store, "vault");
                assert_eq!(path, "db/creds");
                assert_eq!(field.as_deref(), Some("password"));
                assert_eq!(version.as_deref(), Some("3"));
            }
            other => panic!("expected Store, got {other:?}"),
        }
    }

    #[test]
    fn parses_store_uri_without_field_or_version() {
        let r = parse_reference_uri("store://vault/db/creds").unwrap();
        match r {
            Reference::Store { store, path, field, version } => {
                assert_eq!(store, "vault");
                assert_eq!(path, "db/creds");
                assert!(field.is_none());
                assert!(version.is_none());
            }
            other => panic!("expected Store, got {other:?}"),
        }
    }

    #[test]
    fn percent_decodes_path_segments() {
        let r = parse_reference_uri("store://vault/path%20with%20spaces").unwrap();
        match r {
            Reference::Store { path, .. } => assert_eq!(path, "path with spaces"),
            other => panic!("expected Store, got {other:?}"),
        }
    }

    #[test]
    fn parses_svc_uri_with_params() {
        let r = parse_reference_uri("svc://postgres/prod-db?kind=password&host=db.internal").unwrap();
        match r {
            Reference::Service { service_type, id, params } => {
                assert_eq!(service_type, "postgres");
                assert_eq!(id, "prod-db");
                assert_eq!(params.get("kind").map(String::as_str), Some("password"));
                assert_eq!(params.get("host").map(String::as_str), Some("db.internal"));
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(parse_reference_uri("ftp://nope/path").is_err());
    }
}

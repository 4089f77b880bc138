use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::RenderError;

/// Render a `template` format file (§4.D "File rendering", `template`
/// format). Tokens are `{{ name }}` (plain lookup) or `{{ helper:name }}`
/// / `{{ helper:arg:name }}` (a named helper applied to the variable's
/// value), matching this workspace's `<op>:<arg>` convention for transform
/// expressions.
pub fn render(template: &str, variables: &HashMap<String, String>) -> Result<String, RenderError> {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        let Some(start) = rest.find("{{") else {
            result.push_str(rest);
            break;
        };
        let Some(end) = rest[start..].find("}}") else {
            result.push_str(rest);
            break;
        };
        result.push_str(&rest[..start]);
        let inner = rest[start + 2..start + end].trim();
        result.push_str(&evaluate_token(inner, variables)?);
        rest = &rest[start + end + 2..];
    }

    Ok(result)
}

fn evaluate_token(token: &str, variables: &HashMap<String, String>) -> Result<String, RenderError> {
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() == 1 {
        return lookup(parts[0], variables);
    }

    let helper = parts[0];
    let (arg, name) = match parts.len() {
        2 => (None, parts[1]),
        3 => (Some(parts[1]), parts[2]),
        _ => return Err(RenderError::Template(format!("malformed template token '{{{{ {token} }}}}'"))),
    };
    let value = lookup(name, variables)?;

    match helper {
        "json" => serde_json::to_string(&value).map_err(|e| RenderError::Template(e.to_string())),
        "base64" => Ok(BASE64.encode(value.as_bytes())),
        "base64decode" => {
            let decoded = BASE64.decode(value.as_bytes()).map_err(|e| RenderError::Template(e.to_string()))?;
            Ok(String::from_utf8_lossy(&decoded).into_owned())
        }
        "indent" => {
            let width: usize = arg
                .ok_or_else(|| RenderError::Template("indent helper requires a width argument".to_string()))?
                .parse()
                .map_err(|_| RenderError::Template("indent width must be a non-negative integer".to_string()))?;
            let pad = " ".repeat(width);
            Ok(value.lines().map(|line| format!("{pad}{line}")).collect::<Vec<_>>().join("\n"))
        }
        "sha256" => {
            let mut hasher = Sha256::new();
            hasher.update(value.as_bytes());
            Ok(format!("{:x}", hasher.finalize()))
        }
        other => Err(RenderError::Template(format!("unknown template helper '{other}'"))),
    }
}

fn lookup(name: &str, variables: &HashMap<String, String>) -> Result<String, RenderError> {
    variables
        .get(name)
        .cloned()
        .ok_or_else(|| RenderError::Template(format!("template references unknown variable '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, String> {
        let mut v = HashMap::new();
        v.insert("password".to_string(), "hunter2".to_string());
        v
    }

    #[test]
    fn plain_substitution() {
        assert_eq!(render("pw={{ password }}", &vars()).unwrap(), "pw=hunter2");
    }

    #[test]
    fn json_helper_quotes_value() {
        assert_eq!(render("{{ json:password }}", &vars()).unwrap(), "\"hunter2\"");
    }

    #[test]
    fn base64_round_trip() {
        let encoded = render("{{ base64:password }}", &vars()).unwrap();
        assert_eq!(encoded, "aHVudGVyMg==");
        let mut v = HashMap::new();
        v.insert("encoded".to_string(), encoded);
        assert_eq!(render("{{ base64decode:encoded }}", &v).unwrap(), "hunter2");
    }

    #[test]
    fn indent_helper_prefixes_every_line() {
        let mut v = HashMap::new();
        v.insert("block".to_string(), "a\nb".to_string());
        assert_eq!(render("{{ indent:2:block }}", &v).unwrap(), "  a\n  b");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        assert!(render("{{ missing }}", &vars()).is_err());
    }
}

// Key-casing compatibility shim
//
// The backend serializes JSON with snake_case keys; the client models use
// camelCase. Responses are rewritten recursively before deserialization.
// One ad hoc rename is part of the contract: `product_url` becomes `url`
// on the product model. The override is deliberately not generalized -
// it is a known compatibility shim, not a rule.

use serde_json::{Map, Value};

/// Convert one snake_case key to camelCase.
///
/// Matches the original transform exactly: an underscore followed by a
/// lowercase ASCII letter is collapsed into the uppercased letter; any
/// other underscore is left alone.
pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' {
            match chars.peek() {
                Some(next) if next.is_ascii_lowercase() => {
                    out.push(next.to_ascii_uppercase());
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Recursively rewrite all object keys from snake_case to camelCase,
/// applying the single documented override `productUrl` -> `url`.
pub fn camelize_keys(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_keys).collect()),
        Value::Object(entries) => {
            let mut out = Map::with_capacity(entries.len());
            for (key, inner) in entries {
                let mut camel = snake_to_camel(&key);
                if camel == "productUrl" {
                    camel = "url".to_string();
                }
                out.insert(camel, camelize_keys(inner));
            }
            Value::Object(out)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_keys() {
        assert_eq!(snake_to_camel("pins_total"), "pinsTotal");
        assert_eq!(snake_to_camel("garments_created"), "garmentsCreated");
        assert_eq!(snake_to_camel("id"), "id");
    }

    #[test]
    fn test_underscore_not_followed_by_lowercase_is_kept() {
        // Mirrors the original regex /_([a-z])/g: digits and uppercase
        // after an underscore are not collapsed.
        assert_eq!(snake_to_camel("image_2x"), "image_2x");
        assert_eq!(snake_to_camel("trailing_"), "trailing_");
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let input = json!({
            "board_id": "b1",
            "outfits": [
                {"image_url": "https://x/1.jpg", "garments_count": 3}
            ]
        });
        let out = camelize_keys(input);
        assert_eq!(out["boardId"], "b1");
        assert_eq!(out["outfits"][0]["imageUrl"], "https://x/1.jpg");
        assert_eq!(out["outfits"][0]["garmentsCount"], 3);
    }

    #[test]
    fn test_product_url_override() {
        let input = json!({
            "products": [{"product_url": "https://store/item", "image_url": "https://img"}]
        });
        let out = camelize_keys(input);
        assert_eq!(out["products"][0]["url"], "https://store/item");
        assert!(out["products"][0].get("productUrl").is_none());
        assert_eq!(out["products"][0]["imageUrl"], "https://img");
    }

    #[test]
    fn test_scalars_untouched() {
        assert_eq!(camelize_keys(json!(42)), json!(42));
        assert_eq!(camelize_keys(json!("a_b")), json!("a_b"));
        assert_eq!(camelize_keys(json!(null)), json!(null));
    }
}

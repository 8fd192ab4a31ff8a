use crate::core::errors::ExchangeError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

/// Characters left as-is: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Ordered request parameters. Order is significant: it drives the signature.
pub type ParamMap = Map<String, Value>;

/// How array values are rendered into a query string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayEncoding {
    /// `symbols=["BTCUSDT","BNBBTC"]`, percent-encoded as one value
    #[default]
    Bracketed,
    /// `asset=BTC&asset=USDT`, one pair per element
    Repeated,
}

/// Empty means null, blank or whitespace-only strings, empty arrays and
/// empty objects. `false` and `0` are real values.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Copy of `params` without empty entries. The input is left untouched.
pub fn remove_empty_value(params: &ParamMap) -> ParamMap {
    params
        .iter()
        .filter(|(_, value)| !is_empty_value(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

pub fn build_query_string(
    params: &ParamMap,
    encoding: ArrayEncoding,
) -> Result<String, ExchangeError> {
    let mut pairs = Vec::with_capacity(params.len());

    for (key, value) in params {
        match (value, encoding) {
            (Value::Array(items), ArrayEncoding::Bracketed) => {
                let rendered = items
                    .iter()
                    .map(|item| array_item_to_string(key, item))
                    .collect::<Result<Vec<_>, _>>()?;
                let joined = format!("[\"{}\"]", rendered.join("\",\""));
                pairs.push(format!("{}={}", key, encode_component(&joined)));
            }
            (Value::Array(items), ArrayEncoding::Repeated) => {
                for item in items {
                    let rendered = scalar_to_string(key, item)?;
                    pairs.push(format!("{}={}", key, encode_component(&rendered)));
                }
            }
            _ => {
                let rendered = scalar_to_string(key, value)?;
                pairs.push(format!("{}={}", key, encode_component(&rendered)));
            }
        }
    }

    Ok(pairs.join("&"))
}

/// Percent-encode one value the way URI components are encoded
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

// null elements join as empty strings inside a bracketed array
fn array_item_to_string(key: &str, value: &Value) -> Result<String, ExchangeError> {
    match value {
        Value::Null => Ok(String::new()),
        _ => scalar_to_string(key, value),
    }
}

fn scalar_to_string(key: &str, value: &Value) -> Result<String, ExchangeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Array(_) | Value::Object(_) => Err(ExchangeError::InvalidParameters(format!(
            "parameter '{}' must be a scalar or an array of scalars",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> ParamMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!("  \t\n")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));

        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(0.0)));
        assert!(!is_empty_value(&json!("BTC")));
        assert!(!is_empty_value(&json!([""])));
        assert!(!is_empty_value(&json!({"a": null})));
    }

    #[test]
    fn test_remove_empty_value_keeps_order_and_falsy_scalars() {
        let input = params(json!({
            "symbol": "BTCUSDT",
            "blank": "   ",
            "enabled": false,
            "missing": null,
            "limit": 0,
            "assets": [],
            "filters": {},
            "side": "BUY",
        }));

        let cleaned = remove_empty_value(&input);

        let keys: Vec<&str> = cleaned.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["symbol", "enabled", "limit", "side"]);
        // caller's map is untouched
        assert_eq!(input.len(), 8);
    }

    #[test]
    fn test_empty_map_builds_empty_string() {
        let empty = ParamMap::new();
        assert_eq!(build_query_string(&empty, ArrayEncoding::Bracketed).unwrap(), "");
        assert_eq!(build_query_string(&empty, ArrayEncoding::Repeated).unwrap(), "");
    }

    #[test]
    fn test_scalars_follow_insertion_order() {
        let input = params(json!({
            "txId": "abc",
            "depositId": 3_644_705_731_255_021_600_u64,
            "flag": true,
            "price": 1.5,
        }));
        assert_eq!(
            build_query_string(&input, ArrayEncoding::Bracketed).unwrap(),
            "txId=abc&depositId=3644705731255021600&flag=true&price=1.5"
        );
    }

    #[test]
    fn test_bracketed_array_encoding() {
        let input = params(json!({"asset": ["BTC", "USDT"]}));
        assert_eq!(
            build_query_string(&input, ArrayEncoding::Bracketed).unwrap(),
            "asset=%5B%22BTC%22%2C%22USDT%22%5D"
        );
    }

    #[test]
    fn test_repeated_array_encoding() {
        let input = params(json!({"asset": ["BTC", "USDT"], "accountType": "SPOT"}));
        assert_eq!(
            build_query_string(&input, ArrayEncoding::Repeated).unwrap(),
            "asset=BTC&asset=USDT&accountType=SPOT"
        );
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let input = params(json!({"note": "a b&c=d/é"}));
        assert_eq!(
            build_query_string(&input, ArrayEncoding::Bracketed).unwrap(),
            "note=a%20b%26c%3Dd%2F%C3%A9"
        );
    }

    #[test]
    fn test_builder_is_deterministic() {
        let input = params(json!({"b": 2, "a": "x y", "c": ["1", "2"]}));
        let first = build_query_string(&input, ArrayEncoding::Bracketed).unwrap();
        for _ in 0..10 {
            assert_eq!(
                build_query_string(&input, ArrayEncoding::Bracketed).unwrap(),
                first
            );
        }
    }

    #[test]
    fn test_decoding_recovers_pairs() {
        let input = params(json!({
            "symbol": "BTC/USDT",
            "memo": "hello world",
            "qty": 12,
            "reduceOnly": false,
        }));
        let query = build_query_string(&input, ArrayEncoding::Bracketed).unwrap();

        let decoded: Vec<(String, String)> = query
            .split('&')
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap();
                let value = percent_encoding::percent_decode_str(v).decode_utf8().unwrap();
                (k.to_string(), value.into_owned())
            })
            .collect();

        assert_eq!(
            decoded,
            vec![
                ("symbol".to_string(), "BTC/USDT".to_string()),
                ("memo".to_string(), "hello world".to_string()),
                ("qty".to_string(), "12".to_string()),
                ("reduceOnly".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_uri_component_marks_stay_unescaped() {
        let input = params(json!({"memo": "a(b)!*'c", "tag": "x~y-z_w.v"}));
        assert_eq!(
            build_query_string(&input, ArrayEncoding::Bracketed).unwrap(),
            "memo=a(b)!*'c&tag=x~y-z_w.v"
        );
        assert_eq!(
            build_query_string(&input, ArrayEncoding::Repeated).unwrap(),
            "memo=a(b)!*'c&tag=x~y-z_w.v"
        );
    }

    #[test]
    fn test_null_array_element_joins_as_empty() {
        let input = params(json!({"asset": ["A", null]}));
        assert_eq!(
            build_query_string(&input, ArrayEncoding::Bracketed).unwrap(),
            "asset=%5B%22A%22%2C%22%22%5D"
        );

        let scalar = params(json!({"asset": null}));
        assert_eq!(
            build_query_string(&scalar, ArrayEncoding::Bracketed).unwrap(),
            "asset=null"
        );
    }

    #[test]
    fn test_nested_values_are_rejected() {
        let nested = params(json!({"filter": {"asset": "BTC"}}));
        assert!(matches!(
            build_query_string(&nested, ArrayEncoding::Bracketed),
            Err(ExchangeError::InvalidParameters(_))
        ));

        let nested_array = params(json!({"assets": [["BTC"]]}));
        assert!(matches!(
            build_query_string(&nested_array, ArrayEncoding::Repeated),
            Err(ExchangeError::InvalidParameters(_))
        ));
    }
}

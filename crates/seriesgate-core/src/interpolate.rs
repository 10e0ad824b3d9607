//! Template variable substitution.
//!
//! Replaces `${name}` and `$name` with the value bound to `name` in the
//! query's `templateVariables`. Names that have no binding are left in place,
//! so a surviving `$` marks a dashboard variable with no selected value.

use indexmap::IndexMap;
use serde_json::Value;

use crate::model::Query;

/// Marker that introduces a template variable reference.
pub const VARIABLE_MARKER: char = '$';

/// Substitutes every bound variable into `input`.
///
/// A bare `$name` reference extends over the longest run of identifier
/// characters, so `$assetRid` only ever resolves through a binding named
/// `assetRid`. Substituted values are not scanned again.
pub fn interpolate(input: &str, variables: &IndexMap<String, Value>) -> String {
    if variables.is_empty() || !input.contains(VARIABLE_MARKER) {
        return input.to_string();
    }

    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(at) = rest.find(VARIABLE_MARKER) {
        output.push_str(&rest[..at]);
        let after = &rest[at + 1..];

        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !is_identifier_char(c))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };

        let reference = &rest[at..at + 1 + consumed];
        match variables.get(name).filter(|_| !name.is_empty()) {
            Some(value) => output.push_str(&stringify(value)),
            None => output.push_str(reference),
        }
        rest = &rest[at + 1 + consumed..];
    }
    output.push_str(rest);
    output
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Textual form of a variable value. Strings are used verbatim; every other
/// JSON value uses its JSON rendering.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether `value` still holds a variable marker.
pub fn has_unresolved_marker(value: &str) -> bool {
    value.contains(VARIABLE_MARKER)
}

/// Interpolates the string fields of a query in place.
pub fn apply_template_variables(query: &mut Query) {
    if query.template_variables.is_empty() {
        return;
    }
    let vars = &query.template_variables;
    query.asset_rid = interpolate(&query.asset_rid, vars);
    query.channel = interpolate(&query.channel, vars);
    query.data_scope_name = query
        .data_scope_name
        .as_deref()
        .map(|scope| interpolate(scope, vars));
    query.query_text = interpolate(&query.query_text, vars);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn replaces_braced_and_bare_forms() {
        let v = vars(&[("asset", json!("ri.asset.7"))]);
        assert_eq!(interpolate("${asset}", &v), "ri.asset.7");
        assert_eq!(interpolate("$asset/x", &v), "ri.asset.7/x");
        assert_eq!(interpolate("a-${asset}-$asset", &v), "a-ri.asset.7-ri.asset.7");
    }

    #[test]
    fn longer_names_take_precedence() {
        let v = vars(&[("asset", json!("short")), ("assetRid", json!("long"))]);
        assert_eq!(interpolate("$assetRid", &v), "long");
        assert_eq!(interpolate("$asset", &v), "short");
    }

    #[test]
    fn bare_reference_does_not_match_a_name_prefix() {
        let v = vars(&[("asset", json!("ri.a"))]);
        assert_eq!(interpolate("$assetRid", &v), "$assetRid");
        assert_eq!(interpolate("$asset_2", &v), "$asset_2");
        assert_eq!(interpolate("$asset.child", &v), "ri.a.child");
        assert_eq!(interpolate("${asset}Rid", &v), "ri.aRid");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let v = vars(&[("a", json!("$b")), ("b", json!("x"))]);
        assert_eq!(interpolate("$a", &v), "$b");
    }

    #[test]
    fn lone_or_unterminated_markers_are_kept() {
        let v = vars(&[("a", json!("x"))]);
        assert_eq!(interpolate("cost $ 5", &v), "cost $ 5");
        assert_eq!(interpolate("${a", &v), "${a");
        assert_eq!(interpolate("$$a", &v), "$x");
    }

    #[test]
    fn non_string_values_are_stringified() {
        let v = vars(&[("n", json!(42)), ("b", json!(true)), ("f", json!(1.5))]);
        assert_eq!(interpolate("$n-$b-${f}", &v), "42-true-1.5");
    }

    #[test]
    fn empty_map_returns_input() {
        assert_eq!(interpolate("$asset", &IndexMap::new()), "$asset");
    }

    #[test]
    fn unknown_name_keeps_marker() {
        let v = vars(&[("site", json!("north"))]);
        let out = interpolate("${asset}", &v);
        assert_eq!(out, "${asset}");
        assert!(has_unresolved_marker(&out));
    }

    #[test]
    fn applies_to_every_string_field() {
        let mut query = Query {
            ref_id: "A".to_string(),
            type_marker: None,
            asset_rid: "$asset".to_string(),
            channel: "${chan}".to_string(),
            data_scope_name: Some("$scope".to_string()),
            bucket_count: 10,
            time_shift_seconds: 0,
            query_text: "text $chan".to_string(),
            constant: None,
            template_variables: vars(&[
                ("asset", json!("ri.a")),
                ("chan", json!("speed")),
                ("scope", json!("vehicle")),
            ]),
            time_range: crate::model::TimeRange {
                from: chrono::DateTime::from_timestamp(0, 0).unwrap(),
                to: chrono::DateTime::from_timestamp(60, 0).unwrap(),
            },
        };
        apply_template_variables(&mut query);
        assert_eq!(query.asset_rid, "ri.a");
        assert_eq!(query.channel, "speed");
        assert_eq!(query.data_scope_name.as_deref(), Some("vehicle"));
        assert_eq!(query.query_text, "text speed");
    }

    proptest! {
        #[test]
        fn resolved_text_is_a_fixed_point(
            text in "[a-z0-9 ._/-]{0,40}",
            name in "[a-z]{1,8}",
            value in "[a-z0-9.]{0,12}",
        ) {
            let v = vars(&[(name.as_str(), json!(value))]);
            let template = format!("{}${{{}}}", text, name);
            let once = interpolate(&template, &v);
            let twice = interpolate(&once, &v);
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(interpolate(&text, &v), text);
        }
    }
}

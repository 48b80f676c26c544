/**
 * Template Pattern Tests
 *
 * Scanner-level behavior: which pieces of source are markup and how tag
 * names, attributes and variable references are split up.
 */

#[cfg(test)]
mod tests {
    use vtemplate::expression::{Accessor, ScopePrefix};
    use vtemplate::ml_parser::patterns::{
        parse_attributes, parse_variable, MatchKind, Patterns, DEFAULT_PATTERNS,
    };

    fn kinds(text: &str) -> Vec<(usize, String)> {
        DEFAULT_PATTERNS
            .matches(text)
            .map(|m| {
                let label = match m.kind {
                    MatchKind::Escape => "escape".to_string(),
                    MatchKind::OpenTag { name, closed, .. } => {
                        format!("open:{}{}", name, if closed { "/" } else { "" })
                    }
                    MatchKind::CloseTag { name } => format!("close:{}", name),
                    MatchKind::Variable { variable, .. } => format!("var:{}", variable.name),
                };
                (m.offset, label)
            })
            .collect()
    }

    #[test]
    fn should_find_all_markup_in_order() {
        assert_eq!(
            kinds(r#"a $x <vt:if var="$y">$$</vt:if><vt:set var="a" value="b"/>"#),
            vec![
                (2, "var:x".to_string()),
                (5, "open:if".to_string()),
                (21, "escape".to_string()),
                (23, "close:if".to_string()),
                (31, "open:set/".to_string()),
            ]
        );
    }

    #[test]
    fn should_lowercase_tag_names() {
        assert_eq!(
            kinds("<vt:ForEach></vt:FOREACH>"),
            vec![(0, "open:foreach".to_string()), (12, "close:foreach".to_string())]
        );
    }

    #[test]
    fn should_ignore_invalid_references() {
        assert!(kinds("price: $5 or $ or $.x").is_empty());
        assert!(kinds("<div>plain markup</div>").is_empty());
    }

    #[test]
    fn should_match_braced_variables_with_attributes() {
        let found: Vec<_> = DEFAULT_PATTERNS
            .matches(r#"{$user.name case="upper" default='n/a'}"#)
            .collect();
        assert_eq!(found.len(), 1);
        match &found[0].kind {
            MatchKind::Variable {
                variable,
                attributes,
            } => {
                assert_eq!(variable.name, "user");
                assert_eq!(variable.accessors.to_vec(), vec![Accessor::field("name")]);
                let pairs: Vec<_> = attributes
                    .iter()
                    .map(|a| (a.name.as_str(), a.value.as_str()))
                    .collect();
                assert_eq!(pairs, vec![("case", "upper"), ("default", "n/a")]);
            }
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn should_parse_attribute_lists() {
        let attrs = parse_attributes(r#" var="x"  Field = 'Now' type="$clock""#);
        let pairs: Vec<_> = attrs
            .iter()
            .map(|a| (a.name.as_str(), a.value.as_str()))
            .collect();
        assert_eq!(pairs, vec![("var", "x"), ("field", "Now"), ("type", "$clock")]);
    }

    #[test]
    fn should_parse_variable_prefixes_and_chains() {
        let named = parse_variable("#page.user.name.upper()").unwrap();
        assert_eq!(named.prefix, Some(ScopePrefix::Named("page".to_string())));
        assert_eq!(named.name, "user");
        assert_eq!(
            named.accessors.to_vec(),
            vec![Accessor::field("name"), Accessor::method("upper")]
        );

        let ancestor = parse_variable("##.title").unwrap();
        assert_eq!(ancestor.prefix, Some(ScopePrefix::Ancestor(2)));
        assert_eq!(ancestor.name, "title");

        assert!(parse_variable("9lives").is_none());
        assert!(parse_variable("a b").is_none());
    }

    #[test]
    fn should_support_custom_prefixes() {
        let patterns = Patterns::new("tpl").unwrap();
        let found: Vec<_> = patterns.matches("<vt:if><tpl:if>").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].offset, 7);
    }
}

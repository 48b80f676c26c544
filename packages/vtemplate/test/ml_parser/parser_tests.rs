/**
 * Template Parser Tests
 *
 * Tree shapes produced by the parser and the errors it reports for
 * malformed input.
 */

#[path = "../util/mod.rs"]
mod utils;

#[cfg(test)]
mod tests {
    use super::utils::{humanize, parse};
    use vtemplate::tags::{ForEachTag, TagKind};
    use vtemplate::{ParseError, ParseErrorKind, Parser, ScopeId, TagFactory, TemplateConfig};

    fn nested_templates(depth: usize) -> String {
        format!(
            "{}x{}",
            "<vt:template>".repeat(depth),
            "</vt:template>".repeat(depth)
        )
    }

    fn parse_err(source: &str) -> ParseError {
        match vtemplate::parse(source) {
            Ok(_) => panic!("expected {:?} to fail", source),
            Err(err) => err,
        }
    }

    #[test]
    fn should_parse_text_and_placeholders() {
        let template = parse("Hello $name!");
        assert_eq!(humanize(&template), vec!["text:Hello ", "0:variable", "text:!"]);
    }

    #[test]
    fn should_nest_children_under_tags() {
        let template = parse(
            r#"<vt:foreach from="$rows" item="row"><vt:if var="$row">[$row]</vt:if></vt:foreach>"#,
        );
        assert_eq!(
            humanize(&template),
            vec!["0:foreach", "1:if", "text:[", "2:variable", "text:]"]
        );
        assert_eq!(template.tag_depth(), 3);
    }

    #[test]
    fn should_merge_escapes_into_surrounding_text() {
        let template = parse("a$$b$$");
        assert_eq!(humanize(&template), vec!["text:a$b$"]);
    }

    #[test]
    fn should_keep_self_closed_tags_childless() {
        let template = parse(r#"<vt:set var="a" value="1"/>after"#);
        assert_eq!(humanize(&template), vec!["0:set", "text:after"]);
    }

    #[test]
    fn should_treat_single_tags_as_closed() {
        // `set` never takes children, so the text after it is a sibling.
        let template = parse(r#"<vt:set var="a" value="1">after"#);
        assert_eq!(humanize(&template), vec!["0:set", "text:after"]);
    }

    #[test]
    fn should_register_variables_in_their_scope() {
        let template = parse(
            r#"$title<vt:template name="row">$cell $#.title $#row.cell</vt:template>"#,
        );
        let row = template.scope_by_name("row").unwrap();
        assert_eq!(template.variable_names(ScopeId::ROOT), vec!["title"]);
        assert_eq!(template.variable_names(row), vec!["cell"]);
    }

    #[test]
    fn should_report_unclosed_tag() {
        let err = parse_err(r#"<vt:if var="$x">never closed"#);
        assert_eq!(err.kind, ParseErrorKind::UnclosedTag("if".to_string()));
        assert_eq!(err.line(), Some(1));
        assert_eq!(err.column(), Some(1));
    }

    #[test]
    fn should_report_innermost_unclosed_tag() {
        let err = parse_err("<vt:template>\n<vt:template name=\"inner\">");
        assert_eq!(err.kind, ParseErrorKind::UnclosedTag("template".to_string()));
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn should_report_unknown_tag() {
        let err = parse_err("text <vt:bogus/>");
        assert_eq!(err.kind, ParseErrorKind::UnknownTag("bogus".to_string()));
        assert_eq!(err.column(), Some(6));
        assert_eq!(
            err.to_string(),
            r#"error parsing "<vt:bogus/>" at line 1, column 6: unknown tag "bogus""#
        );
    }

    #[test]
    fn should_report_missing_attributes() {
        let err = parse_err(r#"<vt:property var="r" type="$clock"/>"#);
        assert_eq!(
            err.kind,
            ParseErrorKind::MissingAttribute {
                tag: "property".to_string(),
                attribute: "field".to_string(),
            }
        );
        let err = parse_err("<vt:foreach item=\"x\"></vt:foreach>");
        assert_eq!(
            err.kind,
            ParseErrorKind::MissingAttribute {
                tag: "foreach".to_string(),
                attribute: "from".to_string(),
            }
        );
    }

    #[test]
    fn should_report_unmatched_close_tags() {
        let err = parse_err("</vt:if>");
        assert_eq!(
            err.kind,
            ParseErrorKind::UnmatchedTag {
                expected: None,
                found: "if".to_string(),
            }
        );
        let err = parse_err(r#"<vt:template><vt:if var="$a"></vt:template></vt:if>"#);
        assert_eq!(
            err.kind,
            ParseErrorKind::UnmatchedTag {
                expected: Some("if".to_string()),
                found: "template".to_string(),
            }
        );
    }

    #[test]
    fn should_report_unknown_template_references() {
        let err = parse_err("$#nope.x");
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownTemplateReference("#nope".to_string())
        );
        let err = parse_err("<vt:template>$##.x</vt:template>");
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownTemplateReference("##".to_string())
        );
    }

    #[test]
    fn should_report_invalid_attribute_values() {
        let err = parse_err(r#"{$x length="many"}"#);
        assert_eq!(
            err.kind,
            ParseErrorKind::InvalidAttribute {
                tag: "variable".to_string(),
                attribute: "length".to_string(),
                value: "many".to_string(),
            }
        );
    }

    #[test]
    fn should_accept_registered_aliases() {
        let mut factory = TagFactory::default();
        factory.register("each", || TagKind::ForEach(ForEachTag::default()));
        let parser = Parser::new().with_factory(factory);
        let template = parser
            .parse(r#"<vt:each from="$rows" item="r">$r</vt:each>"#)
            .unwrap();
        assert_eq!(humanize(&template), vec!["0:foreach", "1:variable"]);
    }

    #[test]
    fn should_load_config_from_json() {
        let config = TemplateConfig::from_json(r#"{"tag_prefix": "x", "max_depth": 2}"#).unwrap();
        assert!(config.decode_entities);
        let parser = Parser::with_config(config).unwrap();
        assert!(parser.parse("<x:template><x:template/></x:template>").is_ok());
        assert!(parser
            .parse("<x:template><x:template><x:template/></x:template></x:template>")
            .is_err());
    }

    #[test]
    fn should_bound_nesting_by_default() {
        let err = parse_err(&nested_templates(20_000));
        assert!(matches!(err.kind, ParseErrorKind::ParseFailure(_)));

        let limit = vtemplate::config::DEFAULT_MAX_DEPTH;
        assert_eq!(parse(&nested_templates(limit)).tag_depth(), limit);
        assert!(vtemplate::parse(&nested_templates(limit + 1)).is_err());
    }

    #[test]
    fn should_parse_deep_nesting_without_a_limit() {
        let mut config = TemplateConfig::default();
        config.max_depth = None;
        let parser = Parser::with_config(config).unwrap();
        let template = parser.parse(&nested_templates(20_000)).unwrap();
        assert_eq!(template.tag_depth(), 20_000);
        assert_eq!(template.scopes().count(), 20_001);
    }

    #[test]
    fn should_report_blank_variable_names_as_missing() {
        for (source, tag, attribute) in [
            (r#"<vt:set var="" value="x"/>"#, "set", "var"),
            (r#"<vt:set var="  " value="x"/>"#, "set", "var"),
            (r#"<vt:property var="" field="Now" type="$clock"></vt:property>"#, "property", "var"),
            (r#"<vt:foreach from="$rows" item=""></vt:foreach>"#, "foreach", "item"),
        ] {
            assert_eq!(
                parse_err(source).kind,
                ParseErrorKind::MissingAttribute {
                    tag: tag.to_string(),
                    attribute: attribute.to_string(),
                },
                "{}",
                source
            );
        }
        let template = parse(r#"<vt:foreach from="$rows" item="r" index=" ">$r</vt:foreach>"#);
        assert_eq!(template.variable_names(ScopeId::ROOT), vec!["rows", "r"]);
    }
}

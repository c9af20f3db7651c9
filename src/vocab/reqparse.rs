use crate::prelude::*;

// The standardized dependency-string grammar: `name[extras] constraint ;
// marker` or `name[extras] @ url ; marker`. The constraint text is captured
// as a substring and handed to the version-set parser, so there's exactly
// one place that knows operator semantics.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseExtra {
    Allowed,
    NotAllowed,
}

/// The syntactic pieces of a dependency string, before they're interpreted
/// into a Dependency.
#[derive(Debug, Clone)]
pub struct ParsedRequirement {
    pub name: PackageName,
    pub extras: Vec<Extra>,
    pub constraint: Option<VersionConstraint>,
    pub url: Option<String>,
    pub marker: Option<Marker>,
}

pub fn requirement(input: &str, parse_extra: ParseExtra) -> Result<ParsedRequirement> {
    parser::requirement(input, parse_extra)
        .with_context(|| format!("failed to parse requirement string {:?}", input))
}

pub fn marker(input: &str, parse_extra: ParseExtra) -> Result<Marker> {
    parser::marker_only(input, parse_extra)
        .with_context(|| format!("failed to parse marker {:?}", input))
}

peg::parser! {
    grammar parser() for str {
        rule wsp()
            = quiet!{ [' ' | '\t' ] }

        rule letter_or_digit()
            = quiet!{['A'..='Z' | 'a'..='z' | '0'..='9']} / expected!("letter or digit")

        rule _()
            = quiet!{ wsp()* }

        rule version_cmp() -> &'input str
            = $("===" / "==" / "<=" / ">=" / "!=" / "~=" / "<" / ">")

        rule constraint_str() -> &'input str
            = $(quiet!{['A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '*' | '+' | '!'
                 | '=' | '<' | '>' | '~' | '^' | ',' | '|' | ' ' | '\t' | '-' | '_']+})
              / expected!("version constraint")

        rule versionspec() -> VersionConstraint
            = ("(" _ s:constraint_str() _ ")" {? (&*s).try_into().or(Err("version constraint")) })
            / (s:constraint_str() {? (&*s).try_into().or(Err("version constraint")) })

        rule urlspec() -> &'input str
            = "@" _ u:$([^ ' ' | '\t' | ';']+) { u }

        rule not_in() -> &'static str
            = "not" wsp()+ "in" { "not in" }

        rule marker_op() -> MarkerOp
            = _ op:(version_cmp() / $("in") / not_in())
            {?
                Ok(match op {
                    "in" => MarkerOp::In,
                    "not in" => MarkerOp::NotIn,
                    other => MarkerOp::Compare(
                        other.try_into().or(Err("comparison operator"))?,
                    ),
                })
            }

        rule python_str_c() -> &'input str
            = $(quiet! { [' ' | '\t' | 'A'..='Z' | 'a'..='z' | '0'..='9' | '(' | ')'
                 | '.' | '{' | '}' | '-' | '_' | '*' | '#' | ':' | ';' | ','
                 | '/' | '?' | '[' | ']' | '!' | '~' | '`' | '@' | '$' | '%'
                 | '^' | '&' | '=' | '+' | '|' | '<' | '>'] })
              / expected!("printable character")

        // Backslash escapes inside quoted strings are optional per the
        // grammar standard, so we skip them.
        rule python_squote_str() -> &'input str
            = "'" s:$((python_str_c() / "\"")*) "'" { s }

        rule python_dquote_str() -> &'input str
            = "\"" s:$((python_str_c() / "'")*) "\"" { s }

        rule python_str() -> MarkerValue
            = s:(python_squote_str() / python_dquote_str())
              { MarkerValue::Literal(s.into()) }

        rule env_var(parse_extra: ParseExtra) -> MarkerValue
            = var:$(
                "python_version" / "python_full_version" / "os_name"
                / "sys_platform" / "platform_release" / "platform_system"
                / "platform_version" / "platform_machine"
                / "platform_python_implementation" / "implementation_name"
                / "implementation_version" / "extra"
              )
              {?
               if ParseExtra::NotAllowed == parse_extra && var == "extra" {
                   return Err("'extra' marker is not valid in this context")
               }
               Ok(MarkerValue::Variable(var.to_owned()))
              }

        rule marker_var(parse_extra: ParseExtra) -> MarkerValue
            = _ v:(env_var(parse_extra) / python_str()) { v }

        rule marker_expr(parse_extra: ParseExtra) -> Marker
            = _ "(" m:marker(parse_extra) _ ")" { m }
              / lhs:marker_var(parse_extra) op:marker_op() rhs:marker_var(parse_extra)
                { Marker::atom(lhs, op, rhs) }

        rule marker_and(parse_extra: ParseExtra) -> Marker
            = parts:(marker_expr(parse_extra) ++ (_ "and")) { Marker::and(parts) }

        rule marker_or(parse_extra: ParseExtra) -> Marker
            = parts:(marker_and(parse_extra) ++ (_ "or")) { Marker::or(parts) }

        rule marker(parse_extra: ParseExtra) -> Marker
            = marker_or(parse_extra)

        pub rule marker_only(parse_extra: ParseExtra) -> Marker
            = m:marker(parse_extra) _ { m }

        rule quoted_marker(parse_extra: ParseExtra) -> Marker
            = ";" _ m:marker(parse_extra) { m }

        rule identifier() -> &'input str
            = $(letter_or_digit() (letter_or_digit() / "-" / "_" / ".")*)

        rule name() -> PackageName
            = n:identifier() {? n.try_into().or(Err("package name")) }

        rule extra() -> Extra
            = e:identifier() {? e.try_into().or(Err("extras name")) }

        rule extras() -> Vec<Extra>
            = "[" _ es:(extra() ** (_ "," _)) _ "]" { es }

        rule name_req(parse_extra: ParseExtra) -> ParsedRequirement
            = name:name()
              _ extras:(extras() / "" { Vec::new() })
              _ constraint:(versionspec()?)
              _ marker:(quoted_marker(parse_extra)?)
              {
                  ParsedRequirement {
                      name,
                      extras,
                      constraint,
                      url: None,
                      marker,
                  }
              }

        rule url_req(parse_extra: ParseExtra) -> ParsedRequirement
            = name:name()
              _ extras:(extras() / "" { Vec::new() })
              _ url:urlspec()
              _ marker:(quoted_marker(parse_extra)?)
              {
                  ParsedRequirement {
                      name,
                      extras,
                      constraint: None,
                      url: Some(url.to_owned()),
                      marker,
                  }
              }

        pub rule requirement(parse_extra: ParseExtra) -> ParsedRequirement
            = _ r:( url_req(parse_extra) / name_req(parse_extra) ) _ { r }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plain_requirement() {
        let r = requirement("requests", ParseExtra::Allowed).unwrap();
        assert_eq!(r.name.normalized(), "requests");
        assert!(r.extras.is_empty());
        assert!(r.constraint.is_none());
        assert!(r.marker.is_none());
    }

    #[test]
    fn test_full_requirement() {
        let r = requirement(
            "twisted[tls] >= 20, != 20.1.* ; python_version >= '3'",
            ParseExtra::Allowed,
        )
        .unwrap();
        assert_eq!(r.name.normalized(), "twisted");
        assert_eq!(r.extras.len(), 1);
        assert_eq!(r.extras[0].normalized(), "tls");
        let constraint = r.constraint.unwrap();
        assert!(constraint.contains(&"20.3".try_into().unwrap()));
        assert!(!constraint.contains(&"20.1.5".try_into().unwrap()));
        assert!(r.marker.is_some());
    }

    #[test]
    fn test_parenthesized_constraint() {
        let r = requirement("requests (>=2.13,<3.0)", ParseExtra::Allowed).unwrap();
        let constraint = r.constraint.unwrap();
        assert_eq!(constraint.to_string(), ">=2.13,<3.0");
    }

    #[test]
    fn test_url_requirement() {
        let r = requirement(
            "pip @ https://github.com/pypa/pip/archive/1.3.1.zip ; python_version >= '3.6'",
            ParseExtra::Allowed,
        )
        .unwrap();
        assert_eq!(r.name.normalized(), "pip");
        assert_eq!(
            r.url.as_deref(),
            Some("https://github.com/pypa/pip/archive/1.3.1.zip")
        );
        assert!(r.constraint.is_none());
        assert!(r.marker.is_some());
    }

    #[test]
    fn test_extra_marker_gate() {
        let input = "foo ; extra == 'tls'";
        assert!(requirement(input, ParseExtra::Allowed).is_ok());
        assert!(requirement(input, ParseExtra::NotAllowed).is_err());
    }

    #[test]
    fn test_chained_marker() {
        let m = marker(
            "python_version >= '3.8' and sys_platform == 'linux' and os_name == 'posix'",
            ParseExtra::NotAllowed,
        )
        .unwrap();
        match m {
            Marker::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected a conjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_marker_precedence() {
        let m = marker(
            "python_version >= '3.8' and (sys_platform == 'linux' or sys_platform == 'darwin')",
            ParseExtra::NotAllowed,
        )
        .unwrap();
        match m {
            Marker::And(children) => {
                assert!(matches!(children[1], Marker::Or(_)));
            }
            other => panic!("expected a conjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(requirement("", ParseExtra::Allowed).is_err());
        assert!(requirement("foo >=", ParseExtra::Allowed).is_err());
        assert!(requirement("foo; bogus_attr == 'x'", ParseExtra::Allowed).is_err());
        assert!(requirement("-foo", ParseExtra::Allowed).is_err());
    }
}

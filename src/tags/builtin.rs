//! The built-in tag set

use super::definition::{AttributeForm, ElementKind, TagDefinition};

/// Tag body on one line; quoted runs may contain the close delimiter
const BODY: &str = r#"(?:"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|[^\n])*?"#;

/// Directive arguments; quoted runs may contain parentheses
const ARGS: &str = r#"(?:"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|[^()\n])*"#;

/// Built-in tags in registration order
pub fn default_tags() -> Vec<TagDefinition> {
    let mut tags = vec![
        TagDefinition::new(
            "var",
            format!(r"{{open}}\$[A-Za-z_][\w.]*(?:[ \t]{BODY})?{{close}}"),
            ElementKind::Variable,
        )
        .with_lead("$")
        .with_form(AttributeForm::Name)
        .with_any_attributes(),
        TagDefinition::new("loop_var", r"{open}@[A-Za-z_]\w*{close}", ElementKind::Variable)
            .with_form(AttributeForm::Name)
            .with_attributes(Vec::<String>::new()),
        TagDefinition::new("expr", format!("{{open}}={BODY}{{close}}"), ElementKind::Expression)
            .with_lead("=")
            .with_form(AttributeForm::Expression),
        TagDefinition::new("let", format!(r"{{open}}#let[ \t]{BODY}{{close}}"), ElementKind::Let)
            .with_lead("#let")
            .with_any_attributes(),
    ];

    let blocks: [(&str, ElementKind, &[&str]); 4] = [
        (
            "if",
            ElementKind::If,
            &["var", "equals", "not_equals", "gt", "lt", "gte", "lte"],
        ),
        (
            "while",
            ElementKind::While,
            &["var", "equals", "not_equals", "gt", "lt", "gte", "lte"],
        ),
        ("each", ElementKind::Each, &["items", "glue"]),
        ("until", ElementKind::Until, &["validator", "attempts"]),
    ];
    for (name, kind, keys) in blocks {
        tags.push(
            TagDefinition::new(name, format!(r"{{open}}#{name}[ \t]{BODY}{{close}}"), kind)
                .with_closing(format!("{{open}}/{}{{close}}", name))
                .with_lead(format!("#{}", name))
                .with_attributes(keys.iter().copied()),
        );
    }

    tags.push(
        TagDefinition::new("await", format!(r"{{open}}#await(?:[ \t]{BODY})?{{close}}"), ElementKind::Await)
            .with_closing("{open}/await{close}")
            .with_lead("#await")
            .with_attributes(["event"]),
    );
    tags.push(
        TagDefinition::new("comment", r"{open}#comment{close}", ElementKind::Comment)
            .with_closing("{open}/comment{close}")
            .with_lead("#comment")
            .with_attributes(Vec::<String>::new())
            .with_raw_body(),
    );

    tags.extend([
        directive("template", ElementKind::Template).with_attributes(["name"]),
        directive("section", ElementKind::Section)
            .with_closing("@endsection")
            .with_attributes(["name"]),
        directive("output", ElementKind::Output).with_attributes(["name"]),
        directive("include", ElementKind::Include)
            .with_form(AttributeForm::Name)
            .with_any_attributes(),
        directive("import", ElementKind::Import)
            .with_form(AttributeForm::Name)
            .with_any_attributes(),
        directive("macro", ElementKind::Macro)
            .with_closing("@endmacro")
            .with_form(AttributeForm::Name)
            .with_any_attributes()
            .with_raw_body(),
        directive("invoke", ElementKind::Invoke)
            .with_form(AttributeForm::Name)
            .with_any_attributes(),
    ]);

    tags
}

/// `@name(...)` directive that never uses the delimiters
fn directive(name: &str, kind: ElementKind) -> TagDefinition {
    TagDefinition::new(name, format!(r"@{name}\({ARGS}\)"), kind).with_lead(format!("@{}", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{Delimiters, TagRegistry};

    #[test]
    fn test_every_sample_routes_to_its_tag() {
        let registry = TagRegistry::with_defaults();
        let compiled = registry
            .unified_pattern(&Delimiters::default())
            .expect("Should compile");

        let samples = [
            ("{$name}", "var"),
            ("{$user.name default=\"x\"}", "var"),
            ("{@index}", "loop_var"),
            ("{=upper(name)}", "expr"),
            ("{#let a=1}", "let"),
            ("{#if var=x}", "if"),
            ("{#while var=x lt=3}", "while"),
            ("{#each items=[a]}", "each"),
            ("{#until validator=email}", "until"),
            ("{#await ready}", "await"),
            ("{#await}", "await"),
            ("{#comment}", "comment"),
            ("@template(layout)", "template"),
            ("@section(main)", "section"),
            ("@output(main)", "output"),
            ("@include(header.tpl)", "include"),
            ("@import(helpers)", "import"),
            ("@macro(greet)", "macro"),
            ("@invoke(greet name=World)", "invoke"),
            ("{#let s=\"a}b\"}", "let"),
            ("{=concat('{', \"}\")}", "expr"),
            ("@invoke(greet name=\"a (b)\")", "invoke"),
        ];

        for (sample, tag) in samples {
            let found = compiled
                .find_at(sample, 0)
                .unwrap_or_else(|| panic!("no match for {}", sample));
            assert_eq!(found.tag, tag, "sample {}", sample);
            assert_eq!(found.range, 0..sample.len(), "sample {}", sample);
        }
    }

    #[test]
    fn test_closers_are_not_openers() {
        let registry = TagRegistry::with_defaults();
        let compiled = registry.unified_pattern(&Delimiters::default()).unwrap();
        for closer in ["{/if}", "{/each}", "@endsection", "@endmacro"] {
            assert!(compiled.find_at(closer, 0).is_none(), "{}", closer);
        }
    }

    #[test]
    fn test_block_tags_have_matchers() {
        let registry = TagRegistry::with_defaults();
        let compiled = registry.unified_pattern(&Delimiters::default()).unwrap();
        let matcher = compiled.matcher("each").expect("each is registered");
        assert!(matcher.closer.as_ref().unwrap().is_match("{/each}"));
        assert!(compiled.matcher("var").unwrap().closer.is_none());
    }

    #[test]
    fn test_unbalanced_quote_stops_at_first_close() {
        let registry = TagRegistry::with_defaults();
        let compiled = registry.unified_pattern(&Delimiters::default()).unwrap();
        let sample = r#"{#if var=s equals="ok}yes{/if}"#;
        let found = compiled.find_at(sample, 0).expect("Should match");
        assert_eq!(found.tag, "if");
        assert_eq!(&sample[found.range], r#"{#if var=s equals="ok}"#);
    }
}

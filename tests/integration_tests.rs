//! Integration tests for rendering with the built-in tags

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tagsmith::{
    render, CollectingSink, EventKind, ParseError, Registry, RenderConfig, RenderError, Scope,
    Template, Value,
};

fn render_vars(source: &str, variables: Scope) -> String {
    let registry = Registry::with_defaults();
    let mut template = Template::new(&registry, RenderConfig::default()).with_variables(variables);
    template.render(source).expect("Should render")
}

#[test]
fn test_text_without_tags_is_unchanged() {
    let input = "Dear reader,\n\n  nothing {here} is a tag: @ mail, $5, #1.\n";
    assert_eq!(render(input).unwrap(), input);
}

#[test]
fn test_if_equals() {
    let vars: Scope = [("status", "ok")].into_iter().collect();
    let out = render_vars(
        r#"{#if var=status equals="ok"}yes{/if}{#if var=status equals="no"}no{/if}"#,
        vars,
    );
    assert_eq!(out, "yes");
}

#[test]
fn test_if_truthiness_and_numeric_comparison() {
    let vars: Scope = [("count", Value::from(12)), ("empty", Value::from(""))]
        .into_iter()
        .collect();
    let out = render_vars(
        "{#if var=count gt=9}big{/if}{#if var=empty}never{/if}{#if var=count}set{/if}",
        vars,
    );
    assert_eq!(out, "bigset");
}

#[test]
fn test_while_counter() {
    let out = render("{#let i=0}{#while var=i lt=3}{$i}{=add(i,1) -> i}{/while}").unwrap();
    assert_eq!(out, "012");
}

#[test]
fn test_while_stops_at_iteration_limit() {
    let registry = Registry::with_defaults();
    let sink = Arc::new(CollectingSink::new());
    let config = RenderConfig::new().with_max_loop_iterations(5);
    let mut template = Template::new(&registry, config).with_sink(sink.clone());

    let out = template.render("{#let go=true}{#while var=go}x{/while}").unwrap();
    assert_eq!(out, "xxxxx");
    assert!(sink
        .of_kind(EventKind::Error)
        .iter()
        .any(|e| e.tag == "while" && e.detail.contains("iteration limit")));
}

#[test]
fn test_each_over_variable_list() {
    let vars: Scope = [("names", Value::from(vec!["Ada", "Grace"]))].into_iter().collect();
    let out = render_vars(r#"{#each items=$names glue=" & "}{@current}{/each}"#, vars);
    assert_eq!(out, "Ada & Grace");
}

#[test]
fn test_each_over_table_binds_key() {
    let vars = Scope::from_toml_str("[user]\nname = \"Ada\"\nrole = \"admin\"\n").unwrap();
    let out = render_vars(r#"{#each items=user glue=";"}{@key}={@current}{/each}"#, vars);
    assert_eq!(out, "name=Ada;role=admin");
}

#[test]
fn test_nested_each_sees_outer_bindings() {
    let out = render(
        r#"{#let sep="-"}{#each items=[a,b]}{#each items=[1,2]}{@current}{$sep}{/each}{/each}"#,
    )
    .unwrap();
    assert_eq!(out, "1-2-1-2-");
}

#[test]
fn test_dotted_variable_path() {
    let vars = Scope::from_toml_str("[user]\nname = \"Ada\"\n").unwrap();
    assert_eq!(render_vars("Hi {$user.name}", vars), "Hi Ada");
}

#[test]
fn test_variable_default_and_generator() {
    assert_eq!(render(r#"[{$missing default="n/a"}]"#).unwrap(), "[n/a]");
    assert_eq!(
        render("{$missing generator=lorem words=3}").unwrap(),
        "lorem ipsum dolor"
    );
    assert_eq!(render("{$title generator=placeholder}").unwrap(), "[title]");
}

#[test]
fn test_let_copies_and_coerces() {
    let out = render(r#"{#let a="42" type=number}{#let b=$a}{=add(b, 1)}"#).unwrap();
    assert_eq!(out, "43");
}

#[test]
fn test_let_inside_block_stays_local() {
    let out = render(r#"{#let go=true}{#if var=go}{#let inner=x}({$inner}){/if}[{$inner}]"#).unwrap();
    assert_eq!(out, "(x)[]");
}

#[test]
fn test_macro_invoke() {
    let out = render("@macro(greet)Hello {$name}!@endmacro @invoke(greet name=World)").unwrap();
    assert!(out.contains("Hello World!"));
}

#[test]
fn test_macro_defaults_and_unknown_macro() {
    let out = render("@macro(greet name=friend)Hi {$name}@endmacro@invoke(greet)|@invoke(nope)|")
        .unwrap();
    assert_eq!(out, "Hi friend||");
}

#[test]
fn test_comment_renders_nothing() {
    assert_eq!(render("a{#comment}hidden {$x} {#if}{/comment}b").unwrap(), "ab");
}

#[test]
fn test_until_retries_until_valid() {
    let mut registry = Registry::with_defaults();
    registry
        .validators
        .register_fn("at_least_three", |s| s.parse::<i64>().map(|n| n >= 3).unwrap_or(false));
    let mut template = Template::new(&registry, RenderConfig::default());

    let out = template
        .render("{#until validator=at_least_three attempts=5}{@attempt}{/until}")
        .unwrap();
    assert_eq!(out, "3");
}

#[test]
fn test_until_exhausted_returns_last_attempt() {
    let registry = Registry::with_defaults();
    let sink = Arc::new(CollectingSink::new());
    let mut template = Template::new(&registry, RenderConfig::default()).with_sink(sink.clone());

    let out = template
        .render("{#until validator=email attempts=2}try {@attempt}{/until}")
        .unwrap();
    assert_eq!(out, "try 2");
    assert_eq!(sink.of_kind(EventKind::Error).len(), 1);
}

#[test]
fn test_await_reports_events() {
    let registry = Registry::with_defaults();
    let sink = Arc::new(CollectingSink::new());
    let mut template = Template::new(&registry, RenderConfig::default()).with_sink(sink.clone());

    let out = template.render("{#await event=load}done{/await}").unwrap();
    assert_eq!(out, "done");
    let received = sink.of_kind(EventKind::Received);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].detail, "load");
    assert_eq!(received[0].tag, "await");
}

#[test]
fn test_events_muted_without_bubbling() {
    let registry = Registry::with_defaults();
    let sink = Arc::new(CollectingSink::new());
    let config = RenderConfig::new().with_bubble_events(false);
    let mut template = Template::new(&registry, config).with_sink(sink.clone());

    template.render("{#await event=load}done{/await}{=nope()}").unwrap();
    assert!(sink.events().is_empty());
}

#[test]
fn test_global_expression_assignment() {
    let registry = Registry::with_defaults();
    let mut template = Template::new(&registry, RenderConfig::default());
    template.render(r#"{=upper("kept") -> saved global}"#).unwrap();
    assert_eq!(template.variables().get("saved"), Some(&Value::from("KEPT")));
    assert_eq!(template.render("{$saved}").unwrap(), "KEPT");
}

#[test]
fn test_malformed_expression_renders_empty() {
    assert_eq!(render("a{=upper(}b").unwrap(), "ab");
}

#[test]
fn test_function_failure_with_silent_false() {
    let err = render(r#"{=add("x", 1) silent=false}"#).unwrap_err();
    assert!(matches!(err, RenderError::Eval(_)));
}

#[test]
fn test_unclosed_block_reports_span() {
    let source = "ok {#each items=[a]}never closed";
    let err = render(source).unwrap_err();
    let RenderError::Parse(errors) = err else {
        panic!("expected parse errors");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].span(), &(3..20));
    assert!(matches!(&errors[0], ParseError::UnclosedBlock { tag, .. } if tag == "each"));
    assert!(errors[0].format(source, "page.tpl").contains("unclosed block"));
}

#[test]
fn test_expression_output_snapshot() {
    let out = render(
        r#"{#let items=[b,a,c]}{=join(items, "/")} {=length(items)} {=replace("a-b", "-", "+")}"#,
    )
    .unwrap();
    insta::assert_snapshot!(out, @"b/a/c 3 a+b");
}

#[test]
fn test_quoted_close_delimiter_in_attribute() {
    assert_eq!(render(r#"{#let s="a}b"}[{$s}]"#).unwrap(), "[a}b]");
    assert_eq!(render(r#"{=concat("{", "}")}"#).unwrap(), "{}");
}

#[test]
fn test_quoted_parentheses_in_directive() {
    let out = render(r#"@macro(greet)Hi {$name}@endmacro@invoke(greet name="a (b)")"#).unwrap();
    assert_eq!(out, "Hi a (b)");
}

#[test]
fn test_list_items_with_quoted_commas() {
    let out = render(r#"{#each items=["a,b", c] glue="|"}{@current}{/each}"#).unwrap();
    assert_eq!(out, "a,b|c");
}

#[test]
fn test_unterminated_quote_makes_attributes_malformed() {
    let vars: Scope = [("s", "ok")].into_iter().collect();
    assert_eq!(render_vars(r#"{#if var=s equals="ok}yes{/if}"#, vars), "");
}

#[test]
fn test_comment_may_hide_a_closer() {
    let vars: Scope = [("x", true)].into_iter().collect();
    assert_eq!(render_vars("{#if var=x}{#comment}{/if}{/comment}ok{/if}", vars), "ok");
}

//! Tests for engine configuration.

use bindery::RETAIN_METADATA_ENV;
use bindery_test::prelude::*;
use rstest::rstest;
use serial_test::serial;

const TEMPLATE: &str =
    r#"<a href="{url}" data-class="on:{on}" data-style="width:{w}">{name}</a>"#;

fn model() -> Model {
    Model::with_fields([
        ("url", Value::from("/x")),
        ("on", Value::from(true)),
        ("w", Value::from(3)),
        ("name", Value::from("Ann")),
    ])
}

#[test]
fn binding_attributes_are_stripped_by_default() {
    Config::default().install();
    let component = rendered(ComponentClass::new(TEMPLATE), &model());
    let element = component.element().unwrap();
    for name in ["data-attribute-href", "data-class", "data-style", "data-value"] {
        assert!(!element.has_attribute(name), "{name} left behind");
    }
    assert_eq!(element.attribute("href").as_deref(), Some("/x"));
}

#[test]
fn retained_metadata_keeps_binding_attributes() {
    Config {
        retain_metadata: true,
    }
    .install();
    let model = model();
    let component = rendered(ComponentClass::new(TEMPLATE), &model);
    let element = component.element().unwrap();
    assert_eq!(element.attribute("data-attribute-href").as_deref(), Some("{url}"));
    assert_eq!(element.attribute("data-class").as_deref(), Some("on:{on}"));
    assert_eq!(element.attribute("data-style").as_deref(), Some("width:{w}"));
    assert_eq!(element.attribute("data-value").as_deref(), Some("{name}"));

    // retained attributes do not stop the bindings from working
    model.set("url", "/y");
    model.set("on", false);
    assert_eq!(element.attribute("href").as_deref(), Some("/y"));
    assert!(!element.has_class("on"));
    Config::default().install();
}

#[test]
fn configuration_reads_json() {
    let config = Config::from_json(r#"{ "retain_metadata": true }"#).unwrap();
    assert!(config.retain_metadata);
    assert!(matches!(
        Config::from_json(r#"{ "retain_metadata": "sometimes" }"#),
        Err(BindError::Config(_))
    ));
}

#[rstest]
#[case(Some("1"), true)]
#[case(Some("yes"), true)]
#[case(Some(" TRUE "), true)]
#[case(Some("0"), false)]
#[case(Some("nope"), false)]
#[case(None, false)]
#[serial]
fn configuration_reads_the_environment(#[case] value: Option<&str>, #[case] expected: bool) {
    // SAFETY: serialized with every other test that touches the environment
    unsafe {
        match value {
            Some(value) => std::env::set_var(RETAIN_METADATA_ENV, value),
            None => std::env::remove_var(RETAIN_METADATA_ENV),
        }
    }
    assert_eq!(Config::from_env().retain_metadata, expected);
    unsafe { std::env::remove_var(RETAIN_METADATA_ENV) };
}

//! End-to-end checks of whole payloads against models

mod fixtures;

use chrono::Utc;
use fixtures::*;
use modelcheck::{
    CheckError, CheckOptions, Class, CoreError, Descriptor, MessageEntry, MessageMap, Model, ModelNode, Path, Stage, TypeTag,
    Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn to_number(value: &Value) -> Value {
    let parsed = match value {
        Value::Number(n) => *n,
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    };
    Value::Number(parsed)
}

fn is_number(value: &Value, _: &Path) -> bool {
    matches!(value, Value::Number(_))
}

fn is_string(value: &Value, _: &Path) -> bool {
    matches!(value, Value::String(_))
}

fn not_empty(value: &Value, _: &Path) -> bool {
    value.as_str().is_some_and(|s| !s.is_empty())
}

fn name_error() -> std::io::Error {
    std::io::Error::other("name is required!")
}

#[test]
fn test_full_model() {
    let payload = data(json!({
        "a": 1,
        "b": "b",
        "extra": "s",
        "arr": ["1", 2, {}],
        "arr1": [2, {"a": "a"}, {"b": "c"}]
    }));

    let e2 = Model::new()
        .field(
            "e11",
            Descriptor::new()
                .types([TypeTag::String, TypeTag::Number])
                .default_value(1),
        )
        .field(
            "e12",
            Descriptor::new()
                .types([TypeTag::String, TypeTag::Number, TypeTag::Array])
                .default_value(data(json!([1, 2, 5]))),
        );

    let model = Model::new()
        .field(
            "a",
            Descriptor::new()
                .if_no_prop_create(true)
                .ty(TypeTag::Number)
                .required(true),
        )
        .field(
            "b",
            Descriptor::new()
                .types([TypeTag::Number, TypeTag::String, TypeTag::Null])
                .default_with(|| Value::from("bbb"))
                .replace_with(|value, _| Value::from(format!("{}replaced", value.as_str().unwrap_or_default()))),
        )
        .field(
            "c",
            Descriptor::new()
                .if_no_prop_create(true)
                .replace(Value::object())
                .model(Model::new().field("c1", Descriptor::new().default_value(1))),
        )
        .field("d", Descriptor::new().if_no_prop_create(true))
        .field(
            "e.e1",
            Descriptor::new()
                .prop(Path::segments(["e", "a", "e2"]))
                .if_no_prop_create(true)
                .ty(TypeTag::Object)
                .default_value(Value::object())
                .model(e2),
        )
        .field("e.a.e2.e12", Descriptor::new().replace(data(json!([3, 4]))))
        .field(
            "arr",
            Descriptor::new().ty(TypeTag::Array).items(
                Descriptor::new()
                    .types([TypeTag::String, TypeTag::Number, TypeTag::Object])
                    .remove_with(|item, _| !matches!(item, Value::Number(_))),
            ),
        )
        .field("arr1", TypeTag::Array)
        .field(
            "rewrite second item",
            Descriptor::new()
                .prop("arr1.1")
                .ty(TypeTag::Object)
                .replace(data(json!({"hello": "world"}))),
        )
        .field("arr1.2.b", Descriptor::new().ty(TypeTag::Number).replace(3))
        .field(
            "arr2",
            Descriptor::new().if_no_prop_create(true).default_value(Value::array()),
        )
        .field("arr2.0", Descriptor::new().if_no_prop_create(true).default_value(2));

    let mut expected = data(json!({
        "a": 1,
        "b": "breplaced",
        "c": {"c1": 1},
        "arr": [2],
        "arr1": [2, {"hello": "world"}, {"b": 3}],
        "arr2": [2],
        "e": {"a": {"e2": {"e11": 1, "e12": [3, 4]}}}
    }));
    expected
        .as_object_mut()
        .expect("object")
        .insert("d", Value::Undefined);

    assert_eq!(run(&payload, &model).unwrap(), expected);
}

#[test]
fn test_type() {
    let payload = data(json!({"id": "123"}));
    let as_string = Model::new().field("id", TypeTag::String);

    assert_eq!(run(&payload, &as_string).unwrap(), payload);
    assert_eq!(
        run(&data(json!({"id": null})), &as_string).unwrap(),
        data(json!({"id": null}))
    );

    let as_number = Model::new().field("id", TypeTag::Number);
    assert_eq!(
        error_message(&payload, &as_number),
        r#"[modelCheck] [id => "123"] Expected Number"#
    );

    let either = Model::new().field("id", vec![TypeTag::Number, TypeTag::String]);
    assert_eq!(run(&payload, &either).unwrap(), payload);
}

#[test]
fn test_required() {
    let payload = data(json!({"id": "123", "desc": ""}));

    let model = Model::new()
        .field("id", TypeTag::String)
        .field("name", Descriptor::new().required(true));
    let err = run(&payload, &model).unwrap_err();
    assert!(matches!(err, CheckError::RequiredField { ref path, .. } if path == "name"));
    assert_eq!(err.to_string(), "[modelCheck] property name is required");

    let optional = Model::new()
        .field("id", TypeTag::String)
        .field("name", TypeTag::String);
    assert!(run(&payload, &optional).is_ok());

    // An empty string is a present value.
    let desc = Model::new().field("desc", Descriptor::new().ty(TypeTag::String).required(true));
    assert_eq!(run(&payload, &desc).unwrap(), data(json!({"desc": ""})));
}

#[test]
fn test_validate_before_replace() {
    let payload = data(json!({"id": "123"}));
    let model = Model::new().field(
        "id",
        Descriptor::new()
            .types([TypeTag::String, TypeTag::Number])
            .replace_with(|value, _| to_number(value))
            .validate_before_replace_with(is_number),
    );

    let err = run(&payload, &model).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::ValidateBeforeReplace));
    assert_eq!(err.to_string(), "validate property id failed");
}

#[test]
fn test_validator_sees_replaced_value() {
    let payload = data(json!({"id": "123"}));
    let field = || {
        Descriptor::new()
            .types([TypeTag::String, TypeTag::Number])
            .replace_with(|value, _| to_number(value))
    };

    let expects_string = Model::new().field("id", field().validate_with(is_string));
    let err = run(&payload, &expects_string).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Validator));
    assert_eq!(err.to_string(), "validate property id failed");

    let expects_number = Model::new().field("id", field().validate_with(is_number));
    assert_eq!(run(&payload, &expects_number).unwrap(), data(json!({"id": 123})));
}

#[test]
fn test_messages() {
    let payload = data(json!({"name": ""}));

    let text = Model::new().field(
        "name",
        Descriptor::new()
            .ty(TypeTag::String)
            .message("please fill in the name")
            .validate_with(not_empty),
    );
    assert_eq!(error_message(&payload, &text), "please fill in the name");

    let returned_error = Model::new().field(
        "name",
        Descriptor::new()
            .ty(TypeTag::String)
            .validate_with(|_: &Value, _: &Path| Err::<(), _>(name_error())),
    );
    let err = run(&payload, &returned_error).unwrap_err();
    assert!(matches!(err, CheckError::ValidationFailed { cause: Some(_), .. }));
    assert_eq!(err.to_string(), "name is required!");

    let by_stage = Model::new().field(
        "name",
        Descriptor::new()
            .ty(TypeTag::String)
            .message(MessageMap::new().on(Stage::Validator, "no name given"))
            .validate_with(not_empty),
    );
    assert_eq!(error_message(&payload, &by_stage), "no name given");

    let fallback_error = Model::new().field(
        "a",
        Descriptor::new()
            .ty(TypeTag::Number)
            .required(true)
            .message(MessageMap::new().all(MessageEntry::error(std::io::Error::other("no name at all"))))
            .validate_with(|_: &Value, _: &Path| Err::<(), _>(name_error())),
    );
    let err = run(&payload, &fallback_error).unwrap_err();
    assert!(matches!(err, CheckError::Custom { stage: Stage::Required, .. }));
    assert_eq!(err.to_string(), "no name at all");

    let other_stage = Model::new().field(
        "name",
        Descriptor::new()
            .ty(TypeTag::String)
            .message(MessageMap::new().on(Stage::Validator, "please fill in the name"))
            .validate_before_replace_with(not_empty),
    );
    assert_eq!(error_message(&payload, &other_stage), "validate property name failed");

    let class = Model::new().field("name", Descriptor::new().types([Class::new("A")]));
    assert_eq!(
        error_message(&payload, &class),
        r#"[modelCheck] [name => ""] Expected A"#
    );
}

#[test]
fn test_default_fills_undefined() {
    let payload = object([("id", Value::from("123")), ("name", Value::Undefined)]);
    let model = Model::new()
        .field("id", TypeTag::String)
        .field("name", Descriptor::new().default_value("Zhang San").required(true));

    assert_eq!(
        run(&payload, &model).unwrap(),
        data(json!({"id": "123", "name": "Zhang San"}))
    );
}

#[test]
fn test_replace_wins_over_default() {
    let payload = object([("id", Value::from("123")), ("name", Value::Undefined)]);
    let model = Model::new().field("id", TypeTag::String).field(
        "name",
        Descriptor::new()
            .default_value("Zhang San")
            .required(true)
            .replace("Li Si"),
    );

    assert_eq!(
        run(&payload, &model).unwrap(),
        data(json!({"id": "123", "name": "Li Si"}))
    );
}

#[test]
fn test_if_no_prop_create() {
    let payload = data(json!({"id": "123"}));
    let expected = data(json!({"id": "123", "name": "Zhang San", "foo": {"bar": "modelCheck"}}));
    let bar = || {
        Model::new().field(
            "bar",
            Descriptor::new().ty(TypeTag::String).default_value("modelCheck"),
        )
    };

    let per_field = Model::new()
        .field("id", TypeTag::String)
        .field(
            "name",
            Descriptor::new().if_no_prop_create(true).default_value("Zhang San"),
        )
        .field(
            "foo",
            Descriptor::new()
                .if_no_prop_create(true)
                .default_value(Value::object())
                .model(bar()),
        );
    assert_eq!(run(&payload, &per_field).unwrap(), expected);

    let from_options = Model::new()
        .field("id", TypeTag::String)
        .field("name", Descriptor::new().default_value("Zhang San"))
        .field("foo", Descriptor::new().default_value(Value::object()).model(bar()));
    let options = CheckOptions::new().with_if_no_prop_create(true);
    assert_eq!(run_with(&payload, &from_options, options).unwrap(), expected);

    // Without creation the missing fields are projected as undefined.
    let out = run(&payload, &from_options).unwrap();
    assert!(out.get("name").is_undefined());
    assert!(out.get("foo").is_undefined());
}

#[test]
fn test_if_no_prop_create_reaches_collection_items() {
    let item = Model::new().field("x", Descriptor::new().default_value(1));
    let model = Model::new().field(
        "list",
        Descriptor::new()
            .if_no_prop_create(true)
            .items(Descriptor::new().model(item)),
    );

    assert_eq!(
        run(&data(json!({"list": [{}]})), &model).unwrap(),
        data(json!({"list": [{"x": 1}]}))
    );
}

#[test]
fn test_remove_items_from_top_level_collection() {
    let payload = data(json!([1, 2, 3]));
    let model = Model::new().collection(
        Descriptor::new().items_with(|_, index| Descriptor::new().remove(index == 1).into()),
    );

    assert_eq!(run(&payload, &model).unwrap(), data(json!([1, 3])));
}

#[test]
fn test_only_model_descriptors() {
    let payload = data(json!({"s1": "111", "s2": "222"}));
    let model = Model::new().field("s1", TypeTag::String);

    assert_eq!(run(&payload, &model).unwrap(), data(json!({"s1": "111"})));

    let keep_all = CheckOptions::new().with_only_model_descriptors(false);
    assert_eq!(run_with(&payload, &model, keep_all).unwrap(), payload);
}

#[test]
fn test_nested_object_models() {
    let payload = data(json!({
        "o": {
            "o1": {"o11": {"text": "hello world!"}},
            "o2": {"o21": {"text": "wow!!!"}}
        }
    }));
    let model = Model::new().field(
        "o",
        Descriptor::new().ty(TypeTag::Object).model(
            Model::new()
                .field(
                    "o1",
                    Descriptor::new().ty(TypeTag::Object).model(Model::new().field(
                        "o11",
                        Descriptor::new().ty(TypeTag::Object).model(Model::new().field(
                            "text",
                            Descriptor::new()
                                .ty(TypeTag::String)
                                .validate_with(|value: &Value, _: &Path| value.as_str() == Some("hello world!")),
                        )),
                    )),
                )
                .field(
                    "o2",
                    Descriptor::new().ty(TypeTag::Object).model(Model::new().field(
                        "o21",
                        Descriptor::new()
                            .ty(TypeTag::Object)
                            .model(Model::new().field("text", TypeTag::String)),
                    )),
                ),
        ),
    );

    assert_eq!(run(&payload, &model).unwrap(), payload);
}

#[test]
fn test_nested_collection_models() {
    let payload = data(json!({"o": {"o1": [1, {"text": "hello world!"}]}}));
    let item = |_: &Value, index: usize| -> ModelNode {
        match index {
            0 => TypeTag::Number.into(),
            1 => Descriptor::new()
                .ty(TypeTag::Object)
                .model(Model::new().field(
                    "text",
                    Descriptor::new()
                        .ty(TypeTag::String)
                        .validate_with(|value: &Value, _: &Path| value.as_str() == Some("hello world!")),
                ))
                .into(),
            _ => Descriptor::new().into(),
        }
    };
    let model = Model::new().field(
        "o",
        Descriptor::new().ty(TypeTag::Object).model(
            Model::new().field("o1", Descriptor::new().ty(TypeTag::Array).items_with(item)),
        ),
    );

    assert_eq!(run(&payload, &model).unwrap(), payload);
}

#[test]
fn test_item_failure_reports_index() {
    let payload = data(json!({"list": [1, "two", 3]}));
    let model = Model::new().field("list", Descriptor::new().items(TypeTag::Number));

    assert_eq!(
        error_message(&payload, &model),
        r#"[modelCheck] [1 => "two"] Expected Number"#
    );
}

#[test]
fn test_namespace_paths() {
    let nested = data(json!({"a": {"a1": {"a11": {"a111": "i am a111"}}}}));

    let by_models = Model::new().field(
        "a",
        Descriptor::new().model(Model::new().field(
            "a1",
            Descriptor::new().model(Model::new().field(
                "a11",
                Descriptor::new().model(Model::new().field("a111", TypeTag::String)),
            )),
        )),
    );
    assert_eq!(run(&nested, &by_models).unwrap(), nested);

    let is_a111 = |value: &Value, _: &Path| value.as_str() == Some("i am a111");
    let by_key = Model::new().field("a.a1.a11.a111", Descriptor::new().validate_with(is_a111));
    assert_eq!(run(&nested, &by_key).unwrap(), nested);

    let by_dotted_prop = Model::new().field(
        "notCheck",
        Descriptor::new().prop("a.a1.a11.a111").validate_with(is_a111),
    );
    let by_segments = Model::new().field(
        "notCheck",
        Descriptor::new()
            .prop(Path::segments(["a", "a1", "a11", "a111"]))
            .validate_with(is_a111),
    );
    assert_eq!(
        run(&nested, &by_dotted_prop).unwrap(),
        run(&nested, &by_segments).unwrap()
    );
}

#[test]
fn test_dotted_path_follows_key_order() {
    let nested = data(json!({
        "a.b.c": "a.b.c",
        "a": {"b": {"c": "a=>b=>c"}, "b.c": "a=>b.c"},
        "a.b": {"c": "a.b=>c"}
    }));
    let is_deepest = |value: &Value, _: &Path| value.as_str() == Some("a=>b=>c");

    let dotted = Model::new().field("a.b.c", Descriptor::new().validate_with(is_deepest));
    assert_eq!(error_message(&nested, &dotted), "validate property a.b.c failed");

    let exact = Model::new().field(
        "a.b.c",
        Descriptor::new()
            .prop(Path::segments(["a", "b", "c"]))
            .validate_with(is_deepest),
    );
    assert_eq!(
        run(&nested, &exact).unwrap(),
        data(json!({"a": {"b": {"c": "a=>b=>c"}}}))
    );
}

#[test]
fn test_collection_paths_project_with_gaps() {
    let payload = data(json!({
        "arr": [1, {"foo": {"bar": "have a nice day!"}}, "hello world", ["a", "b"]]
    }));
    let model = Model::new()
        .field(
            "arr.1.foo.bar",
            Descriptor::new()
                .ty(TypeTag::String)
                .validate_with(|value: &Value, _: &Path| value.as_str() == Some("have a nice day!")),
        )
        .field(
            "arr.3.1",
            Descriptor::new()
                .ty(TypeTag::String)
                .validate_with(|value: &Value, _: &Path| value.as_str() == Some("b")),
        );

    let expected = object([(
        "arr",
        Value::from(vec![
            Value::Undefined,
            data(json!({"foo": {"bar": "have a nice day!"}})),
            Value::Undefined,
            Value::from(vec![Value::Undefined, Value::from("b")]),
        ]),
    )]);
    assert_eq!(run(&payload, &model).unwrap(), expected);
}

#[test]
fn test_create_along_missing_path() {
    let model = Model::new().field("a.b.c", Descriptor::new().if_no_prop_create(true));
    let out = run(&Value::object(), &model).unwrap();

    let expected = object([("a", object([("b", object([("c", Value::Undefined)]))]))]);
    assert_eq!(out, expected);
}

#[test]
fn test_fields_do_not_apply_to_top_level_collection() {
    let payload = data(json!([1, 2]));
    let model = Model::new()
        .field("1", Descriptor::new().if_no_prop_create(true).replace("2"))
        .field("2", Descriptor::new().if_no_prop_create(true).replace(3))
        .field("3.a.b", Descriptor::new().if_no_prop_create(true));

    assert_eq!(run(&payload, &model).unwrap(), payload);
}

#[test]
fn test_wrapped_collection_paths() {
    let payload = data(json!({"foo": [1, 2]}));
    let rules = |model: Model| {
        model
            .field("foo.1", Descriptor::new().if_no_prop_create(true).replace("2"))
            .field("foo.2", Descriptor::new().if_no_prop_create(true).replace(3))
            .field("foo.3.a.b", Descriptor::new().if_no_prop_create(true))
    };
    let tail = || object([("a", object([("b", Value::Undefined)]))]);

    let projected = run(&payload, &rules(Model::new())).unwrap();
    assert_eq!(
        projected.get("foo"),
        &Value::from(vec![Value::Undefined, "2".into(), 3.into(), tail()])
    );

    let keep_all = CheckOptions::new().with_only_model_descriptors(false);
    let unprojected = run_with(&payload, &rules(Model::new()), keep_all).unwrap();
    assert_eq!(
        unprojected.get("foo"),
        &Value::from(vec![1.into(), "2".into(), 3.into(), tail()])
    );

    let declared = run(&payload, &rules(Model::new().field("foo", TypeTag::Array))).unwrap();
    assert_eq!(declared.get("foo"), unprojected.get("foo"));
}

#[test]
fn test_expression_validators() {
    let exact = Model::new().field("foo", Descriptor::new().validator("@is(1, $value)"));
    assert!(run(&data(json!({"foo": 1})), &exact).is_ok());

    for area in ["-1", "-100.23"] {
        let model = Model::new().field(
            "area",
            Descriptor::new()
                .message("area must be a number above 0")
                .validator("@isPositiveNumber"),
        );
        assert_eq!(
            error_message(&data(json!({ "area": area })), &model),
            "area must be a number above 0"
        );
    }

    let replaced = Model::new().field(
        "foo",
        Descriptor::new()
            .replace("2")
            .validate_before_replace("@isNumeric")
            .validator(r#"@is("2", $value)"#),
    );
    assert_eq!(
        run(&data(json!({"foo": 1})), &replaced).unwrap(),
        data(json!({"foo": "2"}))
    );
}

#[test]
fn test_date_validators() {
    let check_date = |validator: &str, value: Value| {
        let model = Model::new().field("date", Descriptor::new().validator(validator));
        run(&object([("date", value)]), &model)
    };

    assert!(check_date("@isDate", "2019-12-13".into()).is_ok());
    assert!(check_date("@isDate", "2019/12/13".into()).is_ok());
    assert!(check_date("@isDate", "2019-12/13".into()).is_err());
    assert!(check_date("@isDate", "019/12/13".into()).is_err());

    assert!(check_date("@isDateTime", "2019-12-13 16:40:22".into()).is_ok());
    assert!(check_date("@isDateTime", "2019/12/13 16:40:22".into()).is_ok());
    assert!(check_date("@isDateTime", "2019-12-13 16:40".into()).is_err());

    assert!(check_date("@isLooseDate", Utc::now().into()).is_ok());
    assert!(check_date("@isLooseDate", "2019-12-13T08:52:33.965Z".into()).is_ok());
    assert!(check_date("@isLooseDate", 2019.into()).is_err());
}

#[test]
fn test_unknown_validator_is_reported() {
    let model = Model::new().field("foo", Descriptor::new().validator("@isShiny"));
    let err = run(&data(json!({"foo": 1})), &model).unwrap_err();

    assert!(matches!(err, CheckError::InvalidExpression { ref path, .. } if path == "foo"));
}

#[test]
fn test_plain_string_validator_fails() {
    let payload = data(json!({"foo": 1}));

    let model = Model::new().field("foo", Descriptor::new().validator("not an expression"));
    let err = run(&payload, &model).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Validator));
    assert_eq!(err.to_string(), "validate property foo failed");

    let model = Model::new().field("foo", Descriptor::new().validate_before_replace("isInt"));
    let err = run(&payload, &model).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::ValidateBeforeReplace));
    assert_eq!(err.to_string(), "validate property foo failed");
}

#[test]
fn test_payload_must_be_container() {
    let err = run(&Value::from("text"), &Model::new()).unwrap_err();
    assert!(matches!(err, CheckError::Assertion { .. }));
    assert_eq!(err.detail().kind, "model_check_error");
}

#[test]
fn test_collection_index_far_past_end_is_rejected() {
    let model = Model::new()
        .field("foo", TypeTag::Array)
        .field("foo.18446744073709551615", Descriptor::new());
    let err = run(&data(json!({"foo": [1]})), &model).unwrap_err();

    assert!(matches!(err, CheckError::Path(CoreError::InvalidIndex(ref index)) if index == "18446744073709551615"));
}

#[test]
fn test_payload_untouched_when_cloning() {
    let model = Model::new().field("id", Descriptor::new().replace("new"));
    let mut payload = data(json!({"id": "old"}));

    let out = modelcheck::check(&mut payload, &model, &CheckOptions::default()).unwrap();
    assert_eq!(out, data(json!({"id": "new"})));
    assert_eq!(payload, data(json!({"id": "old"})));

    let in_place = CheckOptions::new().with_clone_data(false);
    modelcheck::check(&mut payload, &model, &in_place).unwrap();
    assert_eq!(payload, data(json!({"id": "new"})));
}

#[test]
fn test_collection_payload_restored_after_failure() {
    let model = Model::new().collection(Descriptor::new().items(TypeTag::String));
    let mut payload = data(json!(["a", 2]));

    assert!(modelcheck::check(&mut payload, &model, &CheckOptions::default()).is_err());
    assert_eq!(payload, data(json!(["a", 2])));
}

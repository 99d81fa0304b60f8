//! End-to-end formula evaluation through the public API

use ahash::AHashMap;
use gridbase_core::{field_map, BasicField, CellValue, CellValueType, FieldMap, Record};
use gridbase_formula::{
    convert_expression_id_to_name, convert_expression_name_to_id, evaluate, infer_type,
    parse_expression, referenced_field_ids, FormulaError,
};
use serde_json::json;

fn fields() -> FieldMap {
    field_map(vec![
        BasicField::new("fldNumber", CellValueType::Number),
        BasicField::new("fldName", CellValueType::String),
        BasicField::new("fldBool", CellValueType::Boolean),
        BasicField::new("fldDate", CellValueType::DateTime),
        BasicField::multi("fldNums", CellValueType::Number),
    ])
}

fn record() -> Record {
    Record::from_json(
        "rec1",
        json!({
            "fldNumber": 8,
            "fldName": "World",
            "fldBool": true,
            "fldNums": [1, 2, 3],
        }),
    )
    .set(
        "fldDate",
        CellValue::DateTime("2024-01-15T10:30:00Z".parse().unwrap()),
    )
}

fn eval(expression: &str) -> CellValue {
    evaluate(expression, &fields(), Some(&record()), None)
        .unwrap()
        .value
}

/// Literals evaluate to their typed values
#[test]
fn test_evaluate_literals() {
    let result = evaluate("42", &fields(), Some(&record()), None).unwrap();
    assert_eq!(result.value, CellValue::Number(42.0));
    assert_eq!(result.value_type, CellValueType::Number);

    match eval("3.14") {
        CellValue::Number(n) => assert!((n - 3.14).abs() < 1e-12),
        other => panic!("expected number, got {:?}", other),
    }

    // Both quote styles spell the same string
    assert_eq!(eval("'hello'"), CellValue::String("hello".into()));
    assert_eq!(eval("\"hello\""), CellValue::String("hello".into()));

    // Escape sequences decode inside either style
    assert_eq!(eval(r"'line1\nline2'"), CellValue::String("line1\nline2".into()));
    assert_eq!(eval(r#""say \"hi\"""#), CellValue::String("say \"hi\"".into()));
    assert_eq!(eval(r"'tab\there'"), CellValue::String("tab\there".into()));
}

/// Arithmetic follows script-engine rules: division and modulo by zero
/// are null, not errors
#[test]
fn test_evaluate_arithmetic() {
    assert_eq!(eval("1 + 2"), CellValue::Number(3.0));
    assert_eq!(eval("5 - 3"), CellValue::Number(2.0));
    assert_eq!(eval("8 % 3"), CellValue::Number(2.0));
    assert_eq!(eval("(3 + 5) * 2"), CellValue::Number(16.0));
    assert_eq!(eval("12 / 0"), CellValue::Null);
    assert_eq!(eval("12 % 0"), CellValue::Null);
}

/// Comments and whitespace never change a result
#[test]
fn test_comments_and_whitespace_are_transparent() {
    assert_eq!(eval("  1 + 2  "), eval("1+2"));
    assert_eq!(eval("/* pre */ 1 + 2 // post"), eval("1 + 2"));
    assert_eq!(eval("{fldNumber} /* x */ + 1"), eval("{fldNumber} + 1"));
}

/// Field references read the record through the dependency map
#[test]
fn test_field_reference_arithmetic() {
    assert_eq!(eval("{fldNumber} + 1"), CellValue::Number(9.0));
    assert_eq!(
        eval("'Hello ' & {fldName}"),
        CellValue::String("Hello World".into())
    );
    assert_eq!(eval("{fldBool} && true"), CellValue::Boolean(true));
}

/// A multi-value Number field flattens into SUM's accumulation
#[test]
fn test_sum_flattens_multi_value_field() {
    assert_eq!(eval("SUM({fldNums}, 1, 2, 3)"), CellValue::Number(12.0));

    let wider = record().set(
        "fldNums",
        CellValue::Array(vec![
            CellValue::Number(1.0),
            CellValue::Number(3.0),
            CellValue::Number(4.0),
        ]),
    );
    let result = evaluate("SUM({fldNums}, 1, 2, 3)", &fields(), Some(&wider), None).unwrap();
    assert_eq!(result.value, CellValue::Number(14.0));

    // Outside an array-aware function the same field will not collapse
    let err = evaluate("{fldNums} + 1", &fields(), Some(&record()), None).unwrap_err();
    assert!(err.is_interceptable());
}

/// WORKDAY walks business days, skipping weekends and listed holidays
#[test]
fn test_workday_business_day_walk() {
    assert_eq!(
        eval("DATETIME_FORMAT(WORKDAY('2023-09-08', 200), 'YYYY-MM-DD')"),
        CellValue::String("2024-06-14".into())
    );
    assert_eq!(
        eval(
            "DATETIME_FORMAT(WORKDAY('2023-09-08', 200, \
             '2024-01-22, 2024-01-23, 2024-01-24, 2024-01-25'), 'YYYY-MM-DD')"
        ),
        CellValue::String("2024-06-20".into())
    );
}

/// The empty reference and unknown names abort evaluation
#[test]
fn test_fatal_reference_errors() {
    let err = evaluate("{}", &fields(), Some(&record()), None).unwrap_err();
    assert!(matches!(err, FormulaError::UnknownField(_)));
    assert!(!err.is_interceptable());

    let err = evaluate("{fldGone} + 1", &fields(), Some(&record()), None).unwrap_err();
    assert_eq!(err, FormulaError::UnknownField("fldGone".into()));

    let err = evaluate("NOPE(1)", &fields(), Some(&record()), None).unwrap_err();
    assert_eq!(err, FormulaError::UnknownFunction("NOPE".into()));
}

/// Syntax failures carry a byte position
#[test]
fn test_syntax_error_reports_position() {
    match evaluate("1 + ", &fields(), Some(&record()), None).unwrap_err() {
        FormulaError::Syntax { position, .. } => assert!(position <= 4),
        other => panic!("expected syntax error, got {:?}", other),
    }

    // parse_expression is exposed so hosts can memoize ASTs
    assert!(parse_expression("SUM({fldNums}, 1)").is_ok());
}

/// Loose equality spans scalar shapes; date-time fields compare by instant
#[test]
fn test_loose_equality() {
    assert_eq!(eval("'1' = 1"), CellValue::Boolean(true));
    assert_eq!(eval("true = 1"), CellValue::Boolean(true));
    assert_eq!(eval("'a' != 'b'"), CellValue::Boolean(true));
    assert_eq!(
        eval("{fldDate} = '2024-01-15T10:30:00.000Z'"),
        CellValue::Boolean(true)
    );
}

/// BLANK and IS_ERROR behavior through the whole pipeline
#[test]
fn test_blank_and_is_error() {
    assert_eq!(eval("BLANK()"), CellValue::Null);
    assert_eq!(eval("IF(BLANK(), 'a', 'b')"), CellValue::String("b".into()));
    assert_eq!(eval("IS_ERROR(MOD(1))"), CellValue::Boolean(true));
    assert_eq!(eval("IS_ERROR(1 / 0)"), CellValue::Boolean(false));
    assert_eq!(
        evaluate("ERROR('fail')", &fields(), Some(&record()), None).unwrap_err(),
        FormulaError::Value("fail".into())
    );
}

/// Arguments outside a function's accepted types convert to the first
/// accepted type, never throwing; the result type follows suit
#[test]
fn test_argument_coercion_to_first_accepted_type() {
    // UPPER accepts strings, so a number converts to its string form
    assert_eq!(eval("UPPER(42)"), CellValue::String("42".into()));

    // ABS accepts numbers; a non-numeric string converts to null
    let result = evaluate("ABS('abc')", &fields(), Some(&record()), None).unwrap();
    assert_eq!(result.value, CellValue::Null);
    assert_eq!(result.value_type, CellValueType::Number);

    assert_eq!(eval("CONCATENATE(1, true)"), CellValue::String("1true".into()));
}

/// The evaluation timezone drives calendar rendering
#[test]
fn test_timezone_parameter() {
    let result = evaluate(
        "DATETIME_FORMAT({fldDate}, 'YYYY-MM-DD HH:mm')",
        &fields(),
        Some(&record()),
        Some("America/New_York"),
    )
    .unwrap();
    assert_eq!(result.value, CellValue::String("2024-01-15 05:30".into()));

    let result = evaluate(
        "DATETIME_FORMAT({fldDate}, 'HH:mm')",
        &fields(),
        Some(&record()),
        Some("+08:00"),
    )
    .unwrap();
    assert_eq!(result.value, CellValue::String("18:30".into()));

    let err = evaluate("1", &fields(), Some(&record()), Some("Mars/Olympus")).unwrap_err();
    assert!(matches!(err, FormulaError::Value(_)));
}

/// Static inference types a formula with no record present
#[test]
fn test_static_type_inference() {
    let result = infer_type("IF({fldBool}, 'x', 1)", &fields()).unwrap();
    assert_eq!(result.value_type, CellValueType::String);
    assert!(!result.is_multiple);

    let result = infer_type("{fldNums}", &fields()).unwrap();
    assert_eq!(result.value_type, CellValueType::Number);
    assert!(result.is_multiple);

    assert_eq!(
        infer_type("1 + 2", &fields()).unwrap().value_type,
        CellValueType::Number
    );
    assert_eq!(
        infer_type("NOW()", &fields()).unwrap().value_type,
        CellValueType::DateTime
    );

    // Structure is still validated without a record
    assert!(infer_type("{fldGone}", &fields()).is_err());
}

/// Field ids come back in first-appearance order, de-duplicated
#[test]
fn test_referenced_field_ids() {
    let ids = referenced_field_ids("{fldNumber} + SUM({fldNums}, {fldNumber})").unwrap();
    assert_eq!(ids, vec!["fldNumber".to_string(), "fldNums".to_string()]);
}

/// Rewriting between id and name form round-trips byte-identically
#[test]
fn test_expression_rewrite_round_trip() {
    let id_to_name: AHashMap<String, String> = [
        ("fldNumber".to_string(), "Amount".to_string()),
        ("fldName".to_string(), "Customer Name".to_string()),
    ]
    .into_iter()
    .collect();
    let name_to_id: AHashMap<String, String> = id_to_name
        .iter()
        .map(|(id, name)| (name.clone(), id.clone()))
        .collect();

    let original = "IF({fldNumber} > 10, {fldName} & ' (big)', 'small') // threshold";
    let named = convert_expression_id_to_name(original, &id_to_name).unwrap();
    assert_eq!(
        named,
        "IF({Amount} > 10, {Customer Name} & ' (big)', 'small') // threshold"
    );
    let back = convert_expression_name_to_id(&named, &name_to_id).unwrap();
    assert_eq!(back, original);
}

/// A formula mixing most of the library, the way a production column does
#[test]
fn test_composite_formula() {
    let result = eval(
        "IF({fldNumber} >= 5, \
            UPPER(LEFT({fldName}, 3)) & '-' & ROUND({fldNumber} / 3, 1), \
            'low')",
    );
    assert_eq!(result, CellValue::String("WOR-2.7".into()));

    assert_eq!(
        eval("SWITCH(MOD({fldNumber}, 3), 0, 'fizz', 1, 'one', 'other')"),
        CellValue::String("other".into())
    );
}

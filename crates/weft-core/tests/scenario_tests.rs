//! End-to-end scenarios over the iterator chain, registry dispatch, and
//! value operations, independent of any concrete language surface (no
//! lexer/parser in this workspace — every input below is built directly as
//! `Value`/closures, the way an embedder's generated code would).

use std::cell::RefCell;
use std::rc::Rc;

use weft_core::{
    collect, collect_entries, join, reduce, sum, FilterAdapter, FlatMapAdapter, GeneratorIterator, ListIterator,
    MapAdapter, ScriptFn, SortAdapter, UniqueAdapter,
};
use weft_core::registry::{CallArgs, FunctionRegistry};
use weft_core::value_ops::{add, compare, contains, div, field_get, get_or_create_map, field_set, ArithmeticOptions};
use weft_sdk::continuation::Outcome;
use weft_sdk::descriptor::{FunctionDescriptor, ParamSpec, ReceiverType};
use weft_sdk::error::SourceLoc;
use weft_sdk::value::{OrderedMap, ScriptIterator, Value};

fn ints(items: &[i32]) -> Vec<Value> {
    items.iter().map(|n| Value::Int32(*n)).collect()
}

fn drain(it: Rc<RefCell<dyn ScriptIterator>>) -> Vec<Value> {
    match collect(it) {
        Outcome::Ready(Value::List(l)) => l.borrow().clone(),
        other => panic!("expected a ready list, got {}", outcome_label(&other)),
    }
}

fn outcome_label(o: &Outcome<Value>) -> &'static str {
    match o {
        Outcome::Ready(_) => "ready",
        Outcome::Suspended(_) => "suspended",
        Outcome::Err(_) => "err",
    }
}

/// `Value` carries no `PartialEq` (interior-mutable heap variants make
/// derived equality ambiguous) — compare element-wise with `structural_eq`.
fn assert_values_eq(actual: &[Value], expected: &[Value]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!(a.structural_eq(e), "{actual:?} vs {expected:?}");
    }
}

#[test]
fn filter_then_map_then_collect() {
    let src = ListIterator::new(ints(&[1, 2, 3, 4, 5]));
    let is_even: ScriptFn = Rc::new(|args| Outcome::Ready(Value::Bool(as_i32(&args[0]) % 2 == 0)));
    let times_ten: ScriptFn = Rc::new(|args| Outcome::Ready(Value::Int32(as_i32(&args[0]) * 10)));

    let filtered = FilterAdapter::new(src, is_even);
    let mapped = MapAdapter::new(filtered, times_ten, false);

    assert_values_eq(&drain(mapped), &ints(&[20, 40]));
}

fn as_i32(v: &Value) -> i32 {
    match v {
        Value::Int32(n) => *n,
        other => panic!("expected Int32, got {}", other.type_name()),
    }
}

#[test]
fn stream_of_squares_sums_including_null_termination() {
    let remaining = Rc::new(RefCell::new(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]));
    let produce: ScriptFn = Rc::new(move |_args| {
        let mut r = remaining.borrow_mut();
        if r.is_empty() {
            Outcome::Ready(Value::Null)
        } else {
            Outcome::Ready(r.remove(0))
        }
    });
    let square: ScriptFn = Rc::new(|args| Outcome::Ready(Value::Int32(as_i32(&args[0]) * as_i32(&args[0]))));

    let source = GeneratorIterator::new(produce);
    let mapped = MapAdapter::new(source, square, false);

    match sum(mapped) {
        Outcome::Ready(Value::Int32(n)) => assert_eq!(n, 14),
        other => panic!("expected Ready(14), got {}", outcome_label(&other)),
    }
}

#[test]
fn flat_map_flattens_nested_lists_skipping_empties() {
    let nested = vec![
        Value::list(ints(&[1, 2])),
        Value::list(ints(&[3, 4, 5])),
        Value::list(vec![]),
        Value::list(ints(&[6])),
    ];
    let src = ListIterator::new(nested);
    let identity: ScriptFn = Rc::new(|args| Outcome::Ready(args[0].clone()));
    let flattened = FlatMapAdapter::new(src, identity);

    assert_values_eq(&drain(flattened), &ints(&[1, 2, 3, 4, 5, 6]));
}

#[test]
fn sort_with_descending_comparator() {
    let src = ListIterator::new(ints(&[3, 1, 4, 1, 5, 9, 2, 6]));
    let descending: ScriptFn = Rc::new(|args| {
        let (a, b) = (as_i32(&args[0]), as_i32(&args[1]));
        Outcome::Ready(Value::Int32(b - a))
    });
    let sorted = SortAdapter::new(src, descending);

    assert_values_eq(&drain(sorted), &ints(&[9, 6, 5, 4, 3, 2, 1, 1]));
}

#[test]
fn round_trips_list_through_collect() {
    let original = ints(&[1, 2, 3]);
    let it = ListIterator::new(original.clone());
    assert_values_eq(&drain(it), &original);
}

#[test]
fn round_trips_map_through_collect_entries() {
    let mut map = OrderedMap::new();
    map.insert("a", Value::Int32(1));
    map.insert("b", Value::Int32(2));

    let pairs = map
        .iter()
        .map(|(k, v)| Value::list(vec![Value::str(k.clone()), v.clone()]))
        .collect();
    let it = ListIterator::new(pairs);

    match collect_entries(it) {
        Outcome::Ready(Value::Map(restored)) => {
            let restored = restored.borrow();
            assert!(restored.get("a").is_some_and(|v| v.structural_eq(&Value::Int32(1))));
            assert!(restored.get("b").is_some_and(|v| v.structural_eq(&Value::Int32(2))));
        }
        other => panic!("expected a ready map, got {}", outcome_label(&other)),
    }
}

#[test]
fn unique_is_idempotent() {
    let src = ListIterator::new(ints(&[1, 2, 2, 3, 1, 3, 3]));
    let once = drain(UniqueAdapter::new(src));

    let twice_src = ListIterator::new(once.clone());
    let twice = drain(UniqueAdapter::new(twice_src));

    assert_values_eq(&once, &twice);
    assert_values_eq(&once, &ints(&[1, 2, 3]));
}

#[test]
fn sort_is_idempotent() {
    let asc: ScriptFn = Rc::new(|args| {
        let (a, b) = (as_i32(&args[0]), as_i32(&args[1]));
        Outcome::Ready(Value::Int32(a - b))
    });
    let once = drain(SortAdapter::new(ListIterator::new(ints(&[3, 1, 2])), asc.clone()));
    let twice = drain(SortAdapter::new(ListIterator::new(once.clone()), asc));

    assert_values_eq(&once, &twice);
    assert_values_eq(&once, &ints(&[1, 2, 3]));
}

#[test]
fn join_renders_display_strings() {
    let it = ListIterator::new(vec![Value::Int32(1), Value::str("x"), Value::Bool(true)]);
    match join(it, ", ") {
        Outcome::Ready(Value::Str(s)) => assert_eq!(s.as_ref(), "1, x, true"),
        other => panic!("expected a ready string, got {}", outcome_label(&other)),
    }
}

#[test]
fn reduce_folds_left_to_right() {
    let it = ListIterator::new(ints(&[1, 2, 3, 4]));
    let subtract: ScriptFn = Rc::new(|args| Outcome::Ready(Value::Int32(as_i32(&args[0]) - as_i32(&args[1]))));
    match reduce(it, Value::Int32(100), subtract) {
        Outcome::Ready(Value::Int32(n)) => assert_eq!(n, 100 - 1 - 2 - 3 - 4),
        other => panic!("expected ready int, got {}", outcome_label(&other)),
    }
}

fn descriptor(name: &str, params: Vec<ParamSpec>, mandatory: usize) -> Rc<FunctionDescriptor> {
    Rc::new(FunctionDescriptor {
        name: Rc::from(name),
        aliases: vec![],
        receiver_type: ReceiverType::None,
        first_arg_type: None,
        return_type: None,
        params,
        mandatory_count: mandatory,
        variadic: false,
        needs_location: false,
        is_async: false,
        async_params: vec![],
    })
}

#[test]
fn wrapper_dispatch_agrees_for_named_and_positional_calls() {
    let registry = FunctionRegistry::new();
    let d = descriptor("add2", vec![ParamSpec::required("a"), ParamSpec::required("b")], 2);
    registry.register_global(
        d,
        Rc::new(|_receiver, _continuation, loc, args| {
            add(&args[0], &args[1], loc.clone(), &ArithmeticOptions::default())
                .map(Outcome::Ready)
                .unwrap_or_else(Outcome::Err)
        }),
    );

    let loc = SourceLoc::unknown();
    let positional = registry.call_global("add2", None, &loc, CallArgs::Positional(vec![Value::Int32(1), Value::Int32(2)]));
    let named = registry.call_global(
        "add2",
        None,
        &loc,
        CallArgs::Named(vec![(Rc::from("b"), Value::Int32(2)), (Rc::from("a"), Value::Int32(1))]),
    );

    match (positional, named) {
        (Outcome::Ready(Value::Int32(p)), Outcome::Ready(Value::Int32(n))) => assert_eq!(p, n),
        _ => panic!("expected both dispatch styles to agree"),
    }
}

#[test]
fn field_auto_creation_on_chained_assignment() {
    let a = Value::map(OrderedMap::new());
    let loc = SourceLoc::unknown();

    let b = get_or_create_map(&a, "b", loc.clone()).unwrap();
    field_set(&b, "c", Value::Int32(1), loc.clone()).unwrap();

    let read_back = field_get(&field_get(&a, "b", loc.clone()).unwrap(), "c", loc).unwrap();
    assert!(matches!(read_back, Value::Int32(1)));
}

#[test]
fn decimal_division_caps_scale_and_strips_trailing_zeros() {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    let opts = ArithmeticOptions { decimal_min_scale: 10 };
    let loc = SourceLoc::unknown();

    let one_third = div(&Value::Decimal(Decimal::from(1)), &Value::Decimal(Decimal::from(3)), loc.clone(), &opts).unwrap();
    let Value::Decimal(q) = one_third else { panic!("expected decimal") };
    assert!(q.scale() <= 10);
    assert_eq!(q, Decimal::from_str("0.3333333333").unwrap());

    let one_quarter = div(&Value::Decimal(Decimal::from(1)), &Value::Decimal(Decimal::from(4)), loc, &opts).unwrap();
    let Value::Decimal(q2) = one_quarter else { panic!("expected decimal") };
    assert_eq!(q2.scale(), 2);
    assert_eq!(q2, Decimal::from_str("0.25").unwrap());
}

#[test]
fn membership_across_list_string_and_map() {
    let list = Value::list(ints(&[1, 2, 3]));
    assert!(contains(&list, &Value::Int32(3)));

    let s = Value::str("abc");
    assert!(contains(&s, &Value::str("c")));

    let mut map = OrderedMap::new();
    map.insert("a", Value::Int32(1));
    assert!(!contains(&Value::map(map), &Value::str("x")));
}

#[test]
fn compare_mixed_numeric_families() {
    let loc = SourceLoc::unknown();
    assert_eq!(
        compare(&Value::Int32(1), &Value::Int64(2), loc).unwrap(),
        std::cmp::Ordering::Less
    );
}

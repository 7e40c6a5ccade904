use core::cmp::Ordering;

use dynval::{ArrayIntoIter, VArray, VMap, VString, Value, ValueType};
use dynval_testhelpers::test;
use static_assertions::{assert_impl_all, assert_not_impl_any};

// Owning handles are move-only
assert_not_impl_any!(VString: Clone, Copy);
assert_not_impl_any!(VArray: Clone, Copy);
assert_not_impl_any!(VMap: Clone, Copy);
assert_not_impl_any!(Value: Clone, Copy);

assert_impl_all!(Value: Send, Sync, Default, PartialEq, core::fmt::Debug, core::fmt::Display);
assert_impl_all!(VArray: Send, Sync);
assert_impl_all!(VMap: Send, Sync);
assert_impl_all!(ArrayIntoIter: ExactSizeIterator);
assert_impl_all!(ValueType: Copy, Eq, core::hash::Hash);

/// Orders I32 before strings, then by payload.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::I32(x), Value::I32(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::I32(_), _) => Ordering::Less,
        (_, Value::I32(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[test]
fn sort_produces_sorted_permutation() {
    let input = [5, -3, 9, 0, 5, 12, -3, 7, 1, 1, 8, 2];
    let mut arr: VArray = input.into_iter().collect();
    arr.push(Value::from("b")).unwrap();
    arr.push(Value::from("a")).unwrap();

    arr.sort_by(compare);

    assert!(
        arr.windows(2)
            .all(|w| compare(&w[0], &w[1]) != Ordering::Greater)
    );

    let mut expected: Vec<i32> = input.to_vec();
    expected.sort();
    let ints: Vec<i32> = arr.iter().filter_map(Value::as_i32).collect();
    assert_eq!(ints, expected);
    assert_eq!(arr[arr.len() - 2], Value::from("a"));
    assert_eq!(arr[arr.len() - 1], Value::from("b"));
}

#[test]
fn sort_of_short_arrays_is_noop() {
    let mut empty = VArray::new().unwrap();
    empty.sort_by(|_, _| unreachable!());
    let mut one: VArray = [1].into_iter().collect();
    one.sort_by(|_, _| unreachable!());
    assert_eq!(one[0], Value::I32(1));
}

#[test]
fn map_round_trip_under_collisions() {
    // One initial bucket means every power-of-two resize happens along the way
    let mut map = VMap::with_capacity(1).unwrap();
    let entries: Vec<(String, Value)> = (0..64)
        .map(|i| (format!("entry-{i}"), Value::I64(i * i)))
        .collect();
    for (key, value) in &entries {
        map.set(key, value.deep_copy().unwrap()).unwrap();
    }
    for (key, value) in &entries {
        assert_eq!(map.get(key), Some(value));
    }
    assert_eq!(map.len(), entries.len());
    assert!(map.load_factor() < dynval::MAX_LOAD_FACTOR);
}

#[test]
fn vacated_slots_read_as_missing() {
    let mut arr: VArray = (0..10).collect();
    arr.truncate(3);
    assert!(arr.get(3).is_none());
    arr.remove_at(0).unwrap();
    assert_eq!(arr.as_slice(), &[Value::I32(1), Value::I32(2)]);
    arr.clear();
    assert_eq!(arr.pop(), Value::Null);
    assert!(arr.capacity() >= 10);
}

#[test]
fn search_helpers() {
    let arr: VArray = [1, 2, 3, 2, 1].into_iter().collect();
    let two = Value::I32(2);
    assert!(arr.contains(&two));
    assert_eq!(arr.index_of(&two, 0), Some(1));
    assert_eq!(arr.index_of(&two, 2), Some(3));
    assert_eq!(arr.index_of(&two, 4), None);
    assert_eq!(arr.index_of(&two, 99), None);
    assert_eq!(arr.last_index_of(&two), Some(3));
    assert_eq!(arr.find(&Value::I32(3)), Some(&Value::I32(3)));
    assert_eq!(arr.find_last(&Value::I32(9)), None);

    let empty = VArray::new().unwrap();
    assert_eq!(empty.index_of(&two, 0), None);
    assert_eq!(empty.last_index_of(&two), None);
}

#[test]
fn value_types_report_their_case() {
    let cases = [
        (dynval::value!(null), ValueType::Null),
        (Value::Bool(true), ValueType::Bool),
        (Value::I32(1), ValueType::I32),
        (Value::I64(1), ValueType::I64),
        (Value::F32(1.0), ValueType::F32),
        (Value::F64(1.0), ValueType::F64),
        (Value::from("s"), ValueType::String),
        (Value::new_array(), ValueType::Array),
        (Value::new_map(), ValueType::Map),
    ];
    for (value, ty) in &cases {
        assert_eq!(value.value_type(), *ty);
    }
}

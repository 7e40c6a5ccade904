use dynval::{VArray, VMap, VString, Value};
use dynval_testhelpers::{measure, test};

fn sample_array() -> VArray {
    let mut arr = VArray::new().unwrap();
    arr.push(Value::from("alpha")).unwrap();
    arr.push(Value::I32(2)).unwrap();
    arr.push(Value::from("gamma")).unwrap();
    arr.push(dynval::value!([1, 2, 3])).unwrap();
    arr
}

#[test]
fn map_overwrite_releases_previous_value() {
    let mut map = VMap::new().unwrap();
    map.set("k", Value::from("first")).unwrap();
    let second = Value::from("second");

    let ((), delta) = measure(|| map.set("k", second).unwrap());

    // The temporary key copy is freed, and so is "first"
    assert_eq!(delta.blocks, -1);
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("k"), Some(&Value::from("second")));
}

#[test]
fn map_insert_overwrite_drops_callers_key() {
    let mut map = VMap::new().unwrap();
    map.set("k", Value::I32(1)).unwrap();
    let key = VString::from_bytes(b"k").unwrap();

    let ((), delta) = measure(|| map.insert(key, Value::I32(2)).unwrap());

    assert_eq!(delta.blocks, -1);
    assert_eq!(map["k"], Value::I32(2));
}

#[test]
fn array_set_releases_previous_value() {
    let mut arr = sample_array();
    let ((), delta) = measure(|| arr.set(0, Value::I32(0)).unwrap());
    assert_eq!(delta.blocks, -1);
    assert_eq!(arr[0], Value::I32(0));
}

#[test]
fn array_set_out_of_range_drops_incoming() {
    let mut arr = sample_array();
    let incoming = Value::from("orphan");
    let (result, delta) = measure(|| arr.set(10, incoming));
    assert_eq!(
        result,
        Err(dynval::Error::OutOfBounds { index: 10, len: 4 })
    );
    assert_eq!(delta.blocks, -1);
}

#[test]
fn array_insert_past_end_drops_incoming() {
    let mut arr = sample_array();
    let incoming = Value::from("orphan");
    let (result, delta) = measure(|| arr.insert_at(5, incoming));
    assert!(result.is_err());
    assert_eq!(delta.blocks, -1);
    assert_eq!(arr.len(), 4);
}

#[test(leak_check)]
fn filter_result_is_independent() {
    let source = sample_array();
    let mut filtered = source.filter(Value::is_compound).unwrap();
    assert_eq!(filtered.len(), 3);

    filtered.set(0, Value::Null).unwrap();
    if let Some(inner) = filtered[2].as_array_mut() {
        inner.clear();
    }
    drop(filtered);

    assert_eq!(source[0], Value::from("alpha"));
    assert_eq!(source[3], dynval::value!([1, 2, 3]));
}

#[test(leak_check)]
fn map_result_is_independent() {
    let source = sample_array();
    let mut mapped = source
        .map(|v| match v {
            Value::I32(n) => Value::I64(i64::from(*n) * 10),
            other => other.deep_copy().unwrap(),
        })
        .unwrap();
    assert_eq!(mapped.len(), source.len());
    assert_eq!(mapped[1], Value::I64(20));

    mapped[0]
        .as_string_mut()
        .unwrap()
        .push_bytes(b"-changed")
        .unwrap();
    assert_eq!(mapped[0], Value::from("alpha-changed"));
    assert_eq!(source[0], Value::from("alpha"));
}

#[test(leak_check)]
fn deep_copy_is_independent() {
    let original = dynval::value!({ "list": ["a", "b"], "n": 1 });
    let mut copy = original.deep_copy().unwrap();
    assert_eq!(copy, original);

    let map = copy.as_map_mut().unwrap();
    let list = map.get_mut("list").unwrap().as_array_mut().unwrap();
    list.pop();
    map.set("n", Value::I32(2)).unwrap();

    assert_ne!(copy, original);
    let original_list = original.as_map().unwrap()["list"].as_array().unwrap();
    assert_eq!(original_list.len(), 2);
}

#[test(leak_check)]
fn pop_and_remove_hand_back_ownership() {
    let mut arr = sample_array();
    let last = arr.pop();
    assert_eq!(last, dynval::value!([1, 2, 3]));
    let first = arr.remove(0).unwrap();
    assert_eq!(first, Value::from("alpha"));
    assert_eq!(arr.len(), 2);
    drop(arr);
    // Both removed values are still alive here
    assert!(last.is_array() && first.is_string());
}

#[test(leak_check)]
fn taken_value_leaves_null_behind() {
    let mut map = VMap::new().unwrap();
    map.set("s", Value::from("payload")).unwrap();
    let taken = map.get_mut("s").unwrap().take();
    assert_eq!(map["s"], Value::Null);
    assert_eq!(taken, Value::from("payload"));
}

#[test(leak_check)]
fn churn_of_mixed_operations() {
    let mut map = VMap::with_capacity(0).unwrap();
    for round in 0..4 {
        for i in 0..50 {
            let key = format!("k{i}");
            let value = if i % 3 == 0 {
                dynval::value!(["x", { "deep": "y" }])
            } else {
                Value::from(format!("v{round}-{i}").as_str())
            };
            map.set(&key, value).unwrap();
        }
        for i in (0..50).step_by(2) {
            assert!(map.delete(format!("k{i}")));
        }
        assert_eq!(map.len(), 25);
    }
    map.clear();
    assert!(map.is_empty());
}

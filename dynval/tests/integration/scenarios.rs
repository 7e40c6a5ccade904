use dynval::{VArray, VMap, VString, Value, value};
use dynval_testhelpers::test;

#[test]
fn array_of_every_primitive() {
    let mut arr = VArray::new().unwrap();
    arr.push(Value::Null).unwrap();
    arr.push(Value::Bool(true)).unwrap();
    arr.push(Value::I32(123)).unwrap();
    arr.push(Value::I64(4_567_890_123)).unwrap();
    arr.push(Value::F32(3.14)).unwrap();
    arr.push(Value::F64(2.71828)).unwrap();
    arr.push(Value::from("hello")).unwrap();

    assert_eq!(arr.len(), 7);
    let s = arr.get(6).and_then(Value::as_string).unwrap();
    assert_eq!(s, "hello");
    assert!(arr.get(7).is_none());

    let v = Value::Array(arr);
    assert_eq!(
        v.render(),
        b"[null, true, 123, 4567890123, 3.14, 2.71828, \"hello\"]"
    );
}

#[test]
fn array_grows_past_small_capacity() {
    let mut arr = VArray::with_capacity(2).unwrap();
    for n in 1..=3 {
        arr.push(Value::I32(n)).unwrap();
    }
    assert_eq!(arr.len(), 3);
    assert!(arr.capacity() >= 3);
    for i in 0..3 {
        assert_eq!(arr.get(i), Some(&Value::I32(i as i32 + 1)));
    }
}

#[test]
fn map_overwrite_keeps_one_entry() {
    let mut map = VMap::new().unwrap();
    map.set("k", Value::I32(1)).unwrap();
    map.set("k", Value::from("v")).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("k"), Some(&Value::from("v")));
}

#[test]
fn map_grows_from_two_buckets() {
    let mut map = VMap::with_capacity(2).unwrap();
    for i in 1..=10 {
        map.set(format!("key{i}"), Value::I32(i)).unwrap();
    }
    assert_eq!(map.len(), 10);
    assert!(map.capacity() >= 8);
    assert!(map.load_factor() < dynval::MAX_LOAD_FACTOR);
    for i in 1..=10 {
        assert_eq!(map.get(format!("key{i}")), Some(&Value::I32(i)));
    }
    assert_eq!(map.iter().count(), 10);
}

#[test(leak_check)]
fn nested_tree_releases_everything() {
    let mut outer_array = VArray::new().unwrap();
    outer_array.push(Value::I32(1)).unwrap();
    outer_array.push(Value::from("nested")).unwrap();

    let mut outer_map = VMap::new().unwrap();
    outer_map.set("inner", Value::Bool(false)).unwrap();

    let mut root = VMap::new().unwrap();
    root.set("outer_array", outer_array.into()).unwrap();
    root.set("outer_map", outer_map.into()).unwrap();
    root.insert(
        VString::from_bytes(b"outer_string").unwrap(),
        Value::from("top"),
    )
    .unwrap();

    let mut root = Value::Map(root);
    assert_eq!(root.as_map().map(VMap::len), Some(3));
    root.destroy();
    assert!(root.is_null());
    root.destroy();
}

#[test]
fn equality_across_cases() {
    assert_eq!(Value::I32(42), Value::I32(42));
    assert_ne!(Value::I32(42), Value::from("42"));
    assert_eq!(Value::F64(0.1 + 0.2), Value::F64(0.3));
}

#[test(leak_check)]
fn macro_built_tree_matches_manual_tree() {
    let built = value!({
        "outer_array": [1, "nested"],
        "outer_map": { "inner": false },
        "outer_string": "top",
    });

    let mut manual = VMap::with_capacity(32).unwrap();
    manual
        .set(
            "outer_array",
            [Value::I32(1), Value::from("nested")]
                .into_iter()
                .collect::<VArray>()
                .into(),
        )
        .unwrap();
    manual
        .set(
            "outer_map",
            [("inner", false)].into_iter().collect::<VMap>().into(),
        )
        .unwrap();
    manual.set("outer_string", "top".into()).unwrap();

    assert_eq!(built, Value::Map(manual));
}

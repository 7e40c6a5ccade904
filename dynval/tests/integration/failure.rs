//! Allocation failures injected through the counting allocator.

use dynval::{Error, VArray, VMap, VString, Value, value};
use dynval_testhelpers::{assert_no_leaks, fail_allocations_after, test};

#[test(leak_check)]
fn push_failure_drops_incoming_value() {
    let mut arr = VArray::with_capacity(1).unwrap();
    arr.push(Value::I32(1)).unwrap();
    let incoming = Value::from("payload");

    let result = {
        let _guard = fail_allocations_after(0);
        arr.push(incoming)
    };

    assert!(result.unwrap_err().is_allocation_failure());
    assert_eq!(arr.len(), 1);
    assert_eq!(arr.capacity(), 1);
    assert_eq!(arr[0], Value::I32(1));
}

#[test(leak_check)]
fn insert_at_failure_leaves_array_untouched() {
    let mut arr: VArray = [1, 2].into_iter().collect();
    arr.shrink_to_fit().unwrap();
    let front = Value::from("front");
    let result = {
        let _guard = fail_allocations_after(0);
        arr.insert_at(0, front)
    };
    assert!(result.is_err());
    assert_eq!(arr.as_slice(), &[Value::I32(1), Value::I32(2)]);
}

#[test(leak_check)]
fn map_entry_failure_drops_key_and_value() {
    let mut map = VMap::new().unwrap();
    let key = VString::from_bytes(b"k").unwrap();
    let value = Value::from("v");

    let result = {
        let _guard = fail_allocations_after(0);
        map.insert(key, value)
    };

    assert!(matches!(result, Err(Error::AllocationFailure { .. })));
    assert!(map.is_empty());
    assert!(map.get("k").is_none());
}

#[test(leak_check)]
fn map_rehash_failure_keeps_existing_entries() {
    let mut map = VMap::new().unwrap();
    for i in 0..5 {
        map.set(format!("k{i}"), Value::I32(i)).unwrap();
    }
    let key = VString::from_bytes(b"k5").unwrap();

    // The sixth entry would reach the load threshold and resize first
    let result = {
        let _guard = fail_allocations_after(0);
        map.insert(key, Value::I32(5))
    };

    assert!(result.is_err());
    assert_eq!(map.len(), 5);
    assert_eq!(map.capacity(), 8);
    for i in 0..5 {
        assert_eq!(map.get(format!("k{i}")), Some(&Value::I32(i)));
    }
}

#[test(leak_check)]
fn set_key_copy_failure_drops_value() {
    let mut map = VMap::new().unwrap();
    let value = Value::from("v");
    let result = {
        let _guard = fail_allocations_after(0);
        map.set("k", value)
    };
    assert!(result.is_err());
    assert!(map.is_empty());
}

#[test(leak_check)]
fn constructors_collapse_to_null() {
    let _guard = fail_allocations_after(0);
    assert!(Value::new_string(b"abc").is_null());
    assert!(Value::new_array().is_null());
    assert!(Value::new_map().is_null());
    assert!(VString::with_capacity(4).is_err());
    assert!(VArray::new().is_err());
    assert!(VMap::new().is_err());
}

#[test(leak_check)]
fn string_append_failure_keeps_contents() {
    let mut s = VString::from_bytes(b"12345678").unwrap();
    let result = {
        let _guard = fail_allocations_after(0);
        s.push_bytes(b"9")
    };
    assert!(result.is_err());
    assert_eq!(s, "12345678");
    assert_eq!(s.capacity(), 8);
    assert_eq!(s.as_bytes_with_nul().last(), Some(&0));
}

/// Runs `op` once per possible failure point, checking it never leaks and
/// eventually succeeds.
fn exhaust_failure_points(mut op: impl FnMut() -> bool) {
    for budget in 0.. {
        let done = assert_no_leaks(|| {
            let _guard = fail_allocations_after(budget);
            op()
        });
        if done {
            return;
        }
        assert!(budget < 1000, "operation never succeeded");
    }
}

fn tree() -> Value {
    value!({
        "name": "tree",
        "children": [
            { "leaf": "a" },
            { "leaf": "b", "extra": [1, 2, "three"] },
        ],
        "tags": ["x", "y", "z"],
    })
}

#[test]
fn deep_copy_releases_partial_copies() {
    let source = tree();
    exhaust_failure_points(|| match source.deep_copy() {
        Ok(copy) => {
            assert_eq!(copy, source);
            true
        }
        Err(err) => {
            assert!(err.is_allocation_failure());
            false
        }
    });
}

#[test]
fn filter_releases_partial_results() {
    let source: VArray = ["a", "bb", "ccc", "dddd"].into_iter().collect();
    let longer_than_one = |v: &Value| v.as_string().is_some_and(|s| s.len() > 1);
    exhaust_failure_points(|| match source.filter(longer_than_one) {
        Ok(out) => {
            assert_eq!(out.len(), 3);
            true
        }
        Err(_) => false,
    });
    assert_eq!(source.len(), 4);
}

#[test]
fn growing_map_survives_every_failure_point() {
    // Built up front: std collections abort on allocation failure
    let keys: Vec<String> = (0..12).map(|i| format!("key{i}")).collect();
    exhaust_failure_points(|| {
        let mut map = match VMap::with_capacity(2) {
            Ok(map) => map,
            Err(_) => return false,
        };
        for (i, key) in keys.iter().enumerate() {
            let Ok(value) = VString::from_bytes(key.as_bytes()) else {
                return false;
            };
            if map.set(key, Value::String(value)).is_err() || map.len() != i + 1 {
                return false;
            }
        }
        map.len() == 12
    });
}

#[test]
fn growing_array_survives_every_failure_point() {
    exhaust_failure_points(|| {
        let mut arr = match VArray::with_capacity(0) {
            Ok(arr) => arr,
            Err(_) => return false,
        };
        for i in 0..40 {
            if arr.push(Value::I64(i)).is_err() {
                return false;
            }
        }
        arr.len() == 40
    });
}

#[test]
fn guard_restores_normal_allocation() {
    {
        let guard = fail_allocations_after(2);
        assert_eq!(guard.remaining(), 2);
    }
    let arr: VArray = (0..100).collect();
    assert_eq!(arr.len(), 100);
}

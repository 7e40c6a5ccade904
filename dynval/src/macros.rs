/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// ```
/// use dynval::value;
///
/// let v = value!({
///     "name": "dynval",
///     "tags": ["a", "b"],
///     "size": 3,
///     "ratio": 0.5,
///     "parent": null,
/// });
/// assert_eq!(v.as_map().unwrap().len(), 5);
/// assert!(value!(null).is_null());
/// ```
///
/// Elements and map values are single token trees; wrap anything longer in
/// parentheses, e.g. `value!([(-1), (x + y)])`. Any other expression goes
/// through `Value::from`.
///
/// Panics (or aborts, for allocator failure) if a container cannot be built.
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(
            <$crate::VArray as ::core::iter::FromIterator<$crate::Value>>::from_iter(
                [ $( $crate::value!($elem) ),* ],
            ),
        )
    };
    ({ $($key:literal : $val:tt),* $(,)? }) => {
        $crate::Value::Map(
            <$crate::VMap as ::core::iter::FromIterator<(&str, $crate::Value)>>::from_iter(
                [ $( ($key, $crate::value!($val)) ),* ],
            ),
        )
    };
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

//! Declarative macros for record mapping and parameter sets.
//!
//! These expand at compile time with zero runtime overhead; there is no
//! registration step and no reflection behind them.

/// Implement [`Record`](crate::Record) for a struct by listing the fields
/// that participate in column mapping.
///
/// Columns are matched to fields case-insensitively; columns without a
/// matching field are ignored.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Default)]
/// struct User {
///     name: String,
///     age: i64,
/// }
///
/// impl_record!(User { name, age });
/// ```
#[macro_export]
macro_rules! impl_record {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::Record for $ty {
            fn assign(
                &mut self,
                column: &str,
                value: $crate::SqlValue,
            ) -> $crate::DbResult<()> {
                $(
                    if column.eq_ignore_ascii_case(stringify!($field)) {
                        self.$field = $crate::FromSql::from_sql(value)?;
                        return Ok(());
                    }
                )+
                // Extra columns are tolerated
                Ok(())
            }
        }
    };
}

/// Build a [`Params`](crate::Params) set from `name => value` pairs.
///
/// # Example
///
/// ```ignore
/// let set = params! { "Name" => "Alice", "Age" => 30i64 };
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::Params::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut set = $crate::Params::new();
        $( set.insert($name, $value); )+
        set
    }};
}

#[cfg(test)]
mod tests {
    use crate::value::SqlValue;

    #[test]
    fn test_params_macro() {
        let set = crate::params! { "Name" => "Alice", "Age" => 30i64 };
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("age"), Some(&SqlValue::Int(30)));
    }

    #[test]
    fn test_params_macro_empty() {
        let set = crate::params! {};
        assert!(set.is_empty());
    }
}

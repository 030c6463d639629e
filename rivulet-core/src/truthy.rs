//! Boolean coercion for condition-stream emissions.
//!
//! A retry loop stops on the first condition value that is truthy. Values are
//! coerced the way a dynamically typed host would: zero, empty and missing
//! values are falsy, everything else is truthy.

use serde_json::Value;

/// Coerce a value to `bool`.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for () {
    fn is_truthy(&self) -> bool {
        // A bare signal (e.g. a unit "stop" tick) always counts.
        true
    }
}

macro_rules! impl_truthy_int {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

impl_truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

impl<T: Truthy + ?Sized> Truthy for Box<T> {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

impl Truthy for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f.is_truthy()),
            Value::String(s) => !s.is_empty(),
            // Containers are truthy even when empty.
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_bool_and_unit() {
        assert!(true.is_truthy());
        assert!(!false.is_truthy());
        assert!(().is_truthy());
    }

    #[test]
    fn test_numbers() {
        assert!(!0i32.is_truthy());
        assert!(7u8.is_truthy());
        assert!((-1i64).is_truthy());
        assert!(!0.0f64.is_truthy());
        assert!(!f64::NAN.is_truthy());
        assert!(0.5f32.is_truthy());
    }

    #[test]
    fn test_strings_and_options() {
        assert!(!"".is_truthy());
        assert!("stop".is_truthy());
        assert!(String::from("x").is_truthy());
        assert!(!None::<bool>.is_truthy());
        assert!(!Some(false).is_truthy());
        assert!(Some(true).is_truthy());
    }

    #[test]
    fn test_json_values() {
        assert!(!json!(null).is_truthy());
        assert!(!json!(false).is_truthy());
        assert!(!json!(0).is_truthy());
        assert!(!json!("").is_truthy());
        assert!(json!([]).is_truthy());
        assert!(json!({}).is_truthy());
        assert!(json!(1.5).is_truthy());
        assert!(json!("done").is_truthy());
    }

    proptest! {
        #[test]
        fn prop_int_truthy_iff_nonzero(n in any::<i64>()) {
            prop_assert_eq!(n.is_truthy(), n != 0);
        }

        #[test]
        fn prop_json_string_matches_native(s in ".*") {
            prop_assert_eq!(Value::String(s.clone()).is_truthy(), s.is_truthy());
        }
    }
}

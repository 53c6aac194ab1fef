//! Typed call keys

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A typed argument value.
///
/// Every primitive Rust type has its own variant so equal-looking values of
/// different types stay distinct. Floats are keyed by bit pattern, with `-0.0`
/// folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgValue {
    Unit,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(u64),
    F32(u32),
    F64(u64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<ArgValue>),
    Opt(Option<Box<ArgValue>>),
}

impl ArgValue {
    pub fn f32(value: f32) -> Self {
        let value = if value == 0.0 { 0.0 } else { value };
        ArgValue::F32(value.to_bits())
    }

    pub fn f64(value: f64) -> Self {
        let value = if value == 0.0 { 0.0 } else { value };
        ArgValue::F64(value.to_bits())
    }

    /// A byte string. `Vec<u8>` converts to a sequence of `U8`, so raw
    /// bytes need this explicit constructor.
    pub fn bytes(value: impl AsRef<[u8]>) -> Self {
        ArgValue::Bytes(value.as_ref().to_vec())
    }
}

/// Conversion of a Rust value into a typed key argument
pub trait IntoArg {
    fn to_arg(&self) -> ArgValue;
}

macro_rules! impl_into_arg {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl IntoArg for $ty {
                fn to_arg(&self) -> ArgValue {
                    ArgValue::$variant(*self)
                }
            }
        )*
    };
}

impl_into_arg!(
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
);

impl IntoArg for isize {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Isize(*self as i64)
    }
}

impl IntoArg for usize {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Usize(*self as u64)
    }
}

impl IntoArg for f32 {
    fn to_arg(&self) -> ArgValue {
        ArgValue::f32(*self)
    }
}

impl IntoArg for f64 {
    fn to_arg(&self) -> ArgValue {
        ArgValue::f64(*self)
    }
}

impl IntoArg for () {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Unit
    }
}

impl IntoArg for str {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Str(self.to_string())
    }
}

impl IntoArg for String {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Str(self.clone())
    }
}

impl<T: IntoArg> IntoArg for [T] {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Seq(self.iter().map(IntoArg::to_arg).collect())
    }
}

impl<T: IntoArg> IntoArg for Vec<T> {
    fn to_arg(&self) -> ArgValue {
        self.as_slice().to_arg()
    }
}

impl<T: IntoArg> IntoArg for Option<T> {
    fn to_arg(&self) -> ArgValue {
        ArgValue::Opt(self.as_ref().map(|value| Box::new(value.to_arg())))
    }
}

impl<T: IntoArg + ?Sized> IntoArg for &T {
    fn to_arg(&self) -> ArgValue {
        (**self).to_arg()
    }
}

impl IntoArg for ArgValue {
    fn to_arg(&self) -> ArgValue {
        self.clone()
    }
}

/// An argument list that can be appended to a [`CallKey`].
///
/// Implemented for `()` and tuples of [`IntoArg`] values (positional arguments),
/// and derivable for structs with `#[derive(CallArgs)]` (named fields become
/// keyword arguments).
pub trait CallArgs {
    fn append_to(&self, key: &mut CallKey);
}

impl CallArgs for () {
    fn append_to(&self, _key: &mut CallKey) {}
}

macro_rules! impl_call_args_tuple {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty: IntoArg),+> CallArgs for ($($ty,)+) {
            fn append_to(&self, key: &mut CallKey) {
                let ($($var,)+) = self;
                $(key.push_arg($var.to_arg());)+
            }
        }
    };
}

impl_call_args_tuple!(A a);
impl_call_args_tuple!(A a, B b);
impl_call_args_tuple!(A a, B b, C c);
impl_call_args_tuple!(A a, B b, C c, D d);
impl_call_args_tuple!(A a, B b, C c, D d, E e);
impl_call_args_tuple!(A a, B b, C c, D d, E e, F f);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum KeyPart {
    Arg(ArgValue),
    /// Separates positional from keyword arguments; no argument value produces it
    KeywordMark,
    Keyword(String, ArgValue),
}

/// Cache key for one call of a memoized function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallKey {
    function: String,
    parts: Vec<KeyPart>,
}

impl CallKey {
    /// Key for `function` called with no arguments
    pub fn new(function: impl Into<String>) -> Self {
        Self { function: function.into(), parts: Vec::new() }
    }

    /// Key for `function` called with `args`
    pub fn for_call<A: CallArgs + ?Sized>(function: impl Into<String>, args: &A) -> Self {
        let mut key = Self::new(function);
        args.append_to(&mut key);
        key
    }

    /// Add a positional argument
    pub fn arg<T: IntoArg>(mut self, value: T) -> Self {
        self.push_arg(value.to_arg());
        self
    }

    /// Add a keyword argument
    pub fn kwarg<T: IntoArg>(mut self, name: impl Into<String>, value: T) -> Self {
        self.push_kwarg(name, value.to_arg());
        self
    }

    /// Append a positional argument after the existing positional ones
    pub fn push_arg(&mut self, value: ArgValue) {
        let at = self.positional_len();
        self.parts.insert(at, KeyPart::Arg(value));
    }

    /// Insert a keyword argument in name order; binding a name again replaces it
    pub fn push_kwarg(&mut self, name: impl Into<String>, value: ArgValue) {
        let name = name.into();
        let start = match self.parts.iter().position(|part| matches!(part, KeyPart::KeywordMark)) {
            Some(mark) => mark + 1,
            None => {
                self.parts.push(KeyPart::KeywordMark);
                self.parts.len()
            }
        };

        let found = self.parts[start..].binary_search_by(|part| match part {
            KeyPart::Keyword(existing, _) => existing.as_str().cmp(name.as_str()),
            _ => Ordering::Less,
        });
        match found {
            Ok(i) => self.parts[start + i] = KeyPart::Keyword(name, value),
            Err(i) => self.parts.insert(start + i, KeyPart::Keyword(name, value)),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn positional_len(&self) -> usize {
        self.parts.iter().take_while(|part| matches!(part, KeyPart::Arg(_))).count()
    }

    /// Positional arguments in call order
    pub fn args(&self) -> impl Iterator<Item = &ArgValue> + '_ {
        self.parts.iter().filter_map(|part| match part {
            KeyPart::Arg(value) => Some(value),
            _ => None,
        })
    }

    /// Keyword arguments in name order
    pub fn kwargs(&self) -> impl Iterator<Item = (&str, &ArgValue)> + '_ {
        self.parts.iter().filter_map(|part| match part {
            KeyPart::Keyword(name, value) => Some((name.as_str(), value)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_types_are_distinct() {
        let int = CallKey::new("f").arg(1i64);
        let float = CallKey::new("f").arg(1.0f64);
        let boolean = CallKey::new("f").arg(true);
        let narrow = CallKey::new("f").arg(1i32);

        assert_ne!(int, float);
        assert_ne!(int, boolean);
        assert_ne!(int, narrow);
        assert_ne!(float, CallKey::new("f").arg(1.0f32));
    }

    #[test]
    fn test_negative_zero_folds_into_zero() {
        assert_eq!(CallKey::new("f").arg(-0.0f64), CallKey::new("f").arg(0.0f64));
    }

    #[test]
    fn test_positional_order_matters() {
        assert_ne!(CallKey::new("f").arg(1u8).arg(2u8), CallKey::new("f").arg(2u8).arg(1u8));
    }

    #[test]
    fn test_keyword_order_does_not_matter() {
        let a = CallKey::new("f").kwarg("limit", 10u32).kwarg("user", "me");
        let b = CallKey::new("f").kwarg("user", "me").kwarg("limit", 10u32);
        assert_eq!(a, b);
        assert_eq!(a.kwargs().map(|(name, _)| name).collect::<Vec<_>>(), vec!["limit", "user"]);
    }

    #[test]
    fn test_rebinding_a_keyword_replaces_it() {
        let key = CallKey::new("f").kwarg("limit", 10u32).kwarg("limit", 20u32);
        assert_eq!(key.kwargs().collect::<Vec<_>>(), vec![("limit", &ArgValue::U32(20))]);
    }

    #[test]
    fn test_positional_and_keyword_never_alias() {
        let positional = CallKey::new("f").arg("limit").arg(10u32);
        let keyword = CallKey::new("f").kwarg("limit", 10u32);
        assert_ne!(positional, keyword);

        // A trailing positional argument stays ahead of the keyword mark
        let mixed = CallKey::new("f").kwarg("limit", 10u32).arg(1u8);
        assert_eq!(mixed, CallKey::new("f").arg(1u8).kwarg("limit", 10u32));
        assert_eq!(mixed.positional_len(), 1);
    }

    #[test]
    fn test_function_identity_is_part_of_the_key() {
        assert_ne!(CallKey::new("a::f").arg(1u8), CallKey::new("b::f").arg(1u8));
    }

    #[test]
    fn test_tuple_args() {
        let key = CallKey::for_call("f", &("x", 2u16, Some(3.5f64)));
        assert_eq!(
            key.args().cloned().collect::<Vec<_>>(),
            vec![
                ArgValue::Str("x".to_string()),
                ArgValue::U16(2),
                ArgValue::Opt(Some(Box::new(ArgValue::f64(3.5)))),
            ]
        );
        assert_eq!(CallKey::for_call("f", &()), CallKey::new("f"));
    }

    #[test]
    fn test_str_and_string_share_a_key() {
        assert_eq!(CallKey::new("f").arg("x"), CallKey::new("f").arg("x".to_string()));
        assert_eq!(CallKey::new("f").arg(vec![1u8, 2]), CallKey::new("f").arg(&[1u8, 2][..]));
        assert_ne!(CallKey::new("f").arg(vec![1u8, 2]), CallKey::new("f").arg(ArgValue::bytes([1u8, 2])));
    }
}

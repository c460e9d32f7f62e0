//! The closed type family: `int`, `char`, pointers, and fixed arrays.
//!
//! Two sizes exist per type. `size` is the referenced-value size (what a
//! load or a data directive covers); `storage` is the in-frame slot size
//! (what a declaration reserves and what `sizeof` reports). `int` values are
//! 4 bytes wide but occupy an 8-byte slot; pointer arithmetic scales by the
//! pointee's storage.

use std::fmt;

/// A value type. `Int` and `Char` are the canonical singletons; pointers and
/// arrays are built with [`Type::pointer_to`] and [`Type::array_of`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Char,
    Pointer(Box<Type>),
    Array(Box<Type>, usize),
}

impl Type {
    pub fn pointer_to(base: Type) -> Type {
        Type::Pointer(Box::new(base))
    }

    pub fn array_of(base: Type, length: usize) -> Type {
        Type::Array(Box::new(base), length)
    }

    /// Referenced-value size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::Char => 1,
            Type::Pointer(_) => 8,
            Type::Array(base, len) => base.size() * len,
        }
    }

    /// In-frame storage size in bytes. This is also what `sizeof` yields.
    pub fn storage(&self) -> usize {
        match self {
            Type::Int => 8,
            Type::Char => 1,
            Type::Pointer(_) => 8,
            Type::Array(base, len) => base.storage() * len,
        }
    }

    /// Alignment unit used while accumulating frame offsets.
    pub fn align(&self) -> usize {
        match self {
            Type::Int | Type::Pointer(_) => 8,
            Type::Char => 1,
            Type::Array(base, _) => base.align(),
        }
    }

    /// The pointee for pointers, the element type for arrays.
    pub fn base(&self) -> Option<&Type> {
        match self {
            Type::Pointer(base) | Type::Array(base, _) => Some(base),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Int | Type::Char)
    }

    /// Can a value of `rhs` be stored into a slot of this type?
    ///
    /// Integer types convert freely between each other. A pointer accepts a
    /// pointer of the same base, and an array of the same base (decay).
    /// Arrays accept nothing here; their initializer forms (string literals,
    /// array literals) are validated at the declaration site where the
    /// literal's length is known.
    pub fn can_assign(&self, rhs: &Type) -> bool {
        match self {
            Type::Int | Type::Char => rhs.is_integral(),
            Type::Pointer(base) => match rhs {
                Type::Pointer(rbase) | Type::Array(rbase, _) => base.as_ref() == rbase.as_ref(),
                _ => false,
            },
            Type::Array(..) => false,
        }
    }

    /// Can a value of `rhs` appear on the right of `+` or `-` under this
    /// left type? Integer arithmetic, plus `ptr ± int` / `array ± int`.
    pub fn can_add(&self, rhs: &Type) -> bool {
        match self {
            Type::Int | Type::Char => rhs.is_integral(),
            Type::Pointer(_) | Type::Array(..) => rhs.is_integral(),
        }
    }

    /// Can a value of `rhs` appear on the right of `*` or `/` under this
    /// left type? Both sides must be integral; pointers cannot be multiplied
    /// or divided.
    pub fn can_mul(&self, rhs: &Type) -> bool {
        self.is_integral() && rhs.is_integral()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Char => write!(f, "char"),
            Type::Pointer(base) => write!(f, "{}*", base),
            Type::Array(base, len) => write!(f, "{}[{}]", base, len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(Type::Int.size(), 4);
        assert_eq!(Type::Int.storage(), 8);
        assert_eq!(Type::Char.size(), 1);
        assert_eq!(Type::Char.storage(), 1);
        assert_eq!(Type::pointer_to(Type::Int).size(), 8);
        assert_eq!(Type::array_of(Type::Int, 3).size(), 12);
        assert_eq!(Type::array_of(Type::Int, 3).storage(), 24);
        assert_eq!(Type::array_of(Type::Char, 6).storage(), 6);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::Int.to_string(), "int");
        assert_eq!(Type::pointer_to(Type::Int).to_string(), "int*");
        assert_eq!(
            Type::pointer_to(Type::pointer_to(Type::Char)).to_string(),
            "char**"
        );
        assert_eq!(Type::array_of(Type::Int, 3).to_string(), "int[3]");
    }

    #[test]
    fn test_can_assign() {
        let int_ptr = Type::pointer_to(Type::Int);
        assert!(Type::Int.can_assign(&Type::Int));
        assert!(Type::Int.can_assign(&Type::Char));
        assert!(Type::Char.can_assign(&Type::Int));
        assert!(!Type::Int.can_assign(&int_ptr));
        assert!(int_ptr.can_assign(&int_ptr));
        assert!(!int_ptr.can_assign(&Type::pointer_to(Type::Char)));
        // Array decays to a pointer of the same base.
        assert!(int_ptr.can_assign(&Type::array_of(Type::Int, 4)));
        assert!(!Type::pointer_to(Type::Char).can_assign(&Type::array_of(Type::Int, 4)));
    }

    #[test]
    fn test_can_add_and_mul() {
        let int_ptr = Type::pointer_to(Type::Int);
        let arr = Type::array_of(Type::Int, 3);
        assert!(Type::Int.can_add(&Type::Int));
        assert!(int_ptr.can_add(&Type::Int));
        assert!(arr.can_add(&Type::Char));
        assert!(!Type::Int.can_add(&int_ptr));
        assert!(Type::Int.can_mul(&Type::Int));
        assert!(!int_ptr.can_mul(&Type::Int));
        assert!(!Type::Int.can_mul(&int_ptr));
    }
}

//! Value types, constants and built-in operations.
use std::fmt::Display;

/// The type of a value produced by a dependency node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    UInt(u32),
    SInt(u32),
    Bits(u32),
}

impl Type {
    pub fn width(&self) -> u32 {
        match self {
            Type::Bool => 1,
            Type::UInt(w) | Type::SInt(w) | Type::Bits(w) => *w,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::SInt(_))
    }

    /// A cast between two types of equal width only reinterprets bits.
    pub fn is_trivial_cast_to(&self, other: &Type) -> bool {
        self.width() == other.width()
    }

    /// The type of the same kind with a different width. Resizing a `Bool`
    /// yields bits.
    pub fn with_width(&self, width: u32) -> Type {
        match self {
            Type::Bool if width == 1 => Type::Bool,
            Type::Bool | Type::Bits(_) => Type::Bits(width),
            Type::UInt(_) => Type::UInt(width),
            Type::SInt(_) => Type::SInt(width),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bool => write!(f, "Bool"),
            Type::UInt(w) => write!(f, "UInt<{w}>"),
            Type::SInt(w) => write!(f, "SInt<{w}>"),
            Type::Bits(w) => write!(f, "Bits<{w}>"),
        }
    }
}

/// A constant value. The value is always normalized to the width of its type:
/// unsigned types hold the zero-extended bits, signed types the sign-extended
/// bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Constant {
    value: i128,
    ty: Type,
}

impl Constant {
    pub fn new(value: i128, ty: Type) -> Self {
        Self {
            value: normalize(value, ty),
            ty,
        }
    }

    pub fn bool(b: bool) -> Self {
        Self::new(b as i128, Type::Bool)
    }

    pub fn value(&self) -> i128 {
        self.value
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// The same value reinterpreted at `ty`. Signed constants are
    /// sign-extended, all others zero-extended.
    pub fn cast_to(&self, ty: Type) -> Self {
        Self::new(self.value, ty)
    }

    /// Bits `hi` down to `lo` of the value.
    pub fn slice(&self, hi: u32, lo: u32, ty: Type) -> Self {
        let shifted = if lo >= 128 { 0 } else { self.value >> lo };
        Self::new(truncate(shifted, hi.saturating_sub(lo) + 1), ty)
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ty {
            Type::Bool => write!(f, "{}", self.value != 0),
            ty => write!(f, "{}: {}", self.value, ty),
        }
    }
}

/// Keep the low `width` bits of `value`, zero-extended.
fn truncate(value: i128, width: u32) -> i128 {
    if width >= 127 {
        value
    } else {
        value & ((1i128 << width) - 1)
    }
}

fn normalize(value: i128, ty: Type) -> i128 {
    let width = ty.width();
    let bits = truncate(value, width);
    if ty.is_signed() && width > 0 && width < 127 && (bits >> (width - 1)) & 1 == 1
    {
        bits - (1i128 << width)
    } else {
        bits
    }
}

/// Built-in operations available to behavior descriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltIn {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Not,
    Neg,
    /// Logical shift left
    Lsl,
    /// Logical shift right
    Lsr,
    /// Arithmetic shift right
    Asr,
    Equ,
    Neq,
    Ult,
    Ule,
    Slt,
    Sle,
}

impl BuiltIn {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltIn::Add => "add",
            BuiltIn::Sub => "sub",
            BuiltIn::Mul => "mul",
            BuiltIn::And => "and",
            BuiltIn::Or => "or",
            BuiltIn::Xor => "xor",
            BuiltIn::Not => "not",
            BuiltIn::Neg => "neg",
            BuiltIn::Lsl => "lsl",
            BuiltIn::Lsr => "lsr",
            BuiltIn::Asr => "asr",
            BuiltIn::Equ => "equ",
            BuiltIn::Neq => "neq",
            BuiltIn::Ult => "ult",
            BuiltIn::Ule => "ule",
            BuiltIn::Slt => "slt",
            BuiltIn::Sle => "sle",
        }
    }

    /// Number of arguments the operation takes.
    pub fn arity(&self) -> usize {
        match self {
            BuiltIn::Not | BuiltIn::Neg => 1,
            _ => 2,
        }
    }

    /// Comparisons produce a `Bool`.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BuiltIn::Equ
                | BuiltIn::Neq
                | BuiltIn::Ult
                | BuiltIn::Ule
                | BuiltIn::Slt
                | BuiltIn::Sle
        )
    }

    /// Evaluate the operation on constant arguments, producing a value of
    /// type `ty`. Returns `None` when the arity does not match.
    pub fn eval(&self, args: &[Constant], ty: Type) -> Option<Constant> {
        if args.len() != self.arity() {
            return None;
        }
        let a = args[0];
        let unsigned = |c: &Constant| truncate(c.value, c.ty.width());
        let signed = |c: &Constant| normalize(c.value, Type::SInt(c.ty.width()));
        let value = match self {
            BuiltIn::Not => !a.value,
            BuiltIn::Neg => a.value.wrapping_neg(),
            op => {
                let b = args[1];
                let shift = u32::try_from(unsigned(&b)).unwrap_or(u32::MAX);
                match op {
                    BuiltIn::Add => a.value.wrapping_add(b.value),
                    BuiltIn::Sub => a.value.wrapping_sub(b.value),
                    BuiltIn::Mul => a.value.wrapping_mul(b.value),
                    BuiltIn::And => a.value & b.value,
                    BuiltIn::Or => a.value | b.value,
                    BuiltIn::Xor => a.value ^ b.value,
                    BuiltIn::Lsl => a.value.checked_shl(shift).unwrap_or(0),
                    BuiltIn::Lsr => unsigned(&a).checked_shr(shift).unwrap_or(0),
                    BuiltIn::Asr => {
                        let s = signed(&a);
                        s.checked_shr(shift).unwrap_or(if s < 0 { -1 } else { 0 })
                    }
                    BuiltIn::Equ => (unsigned(&a) == unsigned(&b)) as i128,
                    BuiltIn::Neq => (unsigned(&a) != unsigned(&b)) as i128,
                    BuiltIn::Ult => (unsigned(&a) < unsigned(&b)) as i128,
                    BuiltIn::Ule => (unsigned(&a) <= unsigned(&b)) as i128,
                    BuiltIn::Slt => (signed(&a) < signed(&b)) as i128,
                    BuiltIn::Sle => (signed(&a) <= signed(&b)) as i128,
                    BuiltIn::Not | BuiltIn::Neg => unreachable!(),
                }
            }
        };
        Some(Constant::new(value, ty))
    }
}

impl Display for BuiltIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

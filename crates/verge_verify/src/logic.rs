//! SMT logic selection: integer or bitvector arithmetic.
//!
//! Integer mode models values as unbounded `Int`s with bound constraints;
//! bitvector mode models them as 64-bit vectors, which some solvers
//! decide much faster at the cost of wraparound semantics at the extremes.

use num_bigint::BigInt;
use num_traits::Signed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicMode {
    Integer,
    BitVector,
}

/// Operator and sort spellings for the selected mode.
#[derive(Debug, Clone, Copy)]
pub struct Logic {
    mode: LogicMode,
}

impl Logic {
    pub fn new(mode: LogicMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> LogicMode {
        self.mode
    }

    pub fn integer_type(&self) -> &'static str {
        match self.mode {
            LogicMode::Integer => "Int",
            LogicMode::BitVector => "(_ BitVec 64)",
        }
    }

    pub fn numeric_literal(&self, value: &BigInt) -> String {
        match self.mode {
            LogicMode::Integer => {
                if value.is_negative() {
                    format!("(- {})", -value)
                } else {
                    value.to_string()
                }
            }
            LogicMode::BitVector => {
                // two's complement wrap into 64 bits
                let modulus = BigInt::from(1u8) << 64;
                let wrapped = ((value % &modulus) + &modulus) % &modulus;
                format!("(_ bv{} 64)", wrapped)
            }
        }
    }

    pub fn add(&self) -> &'static str {
        self.pick("+", "bvadd")
    }

    pub fn sub(&self) -> &'static str {
        self.pick("-", "bvsub")
    }

    pub fn mul(&self) -> &'static str {
        self.pick("*", "bvmul")
    }

    pub fn div(&self) -> &'static str {
        self.pick("div", "bvsdiv")
    }

    pub fn modulo(&self) -> &'static str {
        self.pick("mod", "bvsrem")
    }

    pub fn neg(&self) -> &'static str {
        self.pick("-", "bvneg")
    }

    pub fn lt(&self) -> &'static str {
        self.pick("<", "bvslt")
    }

    pub fn leq(&self) -> &'static str {
        self.pick("<=", "bvsle")
    }

    pub fn gt(&self) -> &'static str {
        self.pick(">", "bvsgt")
    }

    pub fn geq(&self) -> &'static str {
        self.pick(">=", "bvsge")
    }

    fn pick(&self, int: &'static str, bv: &'static str) -> &'static str {
        match self.mode {
            LogicMode::Integer => int,
            LogicMode::BitVector => bv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals_parenthesize_negatives() {
        let logic = Logic::new(LogicMode::Integer);
        assert_eq!(logic.numeric_literal(&BigInt::from(5)), "5");
        assert_eq!(logic.numeric_literal(&BigInt::from(-5)), "(- 5)");
    }

    #[test]
    fn bitvector_literals_wrap_twos_complement() {
        let logic = Logic::new(LogicMode::BitVector);
        assert_eq!(logic.numeric_literal(&BigInt::from(5)), "(_ bv5 64)");
        assert_eq!(
            logic.numeric_literal(&BigInt::from(-1)),
            "(_ bv18446744073709551615 64)"
        );
    }

    #[test]
    fn operator_spellings_differ_by_mode() {
        assert_eq!(Logic::new(LogicMode::Integer).div(), "div");
        assert_eq!(Logic::new(LogicMode::BitVector).div(), "bvsdiv");
    }
}

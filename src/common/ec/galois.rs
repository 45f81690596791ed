use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

// Galois field element of GF(256) with primitive polynomial 0x11D
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct G(pub u8);

impl G {
    // Power of the generator α
    #[inline]
    pub fn gen_pow(i: usize) -> Self {
        Self(EXP_TABLE[i % 255])
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    fn log(self) -> usize {
        debug_assert!(self.0 != 0, "Log of zero is undefined");
        LOG_TABLE[self.0 as usize] as usize
    }

    pub fn inv(self) -> Self {
        debug_assert!(self.0 != 0, "Zero has no inverse");
        Self(EXP_TABLE[(255 - self.log()) % 255])
    }
}

impl From<G> for u8 {
    fn from(g: G) -> Self {
        g.0
    }
}

impl Add for G {
    type Output = Self;
    #[allow(clippy::suspicious_arithmetic_impl)]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl AddAssign for G {
    #[allow(clippy::suspicious_op_assign_impl)]
    fn add_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0;
    }
}

impl Sub for G {
    type Output = Self;
    #[allow(clippy::suspicious_arithmetic_impl)]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl Mul for G {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        if self.is_zero() || rhs.is_zero() {
            return Self(0);
        }
        Self(EXP_TABLE[(self.log() + rhs.log()) % 255])
    }
}

impl MulAssign for G {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Div for G {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        debug_assert!(!rhs.is_zero(), "Division by zero");
        if self.is_zero() {
            return Self(0);
        }
        Self(EXP_TABLE[(self.log() + 255 - rhs.log()) % 255])
    }
}

// Horner evaluation with coefficients listed from the lowest power up
pub fn eval_poly<'a>(poly: impl DoubleEndedIterator<Item = &'a G>, x: G) -> G {
    poly.rev().fold(G(0), |acc, &c| acc * x + c)
}

// Coefficients of Π(x - α^i) for i in 0..degree, highest power first.
// The leading coefficient is always 1 and is dropped.
pub fn generator_polynomial(degree: usize) -> Vec<G> {
    let mut poly = vec![G(1)];
    for i in 0..degree {
        let root = G::gen_pow(i);
        let mut next = vec![G(0); poly.len() + 1];
        for (j, &c) in poly.iter().enumerate() {
            next[j] += c;
            next[j + 1] += c * root;
        }
        poly = next;
    }
    poly.split_off(1)
}


// Global constants
//------------------------------------------------------------------------------

const fn build_exp_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 256 {
        table[i] = x as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= 0x11D;
        }
        i += 1;
    }
    table
}

const fn build_log_table() -> [u8; 256] {
    let exp = build_exp_table();
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 255 {
        table[exp[i] as usize] = i as u8;
        i += 1;
    }
    table
}

pub static EXP_TABLE: [u8; 256] = build_exp_table();

pub static LOG_TABLE: [u8; 256] = build_log_table();

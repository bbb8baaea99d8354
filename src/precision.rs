use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KernelError, KernelResult};
use crate::quant::{ElemKind, QuantElem};

/// Matrix, vector and output storage types of one kernel family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Precision {
    pub mat: ElemKind,
    pub vec: ElemKind,
    pub out: ElemKind,
}

const fn p(mat: ElemKind, vec: ElemKind, out: ElemKind) -> Precision { Precision { mat, vec, out } }

/// Families the library ships, by name.
pub const SHIPPED: [(&str, Precision); 5] = [
    ("8x8_8", p(ElemKind::I8, ElemKind::I8, ElemKind::I8)),
    ("8x8_16", p(ElemKind::I8, ElemKind::I8, ElemKind::I16)),
    ("asym8xasym8_asym8", p(ElemKind::U8, ElemKind::U8, ElemKind::U8)),
    ("8x16_16", p(ElemKind::I8, ElemKind::I16, ElemKind::I16)),
    ("16x16_16", p(ElemKind::I16, ElemKind::I16, ElemKind::I16)),
];

impl Precision {
    pub fn of<M: QuantElem, V: QuantElem, O: QuantElem>() -> Self { p(M::KIND, V::KIND, O::KIND) }

    pub fn by_name(name: &str) -> Option<Self> {
        SHIPPED.iter().find(|(n, _)| *n == name).map(|(_, p)| *p)
    }

    pub fn name(&self) -> Option<&'static str> {
        SHIPPED.iter().find(|(_, p)| p == self).map(|(n, _)| *n)
    }

    pub fn ensure_shipped(&self) -> KernelResult<()> {
        match self.name() {
            Some(_) => Ok(()),
            None => Err(KernelError::NotImplemented(format!("precision {}", self))),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}->{}", self.mat, self.vec, self.out)
    }
}

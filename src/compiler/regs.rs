//! The fixed pool of 15 register slots.

use crate::asm::{Reg, NUM_REGISTERS};
use crate::error::ErrorKind;

#[derive(Clone, Copy, Default, Debug)]
struct Slot {
    allocated: bool,
    temporary: bool,
}

/// Allocation state for every register. Operands reference slots by index;
/// the pool itself is owned by the function compiler for the whole lowering.
#[derive(Debug)]
pub struct RegFile {
    slots: [Slot; NUM_REGISTERS],
}

impl RegFile {
    /// Reserves the first `permanent` slots for named locals (and unnamed
    /// parameters); the remainder of the file serves temporaries.
    pub fn new(permanent: usize) -> Result<Self, ErrorKind> {
        if permanent > NUM_REGISTERS {
            return Err(ErrorKind::TooManyVars);
        }
        let mut slots = [Slot::default(); NUM_REGISTERS];
        for (i, slot) in slots.iter_mut().enumerate() {
            if i < permanent {
                slot.allocated = true;
            } else {
                slot.temporary = true;
            }
        }
        Ok(RegFile { slots })
    }

    /// Claims the first free temporary slot.
    pub fn alloc_temp(&mut self) -> Result<Reg, ErrorKind> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.temporary && !slot.allocated {
                slot.allocated = true;
                return Ok(Reg(i as u8));
            }
        }
        Err(ErrorKind::OutOfTempRegisters)
    }

    /// Returns a temporary to the pool. Permanent registers stay allocated
    /// for the remainder of the compilation, so releasing one is a no-op.
    pub fn release(&mut self, reg: Reg) {
        let slot = &mut self.slots[reg.0 as usize];
        if slot.temporary {
            slot.allocated = false;
        }
    }

    pub fn is_temp(&self, reg: Reg) -> bool {
        self.slots[reg.0 as usize].temporary
    }

    #[cfg(test)]
    fn allocated_count(&self) -> usize {
        self.slots.iter().filter(|s| s.allocated).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanents_occupy_low_ids() {
        let mut regs = RegFile::new(3).unwrap();
        assert!(!regs.is_temp(Reg(0)));
        assert!(!regs.is_temp(Reg(2)));
        assert!(regs.is_temp(Reg(3)));
        // first temporary comes right after the permanents
        assert_eq!(regs.alloc_temp().unwrap(), Reg(3));
        assert_eq!(regs.alloc_temp().unwrap(), Reg(4));
    }

    #[test]
    fn released_temporaries_are_reused() {
        let mut regs = RegFile::new(0).unwrap();
        let a = regs.alloc_temp().unwrap();
        let b = regs.alloc_temp().unwrap();
        assert_eq!(a, Reg(0));
        assert_eq!(b, Reg(1));
        regs.release(a);
        assert_eq!(regs.alloc_temp().unwrap(), Reg(0));
    }

    #[test]
    fn releasing_a_permanent_is_a_noop() {
        let mut regs = RegFile::new(2).unwrap();
        regs.release(Reg(0));
        assert_eq!(regs.allocated_count(), 2);
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut regs = RegFile::new(14).unwrap();
        assert!(regs.alloc_temp().is_ok());
        assert_eq!(regs.alloc_temp().unwrap_err(), ErrorKind::OutOfTempRegisters);
    }

    #[test]
    fn sixteen_locals_do_not_fit() {
        assert_eq!(RegFile::new(16).unwrap_err(), ErrorKind::TooManyVars);
        assert!(RegFile::new(15).is_ok());
    }
}

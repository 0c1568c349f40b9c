//! Hardware User Memory Probe (AArch64)
//!
//! Asks the MMU whether EL0 could perform the access (`AT S1E0R` /
//! `AT S1E0W`) and only then touches the byte with an unprivileged
//! load/store (`LDTRB` / `STTRB`). A failed translation shows up in
//! `PAR_EL1.F` instead of raising a data abort.

use core::arch::asm;

use super::address::UserAddr;
use super::user::{Fault, UserMemory};

/// PAR_EL1.F: translation aborted
const PAR_FAULT: u64 = 1 << 0;

/// User memory of the session currently installed in TTBR0_EL1.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbedUserMemory;

impl UserMemory for ProbedUserMemory {
    fn probe_read(&self, addr: UserAddr) -> Result<u8, Fault> {
        if !translates(addr, false) {
            return Err(Fault::NotMapped(addr.as_usize()));
        }
        let value: u32;
        // SAFETY:
        // - The stage 1 EL0 read translation for this address just succeeded
        // - LDTRB performs the access with EL0 permissions
        unsafe {
            asm!(
                "ldtrb {v:w}, [{a}]",
                v = out(reg) value,
                a = in(reg) addr.as_ptr(),
                options(nostack, readonly, preserves_flags)
            );
        }
        Ok(value as u8)
    }

    fn probe_write(&self, addr: UserAddr, byte: u8) -> Result<(), Fault> {
        if !translates(addr, false) {
            return Err(Fault::NotMapped(addr.as_usize()));
        }
        if !translates(addr, true) {
            return Err(Fault::ReadOnly(addr.as_usize()));
        }
        // SAFETY:
        // - The stage 1 EL0 write translation for this address just succeeded
        // - STTRB performs the access with EL0 permissions
        unsafe {
            asm!(
                "sttrb {v:w}, [{a}]",
                v = in(reg) byte as u32,
                a = in(reg) addr.as_mut_ptr(),
                options(nostack, preserves_flags)
            );
        }
        Ok(())
    }
}

/// Run an EL0 stage 1 translation and report whether it succeeded.
fn translates(addr: UserAddr, write: bool) -> bool {
    let par: u64;
    // SAFETY: AT only updates PAR_EL1; it never faults
    unsafe {
        if write {
            asm!(
                "at s1e0w, {a}",
                "isb",
                "mrs {p}, par_el1",
                a = in(reg) addr.as_usize(),
                p = out(reg) par,
                options(nostack, preserves_flags)
            );
        } else {
            asm!(
                "at s1e0r, {a}",
                "isb",
                "mrs {p}, par_el1",
                a = in(reg) addr.as_usize(),
                p = out(reg) par,
                options(nostack, preserves_flags)
            );
        }
    }
    par & PAR_FAULT == 0
}

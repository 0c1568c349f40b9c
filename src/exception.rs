//! ARM64 Exception Entry for User Programs
//!
//! Receives synchronous exceptions taken from EL0 and hands system calls
//! to the registered [`SyscallEntry`].
//!
//! # Exception Levels
//! - EL0: User applications
//! - EL1: Kernel (where we run)
//!
//! # Routing
//! - `SVC #0x30` from EL0: system call
//! - Any other SVC immediate, or a data/instruction abort from EL0:
//!   the session is terminated with status -1
//! - Anything taken at EL1: logged, CPU halted
//!
//! The vector table itself lives in the kernel image; it saves a
//! [`TrapFrame`] and calls the `extern "C"` handlers below.

use spin::Once;

/// SVC immediate reserved for system calls.
pub const SYSCALL_VECTOR: u16 = 0x30;

/// Register state saved on the kernel stack at exception entry
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TrapFrame {
    /// General purpose registers x0-x30
    pub gpr: [u64; 31],
    /// User stack pointer (SP_EL0)
    pub sp: u64,
    /// Exception Link Register (return address)
    pub elr: u64,
    /// Saved Program Status Register
    pub spsr: u64,
    /// Exception Syndrome Register
    pub esr: u64,
    /// Fault Address Register
    pub far: u64,
}

impl TrapFrame {
    /// A frame with every register cleared.
    pub const fn zeroed() -> Self {
        Self {
            gpr: [0; 31],
            sp: 0,
            elr: 0,
            spsr: 0,
            esr: 0,
            far: 0,
        }
    }

    /// The trapped user stack pointer.
    #[inline]
    pub const fn user_sp(&self) -> usize {
        self.sp as usize
    }

    /// Store a system call result in x0, sign-extended.
    #[inline]
    pub fn set_return(&mut self, value: i32) {
        self.gpr[0] = value as i64 as u64;
    }

    /// Exception class from ESR.
    #[inline]
    pub fn class(&self) -> ExceptionClass {
        ExceptionClass::from(self.esr)
    }

    /// SVC immediate (ESR.ISS[15:0]); only meaningful for SVC exceptions.
    #[inline]
    pub const fn svc_imm(&self) -> u16 {
        (self.esr & 0xFFFF) as u16
    }
}

/// Exception class extracted from ESR_EL1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionClass {
    Unknown = 0x00,
    SvcAarch64 = 0x15,
    InstructionAbortLowerEl = 0x20,
    InstructionAbortSameEl = 0x21,
    DataAbortLowerEl = 0x24,
    DataAbortSameEl = 0x25,
    Other = 0xFF,
}

impl From<u64> for ExceptionClass {
    fn from(esr: u64) -> Self {
        let ec = ((esr >> 26) & 0x3F) as u8;
        match ec {
            0x00 => ExceptionClass::Unknown,
            0x15 => ExceptionClass::SvcAarch64,
            0x20 => ExceptionClass::InstructionAbortLowerEl,
            0x21 => ExceptionClass::InstructionAbortSameEl,
            0x24 => ExceptionClass::DataAbortLowerEl,
            0x25 => ExceptionClass::DataAbortSameEl,
            _ => ExceptionClass::Other,
        }
    }
}

/// The system call subsystem as seen from the exception vectors.
pub trait SyscallEntry: Sync {
    /// Handle a system call trap; returns when the caller is resumed.
    fn handle_trap(&self, frame: &mut TrapFrame);

    /// Terminate the trapping session after an illegal exception.
    fn abort_current(&self, frame: &TrapFrame) -> !;
}

static SYSCALL_ENTRY: Once<&'static dyn SyscallEntry> = Once::new();

/// Register the system call subsystem. Later calls are ignored.
pub fn install(entry: &'static dyn SyscallEntry) {
    SYSCALL_ENTRY.call_once(|| entry);
    log::info!("exception: system call entry installed (svc #{:#x})", SYSCALL_VECTOR);
}

/// What a lower-EL synchronous exception should turn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapKind {
    /// A system call.
    Syscall,
    /// The session must be terminated.
    Abort,
}

/// Classify a synchronous exception taken from EL0.
pub fn classify(frame: &TrapFrame) -> TrapKind {
    match frame.class() {
        ExceptionClass::SvcAarch64 if frame.svc_imm() == SYSCALL_VECTOR => TrapKind::Syscall,
        _ => TrapKind::Abort,
    }
}

/// Route a synchronous exception from EL0.
pub fn handle_lower_el_sync(frame: &mut TrapFrame) {
    let Some(entry) = SYSCALL_ENTRY.get() else {
        log::error!("exception: trap from EL0 before system call entry was installed");
        halt();
    };

    match classify(frame) {
        TrapKind::Syscall => entry.handle_trap(frame),
        TrapKind::Abort => {
            log::warn!(
                "exception: EL0 {:?} at {:#x}, ESR {:#x}",
                frame.class(),
                frame.far,
                frame.esr
            );
            entry.abort_current(frame)
        }
    }
}

/// Handle synchronous exception from lower EL (user mode)
///
/// # Safety
/// Called from the assembly vector with a valid frame pointer.
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
#[no_mangle]
pub extern "C" fn handle_sync_exception_lower_el(frame: &mut TrapFrame) {
    handle_lower_el_sync(frame);
}

/// Handle synchronous exception from current EL (kernel mode)
///
/// This should never happen while servicing a system call.
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
#[no_mangle]
pub extern "C" fn handle_sync_exception_same_el(frame: &TrapFrame) {
    log::error!(
        "exception: kernel {:?} ESR {:#018x} ELR {:#018x} FAR {:#018x}",
        frame.class(),
        frame.esr,
        frame.elr,
        frame.far
    );
    halt();
}

/// Halt the CPU
fn halt() -> ! {
    loop {
        #[cfg(target_arch = "aarch64")]
        // SAFETY: WFI is always safe
        unsafe {
            core::arch::asm!("wfi", options(nostack, nomem));
        }
        #[cfg(not(target_arch = "aarch64"))]
        core::hint::spin_loop();
    }
}

//! PL011 UART Driver for QEMU virt machine
//!
//! Backs the kernel [`Console`]: user writes to descriptor 1, reads from
//! descriptor 0, and the log output all go through this device.
//!
//! # Memory Map (QEMU virt)
//! - Base address: 0x0900_0000
//! - Register size: 0x1000 bytes
//!
//! # Security Considerations
//! - Unsafe code is limited to the two MMIO registers
//! - Uses spinlock for thread-safe access

use spin::Mutex;

use super::console::Console;

/// QEMU virt machine PL011 UART base address
const UART_BASE: usize = 0x0900_0000;

/// PL011 Register offsets
mod regs {
    /// Data Register - read/write data
    pub const DR: usize = 0x00;
    /// Flag Register - status flags
    pub const FR: usize = 0x18;
}

/// Flag Register bits
mod flags {
    /// Receive FIFO empty
    pub const RXFE: u32 = 1 << 4;
    /// Transmit FIFO full
    pub const TXFF: u32 = 1 << 5;
}

/// PL011 UART driver
pub struct Uart {
    base: usize,
    initialized: bool,
}

impl Uart {
    /// Create a new UART instance (not yet initialized)
    pub const fn new(base: usize) -> Self {
        Self {
            base,
            initialized: false,
        }
    }

    /// Initialize the UART
    ///
    /// # Safety
    /// - Must only be called once
    /// - UART base address must be valid and mapped
    pub unsafe fn init(&mut self) {
        // PL011 is already initialized by QEMU, just mark as ready
        self.initialized = true;
    }

    /// Write a single byte to the UART
    fn write_byte(&self, byte: u8) {
        if !self.initialized {
            return;
        }

        // SAFETY: Base address is validated during init()
        // The write is to a known MMIO register
        unsafe {
            let fr = (self.base + regs::FR) as *const u32;
            let dr = (self.base + regs::DR) as *mut u32;

            while core::ptr::read_volatile(fr) & flags::TXFF != 0 {
                core::hint::spin_loop();
            }

            core::ptr::write_volatile(dr, byte as u32);
        }
    }

    /// Read a byte if the receive FIFO has one
    fn try_read_byte(&self) -> Option<u8> {
        if !self.initialized {
            return None;
        }

        // SAFETY: Same registers as write_byte
        unsafe {
            let fr = (self.base + regs::FR) as *const u32;
            let dr = (self.base + regs::DR) as *const u32;

            if core::ptr::read_volatile(fr) & flags::RXFE != 0 {
                return None;
            }

            Some(core::ptr::read_volatile(dr) as u8)
        }
    }

    /// Write raw bytes, expanding `\n` to `\r\n`
    pub fn write_bytes(&self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }
}

impl Console for Mutex<Uart> {
    fn write_chunk(&self, bytes: &[u8]) {
        self.lock().write_bytes(bytes);
    }

    fn read_byte(&self) -> u8 {
        // Poll without holding the lock so output is never blocked on input
        loop {
            if let Some(byte) = self.lock().try_read_byte() {
                return byte;
            }
            core::hint::spin_loop();
        }
    }
}

/// Global UART instance protected by spinlock
pub static UART: Mutex<Uart> = Mutex::new(Uart::new(UART_BASE));

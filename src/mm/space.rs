//! Software User Address Space
//!
//! A page-granular map of user memory kept entirely in kernel data
//! structures. Accesses are checked against per-page flags the same way
//! the MMU checks EL0 accesses, so a missing or kernel-only page yields a
//! [`Fault`] instead of a data abort.
//!
//! Used for hosted runs of the system call layer and by the tests.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use bitflags::bitflags;
use spin::Mutex;

use super::address::{UserAddr, PAGE_SIZE};
use super::user::{Fault, UserMemory};

bitflags! {
    /// Access rights of a user page.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u8 {
        /// Accessible from EL0.
        const USER = 1 << 0;
        /// Writable (reads are always allowed on a present page).
        const WRITABLE = 1 << 1;
    }
}

struct Page {
    flags: PageFlags,
    data: Box<[u8]>,
}

impl Page {
    fn zeroed(flags: PageFlags) -> Self {
        Self {
            flags,
            data: alloc::vec![0u8; PAGE_SIZE].into_boxed_slice(),
        }
    }
}

/// A user address space backed by kernel memory.
pub struct UserSpace {
    pages: Mutex<BTreeMap<usize, Page>>,
}

impl UserSpace {
    /// Create an empty address space.
    pub const fn new() -> Self {
        Self {
            pages: Mutex::new(BTreeMap::new()),
        }
    }

    /// Map zeroed pages covering `[base, base + len)`.
    ///
    /// Pages that are already mapped keep their contents and take the new flags.
    pub fn map(&self, base: usize, len: usize, flags: PageFlags) -> Result<(), Fault> {
        let (first, last) = page_span(base, len)?;
        let mut pages = self.pages.lock();
        for vpn in first..=last {
            pages
                .entry(vpn)
                .and_modify(|page| page.flags = flags)
                .or_insert_with(|| Page::zeroed(flags));
        }
        Ok(())
    }

    /// Unmap every page overlapping `[base, base + len)`.
    pub fn unmap(&self, base: usize, len: usize) -> Result<(), Fault> {
        let (first, last) = page_span(base, len)?;
        let mut pages = self.pages.lock();
        for vpn in first..=last {
            pages.remove(&vpn);
        }
        Ok(())
    }

    /// Privileged store into mapped pages, ignoring USER and WRITABLE.
    ///
    /// This is how the loader places arguments on a fresh user stack.
    pub fn poke(&self, addr: usize, bytes: &[u8]) -> Result<(), Fault> {
        let mut pages = self.pages.lock();
        for (i, &byte) in bytes.iter().enumerate() {
            let at = user_addr(addr, i)?;
            let page = pages
                .get_mut(&at.page_number())
                .ok_or(Fault::NotMapped(at.as_usize()))?;
            page.data[at.page_offset()] = byte;
        }
        Ok(())
    }

    /// Privileged load from mapped pages.
    pub fn peek(&self, addr: usize, len: usize) -> Result<Vec<u8>, Fault> {
        let pages = self.pages.lock();
        (0..len)
            .map(|i| {
                let at = user_addr(addr, i)?;
                pages
                    .get(&at.page_number())
                    .map(|page| page.data[at.page_offset()])
                    .ok_or(Fault::NotMapped(at.as_usize()))
            })
            .collect()
    }

    /// Number of mapped pages.
    pub fn mapped_pages(&self) -> usize {
        self.pages.lock().len()
    }
}

impl Default for UserSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl UserMemory for UserSpace {
    fn probe_read(&self, addr: UserAddr) -> Result<u8, Fault> {
        let pages = self.pages.lock();
        match pages.get(&addr.page_number()) {
            Some(page) if page.flags.contains(PageFlags::USER) => {
                Ok(page.data[addr.page_offset()])
            }
            _ => Err(Fault::NotMapped(addr.as_usize())),
        }
    }

    fn probe_write(&self, addr: UserAddr, byte: u8) -> Result<(), Fault> {
        let mut pages = self.pages.lock();
        match pages.get_mut(&addr.page_number()) {
            Some(page) if !page.flags.contains(PageFlags::USER) => {
                Err(Fault::NotMapped(addr.as_usize()))
            }
            Some(page) if !page.flags.contains(PageFlags::WRITABLE) => {
                Err(Fault::ReadOnly(addr.as_usize()))
            }
            Some(page) => {
                page.data[addr.page_offset()] = byte;
                Ok(())
            }
            None => Err(Fault::NotMapped(addr.as_usize())),
        }
    }
}

fn user_addr(base: usize, offset: usize) -> Result<UserAddr, Fault> {
    let addr = base.checked_add(offset).ok_or(Fault::Overflow)?;
    UserAddr::new(addr).ok_or(Fault::KernelAddress(addr))
}

/// First and last page numbers of a non-empty user range.
fn page_span(base: usize, len: usize) -> Result<(usize, usize), Fault> {
    let first = user_addr(base, 0)?;
    let last = user_addr(base, len.saturating_sub(1))?;
    Ok((first.page_number(), last.page_number()))
}

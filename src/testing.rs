//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI32, Ordering};

use spin::Mutex;

use crate::config::SyscallConfig;
use crate::drivers::Console;
use crate::exception::TrapFrame;
use crate::fs::FileSystem;
use crate::mm::{PageFlags, UserSpace, PAGE_SIZE, USER_TOP};
use crate::process::{ProcessControl, SessionId};
use crate::syscall::Syscalls;

/// Filesystem operations recorded by [`MemFs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsCall {
    Open,
    Create,
    Remove,
    Read,
    Write,
    Seek,
    Tell,
    Length,
    Close,
}

struct OpenFile {
    name: String,
    pos: usize,
}

/// A flat in-memory filesystem; open files are numbered handles.
#[derive(Default)]
pub struct MemFs {
    files: BTreeMap<String, Vec<u8>>,
    open: BTreeMap<u32, OpenFile>,
    next_handle: u32,
    closed: Vec<u32>,
    calls: Vec<FsCall>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: &str, contents: &[u8]) {
        self.files.insert(name.to_string(), contents.to_vec());
    }

    pub fn contents(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(|data| data.as_slice())
    }

    pub fn name_of(&self, handle: u32) -> Option<&str> {
        self.open.get(&handle).map(|file| file.name.as_str())
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn closed(&self) -> &[u32] {
        &self.closed
    }

    pub fn calls(&self) -> &[FsCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn file_mut(&mut self, handle: u32) -> (&mut Vec<u8>, &mut usize) {
        let file = self.open.get_mut(&handle).expect("handle is open");
        let data = self.files.get_mut(&file.name).expect("file exists");
        (data, &mut file.pos)
    }
}

impl FileSystem for MemFs {
    type File = u32;

    fn open(&mut self, name: &str) -> Option<u32> {
        self.calls.push(FsCall::Open);
        if !self.files.contains_key(name) {
            return None;
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.open.insert(
            handle,
            OpenFile {
                name: name.to_string(),
                pos: 0,
            },
        );
        Some(handle)
    }

    fn create(&mut self, name: &str, initial_size: u32) -> bool {
        self.calls.push(FsCall::Create);
        if name.is_empty() || self.files.contains_key(name) {
            return false;
        }
        self.files
            .insert(name.to_string(), vec![0; initial_size as usize]);
        true
    }

    fn remove(&mut self, name: &str) -> bool {
        self.calls.push(FsCall::Remove);
        self.files.remove(name).is_some()
    }

    fn read(&mut self, file: &u32, buf: &mut [u8]) -> usize {
        self.calls.push(FsCall::Read);
        let (data, pos) = self.file_mut(*file);
        let start = (*pos).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        *pos = start + n;
        n
    }

    fn write(&mut self, file: &u32, buf: &[u8]) -> usize {
        self.calls.push(FsCall::Write);
        let (data, pos) = self.file_mut(*file);
        // Files do not grow
        let start = (*pos).min(data.len());
        let n = buf.len().min(data.len() - start);
        data[start..start + n].copy_from_slice(&buf[..n]);
        *pos = start + n;
        n
    }

    fn seek(&mut self, file: &u32, position: u32) {
        self.calls.push(FsCall::Seek);
        let (_, pos) = self.file_mut(*file);
        *pos = position as usize;
    }

    fn tell(&mut self, file: &u32) -> u32 {
        self.calls.push(FsCall::Tell);
        let (_, pos) = self.file_mut(*file);
        *pos as u32
    }

    fn length(&mut self, file: &u32) -> u32 {
        self.calls.push(FsCall::Length);
        let (data, _) = self.file_mut(*file);
        data.len() as u32
    }

    fn close(&mut self, file: u32) {
        self.calls.push(FsCall::Close);
        self.open.remove(&file);
        self.closed.push(file);
    }
}

/// Console that records every chunk and serves scripted input.
#[derive(Default)]
pub struct RecordingConsole {
    chunks: Mutex<Vec<Vec<u8>>>,
    input: Mutex<VecDeque<u8>>,
}

impl RecordingConsole {
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.chunks.lock().clone()
    }

    pub fn output(&self) -> Vec<u8> {
        self.chunks.lock().concat()
    }

    pub fn feed(&self, bytes: &[u8]) {
        self.input.lock().extend(bytes.iter().copied());
    }
}

impl Console for RecordingConsole {
    fn write_chunk(&self, bytes: &[u8]) {
        self.chunks.lock().push(bytes.to_vec());
    }

    fn read_byte(&self) -> u8 {
        self.input.lock().pop_front().expect("console input scripted")
    }
}

/// Process control with scripted children.
///
/// The diverging calls panic so `#[should_panic]` tests can observe them.
pub struct FakeProcess {
    current: AtomicI32,
    next_child: AtomicI32,
    started: Mutex<Vec<String>>,
    exit_codes: Mutex<BTreeMap<i32, i32>>,
}

impl FakeProcess {
    pub fn new(current: i32) -> Self {
        Self {
            current: AtomicI32::new(current),
            next_child: AtomicI32::new(current + 1),
            started: Mutex::new(Vec::new()),
            exit_codes: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn switch_to(&self, session: i32) {
        self.current.store(session, Ordering::SeqCst);
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    pub fn set_exit_code(&self, child: i32, status: i32) {
        self.exit_codes.lock().insert(child, status);
    }
}

impl ProcessControl for FakeProcess {
    fn current(&self) -> SessionId {
        SessionId::new(self.current.load(Ordering::SeqCst))
    }

    fn start_session(&self, command: &str) -> Option<SessionId> {
        if command.split_whitespace().next() == Some("missing") {
            return None;
        }
        self.started.lock().push(command.to_string());
        Some(SessionId::new(self.next_child.fetch_add(1, Ordering::SeqCst)))
    }

    fn wait_for(&self, child: SessionId) -> Option<i32> {
        self.exit_codes.lock().remove(&child.raw())
    }

    fn terminate_current(&self, status: i32) -> ! {
        panic!("session terminated with status {}", status);
    }

    fn power_off(&self) -> ! {
        panic!("machine powered off");
    }
}

pub type TestSyscalls = Syscalls<MemFs, FakeProcess, RecordingConsole, UserSpace>;

/// Top of the user stack page.
pub const STACK_TOP: usize = USER_TOP;
/// Base of a writable user data page.
pub const DATA: usize = 0x0804_8000;
/// Base of a read-only user page.
pub const RODATA: usize = 0x0804_0000;

/// Subsystem with a mapped stack, a data page and a read-only page.
pub fn syscalls(fs: MemFs) -> TestSyscalls {
    syscalls_with_config(fs, SyscallConfig::default())
}

pub fn syscalls_with_config(fs: MemFs, config: SyscallConfig) -> TestSyscalls {
    let space = UserSpace::new();
    let rw = PageFlags::USER | PageFlags::WRITABLE;
    space.map(STACK_TOP - PAGE_SIZE, PAGE_SIZE, rw).unwrap();
    space.map(DATA, 4 * PAGE_SIZE, rw).unwrap();
    space.map(RODATA, PAGE_SIZE, PageFlags::USER).unwrap();
    Syscalls::with_config(
        fs,
        FakeProcess::new(1),
        RecordingConsole::default(),
        space,
        config,
    )
}

/// Store a NUL-terminated string at `addr` and return `addr`.
pub fn put_str(sys: &TestSyscalls, addr: usize, s: &str) -> u32 {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    sys.memory().poke(addr, &bytes).unwrap();
    addr as u32
}

/// Push the call number and arguments and return the trapped frame.
pub fn frame(sys: &TestSyscalls, number: u32, args: &[u32]) -> TrapFrame {
    let sp = STACK_TOP - 64;
    let words: Vec<u8> = core::iter::once(number)
        .chain(args.iter().copied())
        .flat_map(u32::to_le_bytes)
        .collect();
    sys.memory().poke(sp, &words).unwrap();
    frame_at(sp)
}

/// A frame whose user stack pointer is `sp`.
pub fn frame_at(sp: usize) -> TrapFrame {
    let mut frame = TrapFrame::zeroed();
    frame.sp = sp as u64;
    frame
}

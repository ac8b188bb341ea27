//! Flat memory spaces outside the internal data memory: external data RAM
//! (XRAM) and the banked code memory.

/// Size of the on-chip code ROM. Code addresses below this are served from
/// the internal bank while the external-access flag is set.
pub const INTERNAL_ROM_SIZE: usize = 4096;

const SPACE_SIZE: usize = 0x10000;

/// A 16-bit addressed byte space.
pub trait MemoryMapper {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
}

/// External data memory: a full 64K space, disjoint from internal RAM.
pub struct Xram {
    ram: Box<[u8; SPACE_SIZE]>,
}

impl MemoryMapper for Xram {
    fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }
    fn write(&mut self, addr: u16, value: u8) {
        self.ram[addr as usize] = value;
    }
}

impl Xram {
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; SPACE_SIZE]),
        }
    }

    pub fn clear(&mut self) {
        self.ram.fill(0);
    }
}

impl Default for Xram {
    fn default() -> Self {
        Self::new()
    }
}

/// Code memory: a 4K internal bank plus a 64K external bank.
///
/// With `ea` set, addresses below [`INTERNAL_ROM_SIZE`] come from the
/// internal bank and everything else from the external bank. With `ea`
/// clear every fetch goes to the external bank.
pub struct CodeMemory {
    internal: Box<[u8; INTERNAL_ROM_SIZE]>,
    external: Box<[u8; SPACE_SIZE]>,
    ea: bool,
}

impl CodeMemory {
    pub fn new() -> Self {
        Self {
            internal: Box::new([0; INTERNAL_ROM_SIZE]),
            external: Box::new([0; SPACE_SIZE]),
            ea: true,
        }
    }

    pub fn clear(&mut self) {
        self.internal.fill(0);
        self.external.fill(0);
    }

    pub fn ea(&self) -> bool {
        self.ea
    }

    pub fn set_ea(&mut self, ea: bool) {
        self.ea = ea;
    }

    pub fn read(&self, addr: u16) -> u8 {
        let addr = addr as usize;
        if self.ea && addr < INTERNAL_ROM_SIZE {
            self.internal[addr]
        } else {
            self.external[addr]
        }
    }

    /// Store a byte in whichever bank owns `addr` by magnitude: the internal
    /// bank below [`INTERNAL_ROM_SIZE`], the external bank above it. This is
    /// how program images are placed and is independent of the `ea` flag.
    pub fn load(&mut self, addr: u16, value: u8) {
        let addr = addr as usize;
        if addr < INTERNAL_ROM_SIZE {
            self.internal[addr] = value;
        } else {
            self.external[addr] = value;
        }
    }

    /// Write directly into the internal bank. Addresses outside the bank are
    /// ignored.
    pub fn write_internal(&mut self, addr: u16, value: u8) {
        if let Some(byte) = self.internal.get_mut(addr as usize) {
            *byte = value;
        }
    }

    /// Write directly into the external bank.
    pub fn write_external(&mut self, addr: u16, value: u8) {
        self.external[addr as usize] = value;
    }
}

impl Default for CodeMemory {
    fn default() -> Self {
        Self::new()
    }
}

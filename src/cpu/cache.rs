// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Caches basic blocks of predecoded instruction words.
//!
//! A [Block] is a run of contiguous words that ends at the first branch,
//! subroutine call, or jump. Blocks never overlap: a new block stops short
//! of any address another cached block already holds.

use super::{instruction::Opcode, mem::Memory, Adr};
use std::fmt::Display;

/// The most words a single [Block] may hold
pub const MAX_BLOCK_LEN: usize = 256;
/// The default number of cache slots
pub const DEFAULT_CAPACITY: usize = 1024;

/// A position within the cache: a slot, and a word offset into its block
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeLocation {
    /// Index of the block in the cache
    pub slot: usize,
    /// Offset of the word within the block
    pub offset: usize,
}

/// A basic block: the words from `start` up to and including a terminator
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    start: Adr,
    words: Vec<u16>,
}

impl Block {
    /// Gets the address of the first word
    pub fn start(&self) -> Adr {
        self.start
    }
    /// Gets the number of words in the block
    pub fn len(&self) -> usize {
        self.words.len()
    }
    /// Returns true if the block holds no words
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
    /// Gets the block's instruction words
    pub fn words(&self) -> &[u16] {
        &self.words
    }
    /// Gets the word at `offset`
    pub fn get(&self, offset: usize) -> Option<u16> {
        self.words.get(offset).copied()
    }
    /// Gets the address one past the last word
    pub fn end(&self) -> Adr {
        self.start.wrapping_add(self.words.len() as Adr)
    }

    /// Gets the offset of `addr` within this block, if the block holds it.
    ///
    /// Blocks may wrap around the top of memory.
    /// # Examples
    /// ```rust
    /// # use lc3vm::cpu::{cache::*, mem::Memory};
    /// let mut mem = Memory::new();
    /// mem.load(0x3000, &[0x1021, 0x1021, 0x0ffd]);
    /// let block = BlockCache::new().build(&mem, 0x3000);
    /// assert_eq!(Some(2), block.offset_of(0x3002));
    /// assert_eq!(None, block.offset_of(0x3003));
    /// assert_eq!(None, block.offset_of(0x2fff));
    /// ```
    pub fn offset_of(&self, addr: Adr) -> Option<usize> {
        let offset = addr.wrapping_sub(self.start) as usize;
        (offset < self.words.len()).then_some(offset)
    }

    /// Iterates over the block's `(address, word)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Adr, u16)> + '_ {
        (0..)
            .map(|i: Adr| self.start.wrapping_add(i))
            .zip(self.words.iter().copied())
    }

    /// Returns true if the last word is a branch, call, or jump
    pub fn is_terminated(&self) -> bool {
        self.words
            .last()
            .map_or(false, |&word| Opcode::of(word).is_terminator())
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:04x}..{:04x}) {} words", self.start, self.end(), self.len())
    }
}

/// Chooses which slot to overwrite when the cache is full
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Eviction {
    /// Overwrite slots in the order they were filled
    #[default]
    Fifo,
    /// Always overwrite the last slot
    Newest,
}

/// A fixed-capacity cache of [Block]s
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockCache {
    blocks: Vec<Block>,
    capacity: usize,
    eviction: Eviction,
    victim: usize,
    hits: usize,
    misses: usize,
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, Eviction::default())
    }
}

impl BlockCache {
    /// Constructs an empty cache with [DEFAULT_CAPACITY] slots
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs an empty cache with `capacity` slots (at least one)
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::cpu::cache::*;
    /// let cache = BlockCache::with_capacity(16, Eviction::Newest);
    /// assert_eq!(16, cache.capacity());
    /// assert!(cache.is_empty());
    /// ```
    pub fn with_capacity(capacity: usize, eviction: Eviction) -> Self {
        let capacity = capacity.max(1);
        Self {
            blocks: Vec::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            eviction,
            victim: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Finds the block holding `addr`, without touching the statistics
    pub fn lookup(&self, addr: Adr) -> Option<CodeLocation> {
        self.blocks.iter().enumerate().find_map(|(slot, block)| {
            block
                .offset_of(addr)
                .map(|offset| CodeLocation { slot, offset })
        })
    }

    /// Finds the block holding `addr`, counting a hit or a miss
    pub fn find(&mut self, addr: Adr) -> Option<CodeLocation> {
        let found = self.lookup(addr);
        match found {
            Some(_) => self.hits += 1,
            None => self.misses += 1,
        }
        found
    }

    /// Scans memory from `start` to build a new block, without inserting it.
    ///
    /// The block ends after the first branch, call, or jump, after
    /// [MAX_BLOCK_LEN] words, or just before an address that's already
    /// cached, whichever comes first. Memory is read with [Memory::peek],
    /// so building never consumes input.
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::cpu::{cache::*, mem::Memory};
    /// let mut mem = Memory::new();
    /// // ADD, ADD, BRnzp, ADD
    /// mem.load(0x3000, &[0x1021, 0x1021, 0x0ffd, 0x1021]);
    /// let block = BlockCache::new().build(&mem, 0x3000);
    /// assert_eq!(3, block.len());
    /// assert!(block.is_terminated());
    /// ```
    pub fn build(&self, mem: &Memory, start: Adr) -> Block {
        let mut words = Vec::new();
        let mut addr = start;
        while words.len() < MAX_BLOCK_LEN {
            if !words.is_empty() && self.lookup(addr).is_some() {
                break;
            }
            let word = mem.peek(addr);
            words.push(word);
            if Opcode::of(word).is_terminator() {
                break;
            }
            addr = addr.wrapping_add(1);
        }
        Block { start, words }
    }

    /// Stores a block, evicting another if the cache is full.
    ///
    /// Returns the slot the block was stored in.
    pub fn insert(&mut self, block: Block) -> usize {
        if self.blocks.len() < self.capacity {
            log::debug!("caching block {block} in slot {}", self.blocks.len());
            self.blocks.push(block);
            return self.blocks.len() - 1;
        }
        let slot = match self.eviction {
            Eviction::Fifo => {
                let slot = self.victim;
                self.victim = (slot + 1) % self.capacity;
                slot
            }
            Eviction::Newest => self.capacity - 1,
        };
        log::debug!(
            "evicting block {} from slot {slot} for {block}",
            self.blocks[slot]
        );
        self.blocks[slot] = block;
        slot
    }

    /// Gets the block in `slot`
    pub fn get(&self, slot: usize) -> Option<&Block> {
        self.blocks.get(slot)
    }

    /// Gets the word at a [CodeLocation]
    pub fn word(&self, at: CodeLocation) -> Option<u16> {
        self.blocks.get(at.slot)?.get(at.offset)
    }

    /// Iterates over the cached blocks, in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Gets the number of filled slots
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if no blocks are cached
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Gets the number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Gets the eviction policy
    pub fn eviction(&self) -> Eviction {
        self.eviction
    }

    /// Gets the number of lookups that found a cached block
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Gets the number of lookups that didn't
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Drops every cached block. This is the only way to invalidate code
    /// after it's been overwritten.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.victim = 0;
    }
}

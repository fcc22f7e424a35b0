// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Lists an LC-3 object image, one instruction per line

use gumdrop::Options;
use lc3vm::{error::Result, prelude::*};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Options, Hash)]
struct Arguments {
    #[options(help = "Show help text")]
    help: bool,
    #[options(help = "Load an LC-3 object image to list", free, required)]
    pub file: PathBuf,
    #[options(
        help = "List as if loaded here, instead of at the image's origin",
        parse(try_from_str = "parse_hex"),
        meta = "ADR"
    )]
    pub origin: Option<u16>,
    #[options(help = "Split the listing into the blocks the cache would build")]
    pub blocks: bool,
    #[options(help = "Disable colored output")]
    pub plain: bool,
}

fn parse_hex(value: &str) -> std::result::Result<u16, std::num::ParseIntError> {
    u16::from_str_radix(value.trim_start_matches(['x', 'X']), 16)
}

fn main() -> Result<()> {
    let options = Arguments::parse_args_default_or_exit();
    let image = Image::open(&options.file)?;
    let origin = options.origin.unwrap_or(image.origin());
    let dis = match options.plain {
        true => Dis::plain(),
        false => Dis::default(),
    };
    let mut mem = Memory::new();
    mem.load(origin, image.words());

    if !options.blocks {
        for (addr, &word) in (0..image.len()).map(|i| origin.wrapping_add(i as u16)).zip(image.words()) {
            println!("{addr:04x}: {} {:04x}", dis.once(word, addr), word.bright_black());
        }
        return Ok(());
    }

    // Walk the image front to back, cutting it wherever a block would end
    let cache = BlockCache::with_capacity(1, Eviction::Newest);
    let end = origin as usize + image.len();
    let mut start = origin as usize;
    while start < end.min(0x10000) {
        let block = cache.build(&mem, start as u16);
        println!("{}", format_args!("; {block}").bold());
        for (addr, word) in block.iter() {
            if addr as usize >= end {
                break;
            }
            println!("{addr:04x}: {} {:04x}", dis.once(word, addr), word.bright_black());
        }
        start += block.len().max(1);
    }
    Ok(())
}

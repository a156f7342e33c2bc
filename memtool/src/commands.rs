use crate::Width;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt::Write;
use std::time::{Duration, Instant};
use uacc::sysfs::parse_auto;
use uacc::{
    udmabuf, uio, SysPaths, Udmabuf, UdmabufAccessor16, UdmabufAccessor32, UdmabufAccessor8,
};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Same radix rules as the sysfs size parser (`0x` hex, leading `0` octal,
/// otherwise decimal), but the whole argument must be consumed. `_` may
/// separate digits.
pub fn parse_number(s: &str) -> Result<u64, String> {
    let t = s.trim().replace('_', "");
    let (digits, radix) = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None if t.len() > 1 && t.starts_with('0') => (&t[1..], 8),
        None => (t.as_str(), 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(format!("{:?} is not a number", s));
    }
    parse_auto(&t).ok_or_else(|| format!("{:?} does not fit in 64 bits", s))
}

/// A number that must also fit the address space.
pub fn parse_offset(s: &str) -> Result<usize, String> {
    let n = parse_number(s)?;
    usize::try_from(n).map_err(|_| format!("0x{:x} exceeds the address space", n))
}

pub fn info(paths: &SysPaths, name: &str) -> CmdResult {
    let phys = udmabuf::phys_addr(paths, name)?;
    let size = udmabuf::phys_size(paths, name)?;
    println!(
        "{}: phys_addr 0x{:x}, size 0x{:x} ({} bytes)",
        name, phys, size, size
    );
    Ok(())
}

pub fn peek(paths: &SysPaths, name: &str, offset: usize, width: Width) -> CmdResult {
    let buf = UdmabufAccessor8::open_in(paths, name, 0)?;
    buf.sync_for_cpu()?;
    let v: u64 = match width {
        Width::W8 => buf.read_mem_as::<u8>(offset)?.into(),
        Width::W16 => buf.read_mem_as::<u16>(offset)?.into(),
        Width::W32 => buf.read_mem_as::<u32>(offset)?.into(),
        Width::W64 => buf.read_mem_as::<u64>(offset)?,
    };
    println!("0x{:08x}: 0x{:x}", offset, v);
    Ok(())
}

pub fn poke(paths: &SysPaths, name: &str, offset: usize, value: u64, width: Width) -> CmdResult {
    let buf = UdmabufAccessor8::open_in(paths, name, 0)?;
    match width {
        Width::W8 => buf.write_mem_as(offset, u8::try_from(value)?)?,
        Width::W16 => buf.write_mem_as(offset, u16::try_from(value)?)?,
        Width::W32 => buf.write_mem_as(offset, u32::try_from(value)?)?,
        Width::W64 => buf.write_mem_as(offset, value)?,
    }
    buf.sync_for_device()?;
    info!("wrote 0x{:x} to {}+0x{:x}", value, name, offset);
    Ok(())
}

pub fn hexdump(base: usize, data: &[u8]) -> String {
    let mut out = String::new();
    for (i, line) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}:", base + i * 16);
        for b in line {
            let _ = write!(out, " {:02x}", b);
        }
        for _ in line.len()..16 {
            out.push_str("   ");
        }
        out.push_str("  ");
        out.extend(line.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}

pub fn dump(paths: &SysPaths, name: &str, offset: usize, len: usize) -> CmdResult {
    let buf = UdmabufAccessor8::open_in(paths, name, 0)?;
    buf.sync_for_cpu()?;
    let len = len.min(buf.size().saturating_sub(offset));
    let mut data = vec![0u8; len];
    buf.copy_from(offset, &mut data)?;
    print!("{}", hexdump(offset, &data));
    Ok(())
}

/// Number of words in `buf` that differ from the pattern `seed` produces.
pub fn verify_pattern(buf: &Udmabuf<u32>, seed: u64) -> uacc::Result<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bad = 0;
    for i in 0..buf.size() / 4 {
        let expect: u32 = rng.random();
        let got = buf.read_reg(i)?;
        if got != expect {
            if bad < 8 {
                warn!("0x{:08x}: expected 0x{:08x}, read 0x{:08x}", i * 4, expect, got);
            }
            bad += 1;
        }
    }
    Ok(bad)
}

pub fn write_pattern(buf: &Udmabuf<u32>, seed: u64) -> uacc::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..buf.size() / 4 {
        buf.write_reg(i, rng.random())?;
    }
    Ok(())
}

pub fn memtest(paths: &SysPaths, name: &str, seed: u64) -> CmdResult {
    let buf = UdmabufAccessor32::open_in(paths, name, 0)?;
    info!("testing 0x{:x} bytes at phys 0x{:x}", buf.size(), buf.phys_addr());

    write_pattern(&buf, seed)?;
    buf.sync_for_device()?;
    buf.sync_for_cpu()?;

    match verify_pattern(&buf, seed)? {
        0 => {
            println!("{}: ok", name);
            Ok(())
        }
        bad => Err(format!("{}: {} words differ", name, bad).into()),
    }
}

pub fn bench(paths: &SysPaths, name: &str, rounds: usize) -> CmdResult {
    let buf = UdmabufAccessor16::open_in(paths, name, 0)?;
    let words = buf.size() / 4;
    println!("0x{:x} bytes", words * 2);

    let mut accumulator: usize = 0;
    let mut total = Duration::from_secs(0);
    for _ in 0..rounds {
        let start = Instant::now();
        buf.sync_for_cpu()?;
        for i in 0..words {
            accumulator = accumulator.wrapping_add(buf.read_reg(i)? as usize);
        }
        let stop = Instant::now();
        total += stop - start;

        println!("0x{:x} in {:?}", accumulator, stop - start);
    }

    println!("Total time {:?}, got 0x{:x}", total, accumulator);
    Ok(())
}

pub fn uio(paths: &SysPaths) -> CmdResult {
    let devs = uio::list_uio(paths)?;
    if devs.is_empty() {
        println!("no uio devices");
    }
    for d in devs {
        println!("uio{}: {}", d.index, d.name);
        for m in d.maps {
            println!("  map{}: 0x{:x} +0x{:x}", m.index, m.addr, m.size);
        }
    }
    Ok(())
}
